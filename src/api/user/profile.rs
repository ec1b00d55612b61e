use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{commit_failed, internal_error};
use crate::entities::user::{self, Entity as UserEntity};
use crate::middleware::auth::Claims;

pub fn profile_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/profile", get(get_profile).patch(patch_profile))
        .route("/profile/password", post(change_password))
        .layer(Extension(db))
}

async fn get_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match UserEntity::find_by_id(claims.user_id).one(&*db).await {
        Ok(Some(account)) => (
            StatusCode::OK,
            Json(json!({
                "username": account.username,
                "email": account.email,
                "city": account.city,
                "institution": account.institution,
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Not found"
            })),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}

async fn patch_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PatchProfile>,
) -> impl IntoResponse {
    if let Err(err) = payload.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("Validation failed: {err}")
            })),
        )
            .into_response();
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let account = match UserEntity::find_by_id(claims.user_id).one(&txn).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not found"
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    // Username/email stay unique across everyone but the caller.
    let mut unique_check = Condition::any();
    if let Some(username) = &payload.username {
        unique_check = unique_check.add(user::Column::Username.eq(username.clone()));
    }
    if let Some(email) = &payload.email {
        unique_check = unique_check.add(user::Column::Email.eq(email.clone()));
    }
    if payload.username.is_some() || payload.email.is_some() {
        let clash = UserEntity::find()
            .filter(unique_check)
            .filter(user::Column::Id.ne(account.id))
            .one(&txn)
            .await;
        match clash {
            Ok(Some(_)) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({
                        "error": "Username or email already registered"
                    })),
                )
                    .into_response();
            }
            Ok(None) => {}
            Err(_) => return internal_error(),
        }
    }

    let mut account: user::ActiveModel = account.into();
    if let Some(username) = payload.username {
        account.username = Set(username);
    }
    if let Some(email) = payload.email {
        account.email = Set(email);
    }
    if let Some(city) = payload.city {
        account.city = Set(Some(city));
    }
    if let Some(institution) = payload.institution {
        account.institution = Set(Some(institution));
    }

    match account.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Profile updated successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Failed to patch this resource"
                })),
            )
                .into_response()
        }
    }
}

async fn change_password(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePassword>,
) -> impl IntoResponse {
    if payload.new_password.len() < 6 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Password must be at least 6 characters"
            })),
        )
            .into_response();
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let account = match UserEntity::find_by_id(claims.user_id).one(&txn).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Not found"
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    if account.check_hash(&payload.current_password).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Current password is incorrect"
            })),
        )
            .into_response();
    }

    let salt = SaltString::generate(&mut OsRng);
    let hashed = match Argon2::default().hash_password(payload.new_password.as_bytes(), &salt) {
        Ok(hashed) => hashed.to_string(),
        Err(_) => return internal_error(),
    };

    let mut account: user::ActiveModel = account.into();
    account.password = Set(hashed);

    match account.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Password changed successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            internal_error()
        }
    }
}

//Structs
#[derive(Deserialize, Validate, Clone, Debug)]
struct PatchProfile {
    #[validate(length(min = 3, max = 80))]
    username: Option<String>,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    city: Option<String>,
    #[validate(length(min = 1, max = 200))]
    institution: Option<String>,
}

#[derive(Deserialize)]
struct ChangePassword {
    current_password: String,
    new_password: String,
}
