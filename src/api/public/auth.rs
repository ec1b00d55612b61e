use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::internal_error;
use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::middleware::auth::generate_token;

pub fn auth_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login))
        .layer(Extension(db))
}

async fn register_user(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<RegisterPayload>,
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

    let duplicate = UserEntity::find()
        .filter(
            sea_orm::Condition::any()
                .add(user::Column::Username.eq(payload.username.clone()))
                .add(user::Column::Email.eq(payload.email.clone())),
        )
        .one(&txn)
        .await;
    match duplicate {
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

    let password = match hash_password(&payload.password) {
        Ok(password) => password,
        Err(_) => return internal_error(),
    };

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        password: Set(password),
        city: Set(Some(payload.city)),
        institution: Set(Some(payload.institution)),
        role: Set(Role::User),
        is_blocked: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match UserEntity::insert(new_user).exec(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::CREATED,
                Json(json!({
                    "message": "User registered successfully"
                })),
            )
                .into_response(),
            Err(_) => internal_error(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "Username or email already registered"
                })),
            )
                .into_response()
        }
    }
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    let account = match UserEntity::find()
        .filter(user::Column::Username.eq(payload.username.clone()))
        .one(&*db)
        .await
    {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Invalid username or password"
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    if account.check_hash(&payload.password).is_err() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Invalid username or password"
            })),
        )
            .into_response();
    }

    // Blocked accounts fail at the door, before any token exists.
    if account.is_blocked {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Your account is blocked. Contact the administrator."
            })),
        )
            .into_response();
    }

    match generate_token(account.id, account.role) {
        Ok(token) => (
            StatusCode::OK,
            Json(json!({
                "token": token
            })),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}

fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
}

//Structs
#[derive(Deserialize, Validate, Clone, Debug)]
struct RegisterPayload {
    #[validate(length(min = 3, max = 80))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 6))]
    password: String,
    #[validate(length(min = 1, max = 100))]
    city: String,
    #[validate(length(min = 1, max = 200))]
    institution: String,
}

#[derive(Deserialize, Clone, Debug)]
struct LoginPayload {
    username: String,
    password: String,
}
