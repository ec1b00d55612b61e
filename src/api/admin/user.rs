use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{commit_failed, internal_error, service_error};
use crate::entities::{
    order::{self, Entity as OrderEntity, Status},
    user::{self, Entity as UserEntity, Role},
};
use crate::middleware::auth::Claims;
use crate::services::cart;

const PAGE_SIZE: u64 = 20;

pub fn admin_user_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/user", get(list_users))
        .route("/user/:id/toggle-block", post(toggle_block))
        .route("/user/:id/orders", get(user_orders))
        .layer(Extension(db))
}

async fn list_users(
    Query(params): Query<ListUsersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let mut half_result = UserEntity::find();

    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        half_result = half_result.filter(
            Condition::any()
                .add(user::Column::Username.contains(&search))
                .add(user::Column::Email.contains(&search))
                .add(user::Column::City.contains(&search))
                .add(user::Column::Institution.contains(&search)),
        );
    }

    let page = params.page.unwrap_or(1).max(1);
    let paginator = half_result
        .order_by_desc(user::Column::CreatedAt)
        .paginate(&*db, PAGE_SIZE);

    let total_pages = match paginator.num_pages().await {
        Ok(total_pages) => total_pages,
        Err(_) => return internal_error(),
    };

    let accounts = match paginator.fetch_page(page - 1).await {
        Ok(accounts) => accounts,
        Err(_) => return internal_error(),
    };

    // Never ship password hashes, not even to an admin.
    let users: Vec<_> = accounts
        .into_iter()
        .map(|account| {
            json!({
                "id": account.id,
                "username": account.username,
                "email": account.email,
                "city": account.city,
                "institution": account.institution,
                "role": account.role.to_string(),
                "is_blocked": account.is_blocked,
                "created_at": account.created_at,
            })
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "users": users,
            "page": page,
            "total_pages": total_pages,
        })),
    )
        .into_response()
}

/// Flips the block flag. Admin accounts are never blockable, which also
/// covers blocking yourself.
async fn toggle_block(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    if claims.user_id == id {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "You cannot block your own account"
            })),
        )
            .into_response();
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let account = match UserEntity::find_by_id(id).one(&txn).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No user with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    if account.role == Role::Admin {
        let _ = txn.rollback().await;
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Admin accounts cannot be blocked"
            })),
        )
            .into_response();
    }

    let flipped = !account.is_blocked;
    let mut account: user::ActiveModel = account.into();
    account.is_blocked = Set(flipped);

    match account.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "User status updated",
                    "is_blocked": flipped
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

/// A user's orders together with a count per status, for the admin's
/// per-customer view.
async fn user_orders(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let account = match UserEntity::find_by_id(id).one(&*db).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No user with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    let orders = match cart::user_orders(&*db, account.id).await {
        Ok(orders) => orders,
        Err(err) => return service_error(err),
    };

    let mut counts = serde_json::Map::new();
    for status in [
        Status::Pending,
        Status::Processing,
        Status::Completed,
        Status::Cancelled,
    ] {
        let count = match OrderEntity::find()
            .filter(order::Column::UserId.eq(account.id))
            .filter(order::Column::Status.eq(status))
            .count(&*db)
            .await
        {
            Ok(count) => count,
            Err(_) => return internal_error(),
        };
        counts.insert(status.to_string(), json!(count));
    }

    (
        StatusCode::OK,
        Json(json!({
            "username": account.username,
            "orders": orders,
            "status_counts": counts,
        })),
    )
        .into_response()
}

//Structs
#[derive(Deserialize)]
struct ListUsersQuery {
    page: Option<u64>,
    search: Option<String>,
}
