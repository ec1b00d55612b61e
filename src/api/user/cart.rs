use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{commit_failed, internal_error, service_error};
use crate::entities::user::Entity as UserEntity;
use crate::middleware::auth::Claims;
use crate::services::cart::{self, CartLine};
use crate::services::notify;

pub fn cart_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/cart", get(get_cart).post(add_product))
        .route("/cart/:id", patch(patch_entry).delete(remove_product))
        .route("/cart/sync", post(sync_cart))
        .route("/cart/checkout", post(checkout))
        .layer(Extension(db))
}

async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match cart::cart_lines(&*db, claims.user_id).await {
        Ok(lines) => (
            StatusCode::OK,
            Json(json!({
                "cart": lines
            })),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

async fn add_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddProduct>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match cart::add_to_cart(&txn, claims.user_id, payload.product_id, payload.quantity).await {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::CREATED,
                Json(json!({
                    "message": "Added successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            service_error(err)
        }
    }
}

async fn patch_entry(
    Path(id): Path<i32>,
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchCart>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match cart::update_cart_item(&txn, claims.user_id, id, payload.quantity).await {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource patched successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            service_error(err)
        }
    }
}

async fn remove_product(
    Path(id): Path<i32>,
    Extension(claims): Extension<Claims>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match cart::remove_cart_item(&txn, claims.user_id, id).await {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            service_error(err)
        }
    }
}

/// Merges a client-side cart into the stored one. Skips are silent; only a
/// failed transaction turns into an error, and then nothing is applied.
async fn sync_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SyncCart>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match cart::sync_cart(&txn, claims.user_id, &payload.cart).await {
        Ok(synced) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "synced": synced,
                    "message": format!("Synced {} item(s)", synced)
                })),
            )
                .into_response(),
            Err(_) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": "Failed to sync cart, try again"
                })),
            )
                .into_response(),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": format!("Failed to sync cart: {err}")
                })),
            )
                .into_response()
        }
    }
}

async fn checkout(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let buyer = match UserEntity::find_by_id(claims.user_id).one(&txn).await {
        Ok(Some(buyer)) => buyer,
        Ok(None) => {
            let _ = txn.rollback().await;
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Unknown user"
                })),
            )
                .into_response();
        }
        Err(_) => {
            let _ = txn.rollback().await;
            return internal_error();
        }
    };

    let order = match cart::checkout(&txn, &buyer).await {
        Ok(order) => order,
        Err(err) => {
            let _ = txn.rollback().await;
            return service_error(err);
        }
    };

    if txn.commit().await.is_err() {
        return commit_failed();
    }

    // Fire-and-forget: the order is committed, notification failures are
    // logged inside and never surfaced.
    let notify_db = db.clone();
    let notify_order = order.clone();
    tokio::spawn(async move {
        notify::notify_new_order(&notify_db, &notify_order).await;
    });

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Order placed successfully",
            "order_id": order.id
        })),
    )
        .into_response()
}

//Structs
#[derive(Deserialize, Debug)]
struct AddProduct {
    product_id: i32,
    quantity: i32,
}

#[derive(Deserialize)]
struct PatchCart {
    quantity: i32,
}

#[derive(Deserialize)]
struct SyncCart {
    cart: Vec<CartLine>,
}
