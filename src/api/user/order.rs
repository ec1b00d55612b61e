use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use std::sync::Arc;

use crate::api::{commit_failed, internal_error, service_error};
use crate::middleware::auth::Claims;
use crate::services::cart;

pub fn order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/order", get(get_orders))
        .route("/order/:id/cancel", post(cancel_order))
        .layer(Extension(db))
}

async fn get_orders(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    match cart::user_orders(&*db, claims.user_id).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(err) => service_error(err),
    }
}

/// Cancelling is only possible while the order still sits at `pending`.
async fn cancel_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match cart::cancel_order(&txn, claims.user_id, id).await {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Order cancelled successfully"
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
