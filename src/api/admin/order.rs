use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;

use crate::api::{commit_failed, internal_error, service_error};
use crate::entities::{
    order::{self, Entity as OrderEntity, Status},
    product::Entity as ProductEntity,
    user::Entity as UserEntity,
};
use crate::services::cart;

const PAGE_SIZE: u64 = 20;

pub fn admin_order_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/order", get(list_orders))
        .route("/order/:id", get(get_order).patch(patch_order_status))
        .layer(Extension(db))
}

async fn list_orders(
    Query(params): Query<ListOrdersQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let mut half_result = OrderEntity::find();

    if let Some(raw) = params.status.filter(|s| !s.is_empty()) {
        match Status::from_str(&raw) {
            Ok(status) => half_result = half_result.filter(order::Column::Status.eq(status)),
            Err(err) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": err
                    })),
                )
                    .into_response();
            }
        }
    }

    let page = params.page.unwrap_or(1).max(1);
    let paginator = half_result
        .order_by_desc(order::Column::CreatedAt)
        .paginate(&*db, PAGE_SIZE);

    let total_pages = match paginator.num_pages().await {
        Ok(total_pages) => total_pages,
        Err(_) => return internal_error(),
    };

    match paginator.fetch_page(page - 1).await {
        Ok(orders) => (
            StatusCode::OK,
            Json(json!({
                "orders": orders,
                "page": page,
                "total_pages": total_pages,
            })),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}

/// Order detail: buyer, status and the item rows joined with product names.
/// Products deleted since checkout show up with a null name.
async fn get_order(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let found = match OrderEntity::find_by_id(id).one(&*db).await {
        Ok(Some(found)) => found,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No order with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    let buyer = match UserEntity::find_by_id(found.user_id).one(&*db).await {
        Ok(buyer) => buyer,
        Err(_) => return internal_error(),
    };

    let items = match cart::order_items(&*db, found.id).await {
        Ok(items) => items,
        Err(err) => return service_error(err),
    };

    let mut item_rows = Vec::with_capacity(items.len());
    for item in items {
        let product = match ProductEntity::find_by_id(item.product_id).one(&*db).await {
            Ok(product) => product,
            Err(_) => return internal_error(),
        };
        item_rows.push(json!({
            "id": item.id,
            "product_id": item.product_id,
            "product_name": product.map(|p| p.name),
            "quantity": item.quantity,
        }));
    }

    (
        StatusCode::OK,
        Json(json!({
            "order": found,
            "user": buyer.map(|b| json!({
                "id": b.id,
                "username": b.username,
                "email": b.email,
            })),
            "items": item_rows,
        })),
    )
        .into_response()
}

async fn patch_order_status(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchOrderStatus>,
) -> impl IntoResponse {
    let status = match Status::from_str(&payload.status) {
        Ok(status) => status,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": err
                })),
            )
                .into_response();
        }
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let existing = match OrderEntity::find_by_id(id).one(&txn).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No order with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    let mut active: order::ActiveModel = existing.into();
    active.status = Set(status);
    active.updated_at = Set(chrono::Utc::now());

    match active.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Order status updated",
                    "status": status.to_string()
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
#[derive(Deserialize)]
struct ListOrdersQuery {
    page: Option<u64>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct PatchOrderStatus {
    status: String,
}
