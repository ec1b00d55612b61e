use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
};
use serde_json::json;
use std::sync::Arc;

use crate::api::internal_error;
use crate::entities::{
    category::Entity as CategoryEntity,
    order::{self, Entity as OrderEntity, Status},
    product::{self, Entity as ProductEntity},
    user::Entity as UserEntity,
};

pub fn admin_stats_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .layer(Extension(db))
}

/// Dashboard counters. Each count is its own query; the dashboard is not
/// latency-critical.
async fn get_stats(Extension(db): Extension<Arc<DatabaseConnection>>) -> impl IntoResponse {
    let products = ProductEntity::find().count(&*db).await;
    let active_products = ProductEntity::find()
        .filter(product::Column::IsActive.eq(true))
        .count(&*db)
        .await;
    let categories = CategoryEntity::find().count(&*db).await;
    let users = UserEntity::find().count(&*db).await;
    let orders = OrderEntity::find().count(&*db).await;

    let (products, active_products, categories, users, orders) =
        match (products, active_products, categories, users, orders) {
            (Ok(p), Ok(ap), Ok(c), Ok(u), Ok(o)) => (p, ap, c, u, o),
            _ => return internal_error(),
        };

    let mut order_counts = serde_json::Map::new();
    for status in [
        Status::Pending,
        Status::Processing,
        Status::Completed,
        Status::Cancelled,
    ] {
        let count = match OrderEntity::find()
            .filter(order::Column::Status.eq(status))
            .count(&*db)
            .await
        {
            Ok(count) => count,
            Err(_) => return internal_error(),
        };
        order_counts.insert(status.to_string(), json!(count));
    }

    (
        StatusCode::OK,
        Json(json!({
            "products": products,
            "active_products": active_products,
            "categories": categories,
            "users": users,
            "orders": orders,
            "orders_by_status": order_counts,
        })),
    )
        .into_response()
}
