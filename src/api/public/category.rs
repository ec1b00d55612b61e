use axum::{
    extract::Extension, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::api::service_error;
use crate::services::category_tree;

pub fn category_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/category", get(get_category_tree))
        .layer(Extension(db))
}

/// Navigation tree: top-level categories plus their direct children.
async fn get_category_tree(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    match category_tree::build_tree(&*db).await {
        Ok(tree) => (StatusCode::OK, Json(tree)).into_response(),
        Err(err) => service_error(err),
    }
}
