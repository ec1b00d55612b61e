pub mod auth;
pub mod catalog;
pub mod category;
pub mod uploads;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use auth::auth_router;
use catalog::catalog_router;
use category::category_router;

pub fn public_api_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .merge(auth_router(db.clone()))
        .merge(catalog_router(db.clone()))
        .merge(category_router(db.clone()))
}
