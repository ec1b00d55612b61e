pub mod admin;
pub mod public;
pub mod user;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::middleware::logging::logging_middleware;
use crate::services::ServiceError;
use admin::admin_api_router;
use public::public_api_router;
use public::uploads::uploads_router;
use user::user_api_router;

pub fn create_api_router(shared_db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        // Stored image URLs are web-rooted, so the file routes sit outside /api.
        .merge(uploads_router())
        .nest(
            "/api",
            public_api_router(shared_db.clone()).merge(user_api_router(shared_db.clone())),
        )
        .nest("/api/admin", admin_api_router(shared_db.clone()))
        .layer(axum::middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Maps a service failure onto the JSON error shape every endpoint uses.
pub(crate) fn service_error(err: ServiceError) -> Response {
    (
        err.status(),
        Json(json!({
            "error": err.to_string()
        })),
    )
        .into_response()
}

pub(crate) fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error"
        })),
    )
        .into_response()
}

pub(crate) fn commit_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Failed to commit changes, try again"
        })),
    )
        .into_response()
}
