pub mod cart;
pub mod category_tree;
pub mod image_order;
pub mod notify;
pub mod settings;
pub mod uploads;

use axum::http::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

/// Domain-level failures, mapped onto HTTP codes at the handler edge.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Access denied")]
    AccessDenied,
    #[error("{0}")]
    Conflict(String),
    #[error("Database error, try again: {0}")]
    Db(#[from] DbErr),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::AccessDenied => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
