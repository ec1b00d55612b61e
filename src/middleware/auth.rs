use crate::config;
use crate::entities::user::{Entity as UserEntity, Role};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => match header.strip_prefix("Bearer ") {
            Some(token) => token,
            _ => return Err(StatusCode::UNAUTHORIZED),
        },
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let claims = match validate_token(state.db.clone(), token, state.role).await {
        Ok(claims) => claims,
        Err(AuthMiddlewareError::AccountBlocked) => return Err(StatusCode::FORBIDDEN),
        Err(err) => {
            tracing::debug!(error = %err, "Rejected token");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: String,
    pub exp: usize,
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub role: Role,
}

pub fn generate_token(user_id: i32, role: Role) -> Result<String, AuthMiddlewareError> {
    let exp = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or(AuthMiddlewareError::GenerationFail)?
        .timestamp() as usize;

    let claims = Claims {
        user_id,
        role: role.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config::secret_key().as_bytes()),
    )
    .map_err(|_| AuthMiddlewareError::GenerationFail)
}

/// Decodes the token, re-checks the user row (role drift, deletion and
/// blocking all invalidate an otherwise valid token) and enforces the route
/// role. Admins pass user-gated routes; the reverse does not hold.
pub async fn validate_token(
    db: Arc<DatabaseConnection>,
    token: &str,
    req_role: Role,
) -> Result<Claims, AuthMiddlewareError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config::secret_key().as_bytes()),
        &validation,
    )
    .map_err(|_| AuthMiddlewareError::TokenExpired)?;

    let claims = token_data.claims;

    let role = Role::from_str(&claims.role).map_err(|_| AuthMiddlewareError::ValidationFail)?;

    let account = match UserEntity::find_by_id(claims.user_id).one(&*db).await {
        Ok(Some(account)) => account,
        Ok(None) => return Err(AuthMiddlewareError::InvalidUserOrRole),
        Err(_) => return Err(AuthMiddlewareError::InternalServerError),
    };

    if account.role != role {
        return Err(AuthMiddlewareError::InvalidUserOrRole);
    }

    if account.is_blocked {
        return Err(AuthMiddlewareError::AccountBlocked);
    }

    let allowed = match req_role {
        Role::User => true,
        Role::Admin => role == Role::Admin,
    };
    if !allowed {
        return Err(AuthMiddlewareError::InvalidUserOrRole);
    }

    Ok(claims)
}

#[derive(Error, Debug)]
pub enum AuthMiddlewareError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Account is blocked")]
    AccountBlocked,
    #[error("Token expired")]
    TokenExpired,
    #[error("Failed to validate token")]
    ValidationFail,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Internal server error")]
    InternalServerError,
}
