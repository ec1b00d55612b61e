mod common;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tower::ServiceExt;

use kramnytsia::api::create_api_router;
use kramnytsia::entities::user::{self, Role};
use kramnytsia::middleware::auth::{generate_token, validate_token, AuthMiddlewareError};

use common::setup_db;

async fn seed_account(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    role: Role,
    is_blocked: bool,
) -> user::Model {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("Failed to hash the test password")
        .to_string();

    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password: Set(hash),
        city: Set(None),
        institution: Set(None),
        role: Set(role),
        is_blocked: Set(is_blocked),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed an account")
}

/// An otherwise valid token stops working the moment the account is blocked.
#[tokio::test]
async fn blocked_account_invalidates_a_valid_token() {
    std::env::set_var("SECRET", "test-secret");
    let db = setup_db().await;
    let blocked = seed_account(&db, "blocked", "Muzion15", Role::User, true).await;

    let token = generate_token(blocked.id, Role::User).expect("Failed to issue a token");
    let err = validate_token(Arc::new(db), &token, Role::User)
        .await
        .unwrap_err();

    assert!(matches!(err, AuthMiddlewareError::AccountBlocked));
}

#[tokio::test]
async fn blocked_account_cannot_log_in() {
    std::env::set_var("SECRET", "test-secret");
    let db = setup_db().await;
    seed_account(&db, "blocked", "Muzion15", Role::User, true).await;
    seed_account(&db, "active", "Muzion15", Role::User, false).await;

    let app = create_api_router(Arc::new(db));

    // Correct credentials, blocked account: refused at the door.
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": "blocked",
                "password": "Muzion15"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Same credentials on an unblocked account log in fine.
    let request = Request::builder()
        .method("POST")
        .uri("/api/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "username": "active",
                "password": "Muzion15"
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// The middleware turns a blocked account into a 403 on every guarded route.
#[tokio::test]
async fn blocked_bearer_is_rejected_on_guarded_routes() {
    std::env::set_var("SECRET", "test-secret");
    let db = setup_db().await;
    let blocked = seed_account(&db, "blocked", "Muzion15", Role::User, true).await;
    let active = seed_account(&db, "active", "Muzion15", Role::User, false).await;

    let app = create_api_router(Arc::new(db));

    let blocked_token = generate_token(blocked.id, Role::User).unwrap();
    let request = Request::builder()
        .method("GET")
        .uri("/api/cart")
        .header("Authorization", format!("Bearer {}", blocked_token))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let active_token = generate_token(active.id, Role::User).unwrap();
    let request = Request::builder()
        .method("GET")
        .uri("/api/cart")
        .header("Authorization", format!("Bearer {}", active_token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
