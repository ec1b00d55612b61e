mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::{EntityTrait, PaginatorTrait};
use std::sync::Arc;
use tower::ServiceExt;

use kramnytsia::api::create_api_router;
use kramnytsia::entities::product::Entity as ProductEntity;
use kramnytsia::entities::user::Role;
use kramnytsia::middleware::auth::generate_token;

use common::{seed_user, setup_db};

fn product_request(token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/admin/product")
        .header("Authorization", format!("Bearer {}", token))
        .header("content-type", "multipart/form-data; boundary=XYZ")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn well_formed_product_form_creates_the_product() {
    std::env::set_var("SECRET", "test-secret");
    let db = setup_db().await;
    let admin = seed_user(&db, "manager", Role::Admin).await;
    let token = generate_token(admin.id, Role::Admin).unwrap();
    let app = create_api_router(Arc::new(db));

    let body = "--XYZ\r\n\
        Content-Disposition: form-data; name=\"name\"\r\n\r\n\
        Bagel\r\n\
        --XYZ\r\n\
        Content-Disposition: form-data; name=\"description\"\r\n\r\n\
        Sesame ring\r\n\
        --XYZ--\r\n";

    let response = app.oneshot(product_request(&token, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// A body that stops mid-part must fail the whole request, not be read as a
/// form that simply has fewer fields.
#[tokio::test]
async fn truncated_multipart_body_is_rejected_outright() {
    std::env::set_var("SECRET", "test-secret");
    let db = setup_db().await;
    let admin = seed_user(&db, "manager", Role::Admin).await;
    let token = generate_token(admin.id, Role::Admin).unwrap();
    let app = create_api_router(Arc::new(db.clone()));

    // One complete field, then a part whose headers break off mid-line.
    let body = "--XYZ\r\n\
        Content-Disposition: form-data; name=\"name\"\r\n\r\n\
        Bagel\r\n\
        --XYZ\r\n\
        Content-Disposition: form-data; nam";

    let response = app.oneshot(product_request(&token, body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["error"], "Malformed multipart body");

    // The complete "name" field it did carry must not leak into a product.
    assert_eq!(ProductEntity::find().count(&db).await.unwrap(), 0);
}
