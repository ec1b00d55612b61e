use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;

use kramnytsia::api::create_api_router;
use kramnytsia::config;
use kramnytsia::entities::{primary_setup, setup_schema};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let db: DatabaseConnection = Database::connect(&config::database_url())
        .await
        .expect("Failed to connect to the database");
    setup_schema(&db).await;
    primary_setup(&db).await;

    let shared_db = Arc::new(db);
    let app = create_api_router(shared_db);

    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind the listening address");
    tracing::info!(%addr, "Listening");
    axum::serve(listener, app).await.expect("Server failed");
}
