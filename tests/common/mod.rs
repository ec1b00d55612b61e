#![allow(dead_code)]

use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use kramnytsia::entities::{category, product, setup_schema, user};

/// Fresh in-memory database. Pool size is pinned to one connection, since
/// every pooled `sqlite::memory:` connection would otherwise get its own
/// empty database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options)
        .await
        .expect("Failed to open the in-memory database");
    setup_schema(&db).await;
    db
}

pub async fn seed_user(db: &DatabaseConnection, username: &str, role: user::Role) -> user::Model {
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{}@example.com", username)),
        password: Set("not-a-real-hash".to_string()),
        city: Set(Some("Kyiv".to_string())),
        institution: Set(Some("School 12".to_string())),
        role: Set(role),
        is_blocked: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed a user")
}

pub async fn seed_category(
    db: &DatabaseConnection,
    name: &str,
    parent_id: Option<i32>,
) -> category::Model {
    category::ActiveModel {
        name: Set(name.to_string()),
        parent_id: Set(parent_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed a category")
}

pub async fn seed_product(
    db: &DatabaseConnection,
    name: &str,
    category_id: Option<i32>,
    is_active: bool,
) -> product::Model {
    product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(format!("{} description", name)),
        image_url: Set(None),
        category_id: Set(category_id),
        is_active: Set(is_active),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed a product")
}
