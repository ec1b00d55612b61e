pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_image;
pub mod setting;
pub mod user;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Schema, Set,
};

use crate::entities::{
    cart_item::Entity as CartItem, category::Entity as Category, order::Entity as Order,
    order_item::Entity as OrderItem, product::Entity as Product,
    product_image::Entity as ProductImage, setting::Entity as Setting, user::Entity as User,
};

pub async fn setup_schema(db: &DatabaseConnection) {
    let schema = Schema::new(db.get_database_backend());

    let mut create_user_table = schema.create_table_from_entity(User);
    create_user_table.if_not_exists();
    let mut create_category_table = schema.create_table_from_entity(Category);
    create_category_table.if_not_exists();
    let mut create_product_table = schema.create_table_from_entity(Product);
    create_product_table.if_not_exists();
    let mut create_image_table = schema.create_table_from_entity(ProductImage);
    create_image_table.if_not_exists();
    let mut create_cart_table = schema.create_table_from_entity(CartItem);
    create_cart_table.if_not_exists();
    let mut create_order_table = schema.create_table_from_entity(Order);
    create_order_table.if_not_exists();
    let mut create_order_item_table = schema.create_table_from_entity(OrderItem);
    create_order_item_table.if_not_exists();
    let mut create_setting_table = schema.create_table_from_entity(Setting);
    create_setting_table.if_not_exists();

    db.execute(db.get_database_backend().build(&create_user_table))
        .await
        .expect("Failed to create users schema");
    db.execute(db.get_database_backend().build(&create_category_table))
        .await
        .expect("Failed to create categories schema");
    db.execute(db.get_database_backend().build(&create_product_table))
        .await
        .expect("Failed to create products schema");
    db.execute(db.get_database_backend().build(&create_image_table))
        .await
        .expect("Failed to create product_images schema");
    db.execute(db.get_database_backend().build(&create_cart_table))
        .await
        .expect("Failed to create cart_items schema");
    db.execute(db.get_database_backend().build(&create_order_table))
        .await
        .expect("Failed to create orders schema");
    db.execute(db.get_database_backend().build(&create_order_item_table))
        .await
        .expect("Failed to create order_items schema");
    db.execute(db.get_database_backend().build(&create_setting_table))
        .await
        .expect("Failed to create settings schema");
}

/// Seeds the admin account on first boot. No-op when an admin already exists.
pub async fn primary_setup(db: &DatabaseConnection) {
    let existing = User::find()
        .filter(user::Column::Role.eq(user::Role::Admin))
        .one(db)
        .await
        .expect("Failed to query for an existing admin");

    if existing.is_some() {
        return;
    }

    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .expect("Failed to hash admin password")
        .to_string();

    let new_admin = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        password: Set(password_hash),
        role: Set(user::Role::Admin),
        is_blocked: Set(false),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    User::insert(new_admin)
        .exec(db)
        .await
        .expect("Failed to seed the admin account");
}
