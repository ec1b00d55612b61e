//! Cart mutation and checkout. Handlers open the transaction; every helper
//! here only reads and writes through the connection it is given.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use super::ServiceError;
use crate::entities::{
    cart_item::{self, Entity as CartEntity},
    order::{self, Entity as OrderEntity, Status},
    order_item,
    product::{self, Entity as ProductEntity},
    user,
};

/// Wire shape shared by the cart read API and the sync endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CartLine {
    pub product_id: i32,
    pub quantity: i32,
}

pub async fn cart_lines<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<CartLine>, ServiceError> {
    let lines = CartEntity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .order_by_asc(cart_item::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|item| CartLine {
            product_id: item.product_id,
            quantity: item.quantity,
        })
        .collect();
    Ok(lines)
}

/// Upsert by (user, product): an existing row gets its quantity incremented.
pub async fn add_to_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    product_id: i32,
    quantity: i32,
) -> Result<(), ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::Validation(
            "Quantity should be greater than 0".to_string(),
        ));
    }

    ProductEntity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No product with {} id was found", product_id))
        })?;

    let existing = CartEntity::find()
        .filter(cart_item::Column::UserId.eq(user_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(conn)
        .await?;

    match existing {
        Some(entry) => {
            let current = entry.quantity;
            let mut entry: cart_item::ActiveModel = entry.into();
            entry.quantity = Set(current + quantity);
            entry.update(conn).await?;
        }
        None => {
            let new_entry = cart_item::ActiveModel {
                user_id: Set(user_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                created_at: Set(chrono::Utc::now()),
                ..Default::default()
            };
            CartEntity::insert(new_entry).exec(conn).await?;
        }
    }

    Ok(())
}

/// Absolute quantity replace; zero or less removes the row instead.
pub async fn update_cart_item<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    item_id: i32,
    quantity: i32,
) -> Result<(), ServiceError> {
    let entry = CartEntity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No cart entry with {} id was found", item_id))
        })?;

    if entry.user_id != user_id {
        return Err(ServiceError::AccessDenied);
    }

    if quantity <= 0 {
        entry.delete(conn).await?;
        return Ok(());
    }

    let mut entry: cart_item::ActiveModel = entry.into();
    entry.quantity = Set(quantity);
    entry.update(conn).await?;
    Ok(())
}

pub async fn remove_cart_item<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    item_id: i32,
) -> Result<(), ServiceError> {
    let entry = CartEntity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No cart entry with {} id was found", item_id))
        })?;

    if entry.user_id != user_id {
        return Err(ServiceError::AccessDenied);
    }

    entry.delete(conn).await?;
    Ok(())
}

/// Merge from a client-side cart. Missing or inactive products and
/// non-positive quantities are skipped, not errors; an existing row keeps
/// the larger of the two quantities. Returns how many new rows were added.
pub async fn sync_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    incoming: &[CartLine],
) -> Result<u32, ServiceError> {
    let mut synced = 0;

    for line in incoming {
        if line.quantity <= 0 {
            continue;
        }

        let product = ProductEntity::find_by_id(line.product_id).one(conn).await?;
        let product = match product {
            Some(product) if product.is_active => product,
            _ => continue,
        };

        let existing = CartEntity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(product.id))
            .one(conn)
            .await?;

        match existing {
            Some(entry) => {
                if line.quantity > entry.quantity {
                    let mut entry: cart_item::ActiveModel = entry.into();
                    entry.quantity = Set(line.quantity);
                    entry.update(conn).await?;
                }
            }
            None => {
                let new_entry = cart_item::ActiveModel {
                    user_id: Set(user_id),
                    product_id: Set(product.id),
                    quantity: Set(line.quantity),
                    created_at: Set(chrono::Utc::now()),
                    ..Default::default()
                };
                CartEntity::insert(new_entry).exec(conn).await?;
                synced += 1;
            }
        }
    }

    Ok(synced)
}

/// Converts the user's cart into an immutable order snapshot: one order row,
/// one order item per cart row, cart emptied. All of it rides the caller's
/// transaction, so a failure anywhere leaves the cart untouched.
pub async fn checkout<C: ConnectionTrait>(
    conn: &C,
    user: &user::Model,
) -> Result<order::Model, ServiceError> {
    let cart_rows = CartEntity::find()
        .filter(cart_item::Column::UserId.eq(user.id))
        .order_by_asc(cart_item::Column::Id)
        .all(conn)
        .await?;

    if cart_rows.is_empty() {
        return Err(ServiceError::Validation("Cart is empty".to_string()));
    }

    let now = chrono::Utc::now();
    let new_order = order::ActiveModel {
        user_id: Set(user.id),
        status: Set(Status::Pending),
        city: Set(user.city.clone()),
        institution: Set(user.institution.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let order = new_order.insert(conn).await?;

    for row in cart_rows {
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            quantity: Set(row.quantity),
            ..Default::default()
        };
        order_item::Entity::insert(item).exec(conn).await?;

        row.delete(conn).await?;
    }

    Ok(order)
}

/// A user may cancel their own order while it is still pending; any other
/// status is rejected without touching the row.
pub async fn cancel_order<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    order_id: i32,
) -> Result<(), ServiceError> {
    let order = OrderEntity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No order with {} id was found", order_id))
        })?;

    if order.user_id != user_id {
        return Err(ServiceError::AccessDenied);
    }

    if order.status != Status::Pending {
        return Err(ServiceError::Validation(
            "Only pending orders can be cancelled".to_string(),
        ));
    }

    let mut order: order::ActiveModel = order.into();
    order.status = Set(Status::Cancelled);
    order.updated_at = Set(chrono::Utc::now());
    order.update(conn).await?;
    Ok(())
}

pub async fn user_orders<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
) -> Result<Vec<order::Model>, ServiceError> {
    let orders = OrderEntity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .all(conn)
        .await?;
    Ok(orders)
}

pub async fn order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<Vec<order_item::Model>, ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?;
    Ok(items)
}
