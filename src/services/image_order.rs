//! Gallery bookkeeping for product images.
//!
//! Per product the rows form a dense zero-based `display_order` sequence with
//! at most one primary image, and the primary (when present) sits at order 0.
//! The legacy `products.image_url` column mirrors the primary image URL.
//! Callers are expected to run these inside a transaction; nothing here
//! commits.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};

use super::ServiceError;
use crate::entities::{
    product,
    product_image::{self, Entity as ImageEntity},
};

/// Appends a batch of stored image URLs to a product, in submission order.
///
/// An empty gallery makes the first new image primary at order 0; otherwise
/// everything is appended non-primary after the current maximum order.
pub async fn append_images<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
    urls: &[String],
) -> Result<(), ServiceError> {
    let product = product::Entity::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No product with {} id was found", product_id))
        })?;

    let max_order = ImageEntity::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .order_by_desc(product_image::Column::DisplayOrder)
        .one(conn)
        .await?
        .map(|img| img.display_order);

    let gallery_was_empty = max_order.is_none();
    let mut next_order = max_order.map_or(0, |max| max + 1);

    for (idx, url) in urls.iter().enumerate() {
        let is_primary = gallery_was_empty && idx == 0;

        let new_image = product_image::ActiveModel {
            product_id: Set(product_id),
            image_url: Set(url.clone()),
            is_primary: Set(is_primary),
            display_order: Set(next_order),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        ImageEntity::insert(new_image).exec(conn).await?;

        if is_primary {
            let mut prod: product::ActiveModel = product.clone().into();
            prod.image_url = Set(Some(url.clone()));
            prod.update(conn).await?;
        }

        next_order += 1;
    }

    Ok(())
}

/// Removes one image and renumbers the rest so the order stays dense.
///
/// Deleting the primary promotes the lowest-ordered survivor to order 0
/// (clearing stray primary flags along the way) and re-mirrors the legacy
/// URL. Returns the deleted image's URL so the caller can unlink the file
/// after the transaction commits.
pub async fn delete_image<C: ConnectionTrait>(
    conn: &C,
    image_id: i32,
) -> Result<String, ServiceError> {
    let image = ImageEntity::find_by_id(image_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No image with {} id was found", image_id))
        })?;

    // The owning product must still be around; otherwise bail before touching
    // any sibling row.
    let product = product::Entity::find_by_id(image.product_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "No product with {} id was found",
                image.product_id
            ))
        })?;

    let deleted_order = image.display_order;
    let deleted_url = image.image_url.clone();

    if image.is_primary {
        let others = ImageEntity::find()
            .filter(product_image::Column::ProductId.eq(product.id))
            .filter(product_image::Column::Id.ne(image.id))
            .order_by_asc(product_image::Column::DisplayOrder)
            .all(conn)
            .await?;

        if others.is_empty() {
            let mut prod: product::ActiveModel = product.clone().into();
            prod.image_url = Set(None);
            prod.update(conn).await?;
        } else {
            // Self-heal: older data occasionally carried more than one
            // primary flag, so clear all of them before promoting.
            ImageEntity::update_many()
                .col_expr(product_image::Column::IsPrimary, Expr::value(false))
                .filter(product_image::Column::ProductId.eq(product.id))
                .filter(product_image::Column::Id.ne(image.id))
                .exec(conn)
                .await?;

            let promoted = others[0].clone();
            let promoted_order = promoted.display_order;

            let mut promoted_active: product_image::ActiveModel = promoted.clone().into();
            promoted_active.is_primary = Set(true);
            promoted_active.display_order = Set(0);
            promoted_active.update(conn).await?;

            // The promoted image jumped to the front; everything that sat
            // before its original position moves up one to make room.
            ImageEntity::update_many()
                .col_expr(
                    product_image::Column::DisplayOrder,
                    Expr::col(product_image::Column::DisplayOrder).add(1),
                )
                .filter(product_image::Column::ProductId.eq(product.id))
                .filter(product_image::Column::Id.ne(promoted.id))
                .filter(product_image::Column::Id.ne(image.id))
                .filter(product_image::Column::DisplayOrder.lt(promoted_order))
                .exec(conn)
                .await?;

            let mut prod: product::ActiveModel = product.clone().into();
            prod.image_url = Set(Some(promoted.image_url));
            prod.update(conn).await?;
        }
    }

    image.delete(conn).await?;

    // Close the gap using the order the deleted row held before removal.
    ImageEntity::update_many()
        .col_expr(
            product_image::Column::DisplayOrder,
            Expr::col(product_image::Column::DisplayOrder).sub(1),
        )
        .filter(product_image::Column::ProductId.eq(product.id))
        .filter(product_image::Column::DisplayOrder.gt(deleted_order))
        .exec(conn)
        .await?;

    Ok(deleted_url)
}

/// Ordered gallery for a product, primary first.
pub async fn list_images<C: ConnectionTrait>(
    conn: &C,
    product_id: i32,
) -> Result<Vec<product_image::Model>, ServiceError> {
    let images = ImageEntity::find()
        .filter(product_image::Column::ProductId.eq(product_id))
        .order_by_asc(product_image::Column::DisplayOrder)
        .all(conn)
        .await?;
    Ok(images)
}
