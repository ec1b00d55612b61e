mod common;

use sea_orm::{DatabaseConnection, EntityTrait};

use kramnytsia::entities::product::Entity as ProductEntity;
use kramnytsia::entities::product_image;
use kramnytsia::services::image_order;
use kramnytsia::services::ServiceError;

use common::{seed_product, setup_db};

fn urls(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|n| format!("/static/uploads/products/{}", n))
        .collect()
}

async fn gallery(db: &DatabaseConnection, product_id: i32) -> Vec<product_image::Model> {
    image_order::list_images(db, product_id)
        .await
        .expect("Failed to list the gallery")
}

/// Order is dense and zero-based, and exactly one primary sits at order 0
/// (unless the gallery is empty).
fn assert_invariants(images: &[product_image::Model]) {
    for (idx, img) in images.iter().enumerate() {
        assert_eq!(img.display_order, idx as i32, "order must stay dense");
    }
    let primaries: Vec<_> = images.iter().filter(|img| img.is_primary).collect();
    if images.is_empty() {
        assert!(primaries.is_empty());
    } else {
        assert_eq!(primaries.len(), 1, "exactly one primary image");
        assert_eq!(primaries[0].display_order, 0, "primary sits at order 0");
    }
}

async fn mirror(db: &DatabaseConnection, product_id: i32) -> Option<String> {
    ProductEntity::find_by_id(product_id)
        .one(db)
        .await
        .expect("Failed to reload the product")
        .expect("Product vanished")
        .image_url
}

#[tokio::test]
async fn first_image_becomes_primary_and_mirrors() {
    let db = setup_db().await;
    let product = seed_product(&db, "Bagel", None, true).await;

    image_order::append_images(&db, product.id, &urls(&["a.png"]))
        .await
        .expect("Append failed");

    let images = gallery(&db, product.id).await;
    assert_eq!(images.len(), 1);
    assert!(images[0].is_primary);
    assert_eq!(images[0].display_order, 0);
    assert_eq!(mirror(&db, product.id).await.as_deref(), Some(images[0].image_url.as_str()));
}

#[tokio::test]
async fn appended_images_never_steal_primary() {
    let db = setup_db().await;
    let product = seed_product(&db, "Bagel", None, true).await;

    image_order::append_images(&db, product.id, &urls(&["a.png", "b.png", "c.png"]))
        .await
        .expect("Append failed");
    image_order::append_images(&db, product.id, &urls(&["d.png"]))
        .await
        .expect("Second append failed");

    let images = gallery(&db, product.id).await;
    assert_eq!(images.len(), 4);
    assert_invariants(&images);
    assert!(images[0].image_url.ends_with("a.png"));
    assert!(images[3].image_url.ends_with("d.png"));
    assert!(!images[3].is_primary);
}

#[tokio::test]
async fn deleting_primary_promotes_lowest_order() {
    let db = setup_db().await;
    let product = seed_product(&db, "Bagel", None, true).await;
    image_order::append_images(&db, product.id, &urls(&["a.png", "b.png", "c.png"]))
        .await
        .expect("Append failed");

    let images = gallery(&db, product.id).await;
    image_order::delete_image(&db, images[0].id)
        .await
        .expect("Delete failed");

    let images = gallery(&db, product.id).await;
    assert_eq!(images.len(), 2);
    assert_invariants(&images);
    assert!(images[0].image_url.ends_with("b.png"));
    assert!(images[1].image_url.ends_with("c.png"));
    assert_eq!(mirror(&db, product.id).await.as_deref(), Some(images[0].image_url.as_str()));
}

#[tokio::test]
async fn deleting_middle_image_closes_the_gap() {
    let db = setup_db().await;
    let product = seed_product(&db, "Bagel", None, true).await;
    image_order::append_images(&db, product.id, &urls(&["a.png", "b.png", "c.png", "d.png"]))
        .await
        .expect("Append failed");

    let images = gallery(&db, product.id).await;
    // Delete the image at order 2.
    image_order::delete_image(&db, images[2].id)
        .await
        .expect("Delete failed");

    let images = gallery(&db, product.id).await;
    assert_eq!(images.len(), 3);
    assert_invariants(&images);
    assert!(images[0].image_url.ends_with("a.png"));
    assert!(images[1].image_url.ends_with("b.png"));
    assert!(images[2].image_url.ends_with("d.png"));
    assert_eq!(mirror(&db, product.id).await.as_deref(), Some(images[0].image_url.as_str()));
}

#[tokio::test]
async fn deleting_the_only_image_clears_the_mirror() {
    let db = setup_db().await;
    let product = seed_product(&db, "Bagel", None, true).await;
    image_order::append_images(&db, product.id, &urls(&["a.png"]))
        .await
        .expect("Append failed");

    let images = gallery(&db, product.id).await;
    let deleted_url = image_order::delete_image(&db, images[0].id)
        .await
        .expect("Delete failed");

    assert!(deleted_url.ends_with("a.png"));
    assert!(gallery(&db, product.id).await.is_empty());
    assert_eq!(mirror(&db, product.id).await, None);
}

#[tokio::test]
async fn invariants_survive_a_mixed_sequence() {
    let db = setup_db().await;
    let product = seed_product(&db, "Bagel", None, true).await;

    image_order::append_images(&db, product.id, &urls(&["a.png", "b.png", "c.png"]))
        .await
        .expect("Append failed");
    let images = gallery(&db, product.id).await;
    image_order::delete_image(&db, images[1].id)
        .await
        .expect("Delete failed");
    image_order::append_images(&db, product.id, &urls(&["d.png", "e.png"]))
        .await
        .expect("Append failed");
    let images = gallery(&db, product.id).await;
    image_order::delete_image(&db, images[0].id)
        .await
        .expect("Delete of primary failed");

    let images = gallery(&db, product.id).await;
    assert_eq!(images.len(), 3);
    assert_invariants(&images);
    assert_eq!(mirror(&db, product.id).await.as_deref(), Some(images[0].image_url.as_str()));
}

#[tokio::test]
async fn deleting_a_ghost_image_is_not_found() {
    let db = setup_db().await;

    let err = image_order::delete_image(&db, 404).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn appending_to_a_ghost_product_is_not_found() {
    let db = setup_db().await;

    let err = image_order::append_images(&db, 404, &urls(&["a.png"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}
