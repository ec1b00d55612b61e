mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, TransactionTrait};

use kramnytsia::entities::cart_item::{self, Entity as CartEntity};
use kramnytsia::entities::order::{Entity as OrderEntity, Status};
use kramnytsia::entities::order_item::{self, Entity as OrderItemEntity};
use kramnytsia::entities::user::Role;
use kramnytsia::services::cart::{self, CartLine};
use kramnytsia::services::ServiceError;

use common::{seed_product, seed_user, setup_db};

#[tokio::test]
async fn add_to_cart_upserts_by_product() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let product = seed_product(&db, "Bagel", None, true).await;

    cart::add_to_cart(&db, buyer.id, product.id, 2).await.unwrap();
    cart::add_to_cart(&db, buyer.id, product.id, 3).await.unwrap();

    let lines = cart::cart_lines(&db, buyer.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);
}

#[tokio::test]
async fn add_to_cart_rejects_bad_input() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let product = seed_product(&db, "Bagel", None, true).await;

    let err = cart::add_to_cart(&db, buyer.id, product.id, 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = cart::add_to_cart(&db, buyer.id, 404, 1).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn update_sets_absolute_quantity_and_zero_deletes() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let product = seed_product(&db, "Bagel", None, true).await;

    cart::add_to_cart(&db, buyer.id, product.id, 2).await.unwrap();
    let entry = CartEntity::find()
        .filter(cart_item::Column::UserId.eq(buyer.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    cart::update_cart_item(&db, buyer.id, entry.id, 7).await.unwrap();
    let lines = cart::cart_lines(&db, buyer.id).await.unwrap();
    assert_eq!(lines[0].quantity, 7);

    cart::update_cart_item(&db, buyer.id, entry.id, 0).await.unwrap();
    assert!(cart::cart_lines(&db, buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn cart_rows_are_owner_only() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let intruder = seed_user(&db, "intruder", Role::User).await;
    let product = seed_product(&db, "Bagel", None, true).await;

    cart::add_to_cart(&db, buyer.id, product.id, 1).await.unwrap();
    let entry = CartEntity::find()
        .filter(cart_item::Column::UserId.eq(buyer.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    let err = cart::update_cart_item(&db, intruder.id, entry.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied));

    let err = cart::remove_cart_item(&db, intruder.id, entry.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied));
}

#[tokio::test]
async fn sync_keeps_the_larger_quantity_and_skips_junk() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let bagel = seed_product(&db, "Bagel", None, true).await;
    let rusk = seed_product(&db, "Rusk", None, true).await;
    let pretzel = seed_product(&db, "Pretzel", None, true).await;
    let retired = seed_product(&db, "Retired", None, false).await;

    cart::add_to_cart(&db, buyer.id, bagel.id, 5).await.unwrap();
    cart::add_to_cart(&db, buyer.id, rusk.id, 2).await.unwrap();

    let incoming = vec![
        // Smaller than the stored 5, must not shrink it.
        CartLine { product_id: bagel.id, quantity: 2 },
        // Larger than the stored 2, wins.
        CartLine { product_id: rusk.id, quantity: 5 },
        // New row.
        CartLine { product_id: pretzel.id, quantity: 3 },
        // Inactive, ghost and non-positive entries are skipped.
        CartLine { product_id: retired.id, quantity: 1 },
        CartLine { product_id: 404, quantity: 1 },
        CartLine { product_id: pretzel.id, quantity: 0 },
    ];

    let synced = cart::sync_cart(&db, buyer.id, &incoming).await.unwrap();
    assert_eq!(synced, 1);

    let mut lines = cart::cart_lines(&db, buyer.id).await.unwrap();
    lines.sort_by_key(|line| line.product_id);
    assert_eq!(
        lines,
        vec![
            CartLine { product_id: bagel.id, quantity: 5 },
            CartLine { product_id: rusk.id, quantity: 5 },
            CartLine { product_id: pretzel.id, quantity: 3 },
        ]
    );
}

#[tokio::test]
async fn checkout_turns_cart_rows_into_an_order() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let bagel = seed_product(&db, "Bagel", None, true).await;
    let pretzel = seed_product(&db, "Pretzel", None, true).await;

    cart::add_to_cart(&db, buyer.id, bagel.id, 2).await.unwrap();
    cart::add_to_cart(&db, buyer.id, pretzel.id, 4).await.unwrap();

    let order = cart::checkout(&db, &buyer).await.unwrap();

    assert_eq!(order.status, Status::Pending);
    assert_eq!(order.city.as_deref(), Some("Kyiv"));
    assert_eq!(order.institution.as_deref(), Some("School 12"));

    let items = cart::order_items(&db, order.id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].product_id, bagel.id);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[1].product_id, pretzel.id);
    assert_eq!(items[1].quantity, 4);

    assert!(cart::cart_lines(&db, buyer.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn checkout_of_an_empty_cart_is_rejected() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;

    let err = cart::checkout(&db, &buyer).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(OrderEntity::find().count(&db).await.unwrap(), 0);
}

/// A rolled back checkout leaves the cart exactly as it was, with no order
/// or item rows leaking through.
#[tokio::test]
async fn rolled_back_checkout_leaves_everything_in_place() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let bagel = seed_product(&db, "Bagel", None, true).await;
    cart::add_to_cart(&db, buyer.id, bagel.id, 2).await.unwrap();

    let txn = db.begin().await.unwrap();
    let order = cart::checkout(&txn, &buyer).await.unwrap();
    assert!(cart::cart_lines(&txn, buyer.id).await.unwrap().is_empty());
    txn.rollback().await.unwrap();

    assert_eq!(cart::cart_lines(&db, buyer.id).await.unwrap().len(), 1);
    assert!(OrderEntity::find_by_id(order.id).one(&db).await.unwrap().is_none());
    assert_eq!(
        OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .count(&db)
            .await
            .unwrap(),
        0
    );
}

/// A rolled back sync leaves the stored cart exactly as it was, new rows and
/// quantity bumps included.
#[tokio::test]
async fn rolled_back_sync_leaves_the_cart_untouched() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let bagel = seed_product(&db, "Bagel", None, true).await;
    let pretzel = seed_product(&db, "Pretzel", None, true).await;
    cart::add_to_cart(&db, buyer.id, bagel.id, 2).await.unwrap();

    let before = cart::cart_lines(&db, buyer.id).await.unwrap();

    let incoming = vec![
        CartLine { product_id: bagel.id, quantity: 9 },
        CartLine { product_id: pretzel.id, quantity: 3 },
    ];

    let txn = db.begin().await.unwrap();
    let synced = cart::sync_cart(&txn, buyer.id, &incoming).await.unwrap();
    assert_eq!(synced, 1);
    assert_eq!(cart::cart_lines(&txn, buyer.id).await.unwrap().len(), 2);
    txn.rollback().await.unwrap();

    assert_eq!(cart::cart_lines(&db, buyer.id).await.unwrap(), before);
}

#[tokio::test]
async fn cancel_is_pending_only_and_owner_only() {
    let db = setup_db().await;
    let buyer = seed_user(&db, "buyer", Role::User).await;
    let intruder = seed_user(&db, "intruder", Role::User).await;
    let bagel = seed_product(&db, "Bagel", None, true).await;

    cart::add_to_cart(&db, buyer.id, bagel.id, 1).await.unwrap();
    let order = cart::checkout(&db, &buyer).await.unwrap();

    let err = cart::cancel_order(&db, intruder.id, order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied));

    cart::cancel_order(&db, buyer.id, order.id).await.unwrap();
    let reloaded = OrderEntity::find_by_id(order.id).one(&db).await.unwrap().unwrap();
    assert_eq!(reloaded.status, Status::Cancelled);

    // Already cancelled, a second cancel is rejected.
    let err = cart::cancel_order(&db, buyer.id, order.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
