mod common;

use sea_orm::EntityTrait;

use kramnytsia::entities::category::Entity as CategoryEntity;
use kramnytsia::services::category_tree::{self, NO_PARENT};
use kramnytsia::services::ServiceError;

use common::{seed_category, seed_product, setup_db};

#[tokio::test]
async fn tree_shows_top_level_with_direct_children() {
    let db = setup_db().await;
    let drinks = seed_category(&db, "Drinks", None).await;
    let juices = seed_category(&db, "Juices", Some(drinks.id)).await;
    seed_category(&db, "Apple juice", Some(juices.id)).await;
    seed_category(&db, "Bakery", None).await;

    let tree = category_tree::build_tree(&db).await.expect("Tree failed");

    assert_eq!(tree.len(), 2);
    let drinks_node = tree.iter().find(|node| node.name == "Drinks").unwrap();
    assert_eq!(drinks_node.children.len(), 1);
    assert_eq!(drinks_node.children[0].full_path, "Drinks > Juices");
    // The grandchild stays out of the navigation tree.
    assert!(tree
        .iter()
        .all(|node| node.children.iter().all(|c| c.name != "Apple juice")));
}

#[tokio::test]
async fn descendants_cover_the_whole_subtree() {
    let db = setup_db().await;
    let root = seed_category(&db, "Root", None).await;
    let child = seed_category(&db, "Child", Some(root.id)).await;
    let grandchild = seed_category(&db, "Grandchild", Some(child.id)).await;
    let other = seed_category(&db, "Other", None).await;

    let ids = category_tree::descendant_ids(&db, root.id)
        .await
        .expect("Walk failed");

    assert!(ids.contains(&root.id));
    assert!(ids.contains(&child.id));
    assert!(ids.contains(&grandchild.id));
    assert!(!ids.contains(&other.id));
}

#[tokio::test]
async fn parent_options_exclude_own_subtree() {
    let db = setup_db().await;
    let edited = seed_category(&db, "Edited", None).await;
    seed_category(&db, "Child of edited", Some(edited.id)).await;
    let candidate = seed_category(&db, "Candidate", None).await;

    let options = category_tree::parent_options(&db, edited.id)
        .await
        .expect("Options failed");

    assert!(options.iter().any(|cat| cat.id == candidate.id));
    assert!(options.iter().all(|cat| cat.id != edited.id));
}

#[tokio::test]
async fn parent_options_force_include_the_stored_parent() {
    let db = setup_db().await;
    let top = seed_category(&db, "Top", None).await;
    let parent = seed_category(&db, "Parent", Some(top.id)).await;
    // `parent` is not top-level, so the plain candidate rule would drop it.
    let edited = seed_category(&db, "Edited", Some(parent.id)).await;

    let options = category_tree::parent_options(&db, edited.id)
        .await
        .expect("Options failed");

    assert!(options.iter().any(|cat| cat.id == parent.id));
}

#[tokio::test]
async fn normalize_parent_maps_sentinel_and_ghosts_to_none() {
    let db = setup_db().await;
    let real = seed_category(&db, "Real", None).await;

    assert_eq!(category_tree::normalize_parent(&db, None).await.unwrap(), None);
    assert_eq!(
        category_tree::normalize_parent(&db, Some(NO_PARENT)).await.unwrap(),
        None
    );
    assert_eq!(
        category_tree::normalize_parent(&db, Some(404)).await.unwrap(),
        None
    );
    assert_eq!(
        category_tree::normalize_parent(&db, Some(real.id)).await.unwrap(),
        Some(real.id)
    );
}

#[tokio::test]
async fn set_parent_rejects_cycles() {
    let db = setup_db().await;
    let root = seed_category(&db, "Root", None).await;
    let child = seed_category(&db, "Child", Some(root.id)).await;
    let grandchild = seed_category(&db, "Grandchild", Some(child.id)).await;

    // Direct self-parenting.
    let err = category_tree::set_parent(&db, root.id, Some(root.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // Re-parenting under a deep descendant.
    let err = category_tree::set_parent(&db, root.id, Some(grandchild.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    // The hierarchy is untouched after both rejections.
    let reloaded = CategoryEntity::find_by_id(root.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.parent_id, None);
}

#[tokio::test]
async fn set_parent_accepts_a_valid_move_and_the_sentinel() {
    let db = setup_db().await;
    let root = seed_category(&db, "Root", None).await;
    let moved = seed_category(&db, "Moved", None).await;

    category_tree::set_parent(&db, moved.id, Some(root.id))
        .await
        .expect("Move failed");
    let reloaded = CategoryEntity::find_by_id(moved.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.parent_id, Some(root.id));

    category_tree::set_parent(&db, moved.id, Some(NO_PARENT))
        .await
        .expect("Clear failed");
    let reloaded = CategoryEntity::find_by_id(moved.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.parent_id, None);
}

#[tokio::test]
async fn delete_is_guarded_by_products_and_children() {
    let db = setup_db().await;
    let with_products = seed_category(&db, "With products", None).await;
    seed_product(&db, "Bagel", Some(with_products.id), true).await;

    let err = category_tree::delete_category(&db, with_products.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let with_children = seed_category(&db, "With children", None).await;
    seed_category(&db, "Child", Some(with_children.id)).await;

    let err = category_tree::delete_category(&db, with_children.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let empty = seed_category(&db, "Empty", None).await;
    category_tree::delete_category(&db, empty.id)
        .await
        .expect("Delete failed");
    assert!(CategoryEntity::find_by_id(empty.id)
        .one(&db)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn category_path_renders_one_ancestry_level() {
    let db = setup_db().await;
    let drinks = seed_category(&db, "Drinks", None).await;
    let juices = seed_category(&db, "Juices", Some(drinks.id)).await;

    assert_eq!(
        category_tree::category_path(&db, Some(juices.id)).await.unwrap(),
        Some("Drinks > Juices".to_string())
    );
    assert_eq!(
        category_tree::category_path(&db, Some(drinks.id)).await.unwrap(),
        Some("Drinks".to_string())
    );
    assert_eq!(category_tree::category_path(&db, None).await.unwrap(), None);
    assert_eq!(category_tree::category_path(&db, Some(404)).await.unwrap(), None);
}
