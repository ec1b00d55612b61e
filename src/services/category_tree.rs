//! Category hierarchy helpers.
//!
//! The parent relation is kept acyclic by excluding a category and its whole
//! subtree from the parent selector while editing. The tree is worked on as
//! id-indexed maps, never as linked structures.

use std::collections::{HashMap, HashSet};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use super::ServiceError;
use crate::entities::{
    category::{self, Entity as CategoryEntity},
    product,
};

/// Sentinel the parent selector uses for "no parent". Never a real id, since
/// primary keys start at 1.
pub const NO_PARENT: i32 = 0;

#[derive(Serialize, Debug, PartialEq)]
pub struct CategoryNode {
    pub id: i32,
    pub name: String,
    pub full_path: String,
    pub children: Vec<CategoryChild>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct CategoryChild {
    pub id: i32,
    pub name: String,
    pub full_path: String,
}

/// One rendered ancestry level, matching the storefront display.
fn full_path(parent_name: Option<&str>, name: &str) -> String {
    match parent_name {
        Some(parent) => format!("{} > {}", parent, name),
        None => name.to_string(),
    }
}

/// Navigation tree: top-level categories with their direct children. The
/// stored hierarchy may go deeper; the catalog only shows one level down.
pub async fn build_tree<C: ConnectionTrait>(conn: &C) -> Result<Vec<CategoryNode>, ServiceError> {
    let all = CategoryEntity::find()
        .order_by_asc(category::Column::Name)
        .all(conn)
        .await?;

    let mut children_of: HashMap<i32, Vec<&category::Model>> = HashMap::new();
    for cat in &all {
        if let Some(parent_id) = cat.parent_id {
            children_of.entry(parent_id).or_default().push(cat);
        }
    }

    let tree = all
        .iter()
        .filter(|cat| cat.parent_id.is_none())
        .map(|cat| CategoryNode {
            id: cat.id,
            name: cat.name.clone(),
            full_path: cat.name.clone(),
            children: children_of
                .get(&cat.id)
                .map(|kids| {
                    kids.iter()
                        .map(|child| CategoryChild {
                            id: child.id,
                            name: child.name.clone(),
                            full_path: full_path(Some(&cat.name), &child.name),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    Ok(tree)
}

/// The category itself plus every descendant, walked through a children
/// index so a corrupted (cyclic) hierarchy cannot loop forever.
pub async fn descendant_ids<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
) -> Result<HashSet<i32>, ServiceError> {
    let all = CategoryEntity::find().all(conn).await?;

    let mut children_of: HashMap<i32, Vec<i32>> = HashMap::new();
    for cat in &all {
        if let Some(parent_id) = cat.parent_id {
            children_of.entry(parent_id).or_default().push(cat.id);
        }
    }

    let mut collected = HashSet::new();
    let mut stack = vec![category_id];
    while let Some(id) = stack.pop() {
        if !collected.insert(id) {
            continue;
        }
        if let Some(kids) = children_of.get(&id) {
            stack.extend(kids.iter().copied());
        }
    }

    Ok(collected)
}

/// Parents an edited category may choose from: the top-level categories
/// minus the category's own subtree. The current parent is force-included
/// even when the exclusion rule would drop it, so the edit form never
/// silently loses the stored value.
pub async fn parent_options<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
) -> Result<Vec<category::Model>, ServiceError> {
    let current = CategoryEntity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No category with {} id was found", category_id))
        })?;

    let excluded = descendant_ids(conn, category_id).await?;

    let mut options: Vec<category::Model> = CategoryEntity::find()
        .filter(category::Column::ParentId.is_null())
        .order_by_asc(category::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .filter(|cat| !excluded.contains(&cat.id))
        .collect();

    if let Some(parent_id) = current.parent_id {
        if !options.iter().any(|cat| cat.id == parent_id) {
            if let Some(parent) = CategoryEntity::find_by_id(parent_id).one(conn).await? {
                options.insert(0, parent);
            }
        }
    }

    Ok(options)
}

/// Normalizes a submitted parent selection: the `0` sentinel, a missing
/// value and a ghost id all mean "no parent".
pub async fn normalize_parent<C: ConnectionTrait>(
    conn: &C,
    submitted: Option<i32>,
) -> Result<Option<i32>, ServiceError> {
    let candidate = match submitted {
        None => return Ok(None),
        Some(id) if id == NO_PARENT => return Ok(None),
        Some(id) => id,
    };

    match CategoryEntity::find_by_id(candidate).one(conn).await? {
        Some(_) => Ok(Some(candidate)),
        None => Ok(None),
    }
}

/// Re-parents a category, rejecting any choice that would close a cycle.
pub async fn set_parent<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
    submitted: Option<i32>,
) -> Result<(), ServiceError> {
    let current = CategoryEntity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No category with {} id was found", category_id))
        })?;

    let parent_id = normalize_parent(conn, submitted).await?;

    if let Some(parent_id) = parent_id {
        let excluded = descendant_ids(conn, category_id).await?;
        if excluded.contains(&parent_id) {
            return Err(ServiceError::Validation(
                "A category cannot become a child of itself or of its own subtree".to_string(),
            ));
        }
    }

    let mut active: category::ActiveModel = current.into();
    active.parent_id = Set(parent_id);
    active.update(conn).await?;

    Ok(())
}

/// Deletes a category once nothing references it. Products or child
/// categories still attached make this a user-visible error, not a cascade.
pub async fn delete_category<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
) -> Result<(), ServiceError> {
    let current = CategoryEntity::find_by_id(category_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("No category with {} id was found", category_id))
        })?;

    let product_count = product::Entity::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .count(conn)
        .await?;
    if product_count > 0 {
        return Err(ServiceError::Validation(
            "Cannot delete a category that still has products".to_string(),
        ));
    }

    let child_count = CategoryEntity::find()
        .filter(category::Column::ParentId.eq(category_id))
        .count(conn)
        .await?;
    if child_count > 0 {
        return Err(ServiceError::Validation(
            "Cannot delete a category that still has subcategories".to_string(),
        ));
    }

    current.delete(conn).await?;
    Ok(())
}

/// Full path of a product's category, used in notification messages.
pub async fn category_path<C: ConnectionTrait>(
    conn: &C,
    category_id: Option<i32>,
) -> Result<Option<String>, ServiceError> {
    let category_id = match category_id {
        Some(id) => id,
        None => return Ok(None),
    };

    let cat = match CategoryEntity::find_by_id(category_id).one(conn).await? {
        Some(cat) => cat,
        None => return Ok(None),
    };

    let parent_name = match cat.parent_id {
        Some(parent_id) => CategoryEntity::find_by_id(parent_id)
            .one(conn)
            .await?
            .map(|parent| parent.name),
        None => None,
    };

    Ok(Some(full_path(parent_name.as_deref(), &cat.name)))
}
