use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::{commit_failed, internal_error, service_error};
use crate::entities::category::{self, Entity as CategoryEntity};
use crate::services::category_tree;

pub fn admin_category_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/category", get(list_categories).post(create_category))
        .route(
            "/category/:id",
            get(get_category).patch(patch_category).delete(delete_category),
        )
        .route("/category/:id/parent-options", get(parent_options))
        .layer(Extension(db))
}

/// Flat list for the admin table, parents first so the UI can indent.
async fn list_categories(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    match CategoryEntity::find()
        .order_by_asc(category::Column::ParentId)
        .order_by_asc(category::Column::Name)
        .all(&*db)
        .await
    {
        Ok(categories) => (
            StatusCode::OK,
            Json(json!({
                "categories": categories
            })),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}

async fn get_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    match CategoryEntity::find_by_id(id).one(&*db).await {
        Ok(Some(found)) => (StatusCode::OK, Json(found)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": format!("No category with {} id was found", id)
            })),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}

async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<CreateCategory>,
) -> impl IntoResponse {
    if let Err(err) = payload.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("Validation failed: {err}")
            })),
        )
            .into_response();
    }

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let clash = CategoryEntity::find()
        .filter(category::Column::Name.eq(payload.name.clone()))
        .one(&txn)
        .await;
    match clash {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "A category with this name already exists"
                })),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(_) => return internal_error(),
    }

    let parent_id = match category_tree::normalize_parent(&txn, payload.parent_id).await {
        Ok(parent_id) => parent_id,
        Err(err) => {
            let _ = txn.rollback().await;
            return service_error(err);
        }
    };

    let new_category = category::ActiveModel {
        name: Set(payload.name),
        parent_id: Set(parent_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    match new_category.insert(&txn).await {
        Ok(created) => match txn.commit().await {
            Ok(_) => (
                StatusCode::CREATED,
                Json(json!({
                    "message": "Category created successfully",
                    "category_id": created.id
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Failed to create category"
                })),
            )
                .into_response()
        }
    }
}

/// Renames and/or re-parents a category. A submitted `parent_id` goes through
/// the subtree exclusion check; `0` clears the parent; an absent field leaves
/// the parent untouched.
async fn patch_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchCategory>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let existing = match CategoryEntity::find_by_id(id).one(&txn).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No category with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    if let Some(name) = payload.name {
        if name.is_empty() {
            let _ = txn.rollback().await;
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Category name cannot be empty"
                })),
            )
                .into_response();
        }

        let clash = CategoryEntity::find()
            .filter(category::Column::Name.eq(name.clone()))
            .filter(category::Column::Id.ne(id))
            .one(&txn)
            .await;
        match clash {
            Ok(Some(_)) => {
                return (
                    StatusCode::CONFLICT,
                    Json(json!({
                        "error": "A category with this name already exists"
                    })),
                )
                    .into_response();
            }
            Ok(None) => {}
            Err(_) => return internal_error(),
        }

        let mut active: category::ActiveModel = existing.into();
        active.name = Set(name);
        if active.update(&txn).await.is_err() {
            let _ = txn.rollback().await;
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Failed to patch this resource"
                })),
            )
                .into_response();
        }
    }

    if let Some(parent_id) = payload.parent_id {
        if let Err(err) = category_tree::set_parent(&txn, id, Some(parent_id)).await {
            let _ = txn.rollback().await;
            return service_error(err);
        }
    }

    match txn.commit().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "message": "Resource patched successfully"
            })),
        )
            .into_response(),
        Err(_) => commit_failed(),
    }
}

async fn delete_category(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match category_tree::delete_category(&txn, id).await {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource deleted successfully"
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(err) => {
            let _ = txn.rollback().await;
            service_error(err)
        }
    }
}

/// Valid parent choices for the edit form: top-level categories minus the
/// category's own subtree, with the stored parent force-included.
async fn parent_options(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    match category_tree::parent_options(&*db, id).await {
        Ok(options) => (
            StatusCode::OK,
            Json(json!({
                "parent_options": options
            })),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

//Structs
#[derive(Deserialize, Validate, Clone, Debug)]
struct CreateCategory {
    #[validate(length(min = 1, max = 100))]
    name: String,
    parent_id: Option<i32>,
}

#[derive(Deserialize)]
struct PatchCategory {
    name: Option<String>,
    parent_id: Option<i32>,
}
