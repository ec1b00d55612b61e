use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::api::{commit_failed, internal_error, service_error};
use crate::config;
use crate::entities::{
    product::{self, Entity as ProductEntity},
    product_image::{self, Entity as ImageEntity},
};
use crate::services::{category_tree, image_order, uploads};

const PAGE_SIZE: u64 = 20;

//ROUTERS
pub fn admin_product_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/product", get(list_products).post(create_product))
        .route(
            "/product/:id",
            get(admin_get_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .route("/product/:id/toggle", post(toggle_product))
        .route("/product/:id/images", post(add_product_images))
        .route("/image/:id", delete(delete_product_image))
        .route("/product/bulk/activate", post(bulk_activate))
        .route("/product/bulk/deactivate", post(bulk_deactivate))
        .route("/product/bulk/delete", post(bulk_delete))
        .route("/product/bulk/change-category", post(bulk_change_category))
        .layer(DefaultBodyLimit::max(config::max_upload_bytes()))
        .layer(Extension(db))
}

//ROUTES
async fn list_products(
    Query(params): Query<ListProductsQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let mut half_result = ProductEntity::find();

    if let Some(search) = params.search.filter(|s| !s.is_empty()) {
        half_result = half_result.filter(
            Condition::any()
                .add(product::Column::Name.contains(&search))
                .add(product::Column::Description.contains(&search)),
        );
    }

    let page = params.page.unwrap_or(1).max(1);
    let paginator = half_result
        .order_by_desc(product::Column::CreatedAt)
        .paginate(&*db, PAGE_SIZE);

    let total_pages = match paginator.num_pages().await {
        Ok(total_pages) => total_pages,
        Err(_) => return internal_error(),
    };

    match paginator.fetch_page(page - 1).await {
        Ok(products) => (
            StatusCode::OK,
            Json(json!({
                "products": products,
                "page": page,
                "total_pages": total_pages,
            })),
        )
            .into_response(),
        Err(_) => internal_error(),
    }
}

async fn admin_get_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let product = match ProductEntity::find_by_id(id).one(&*db).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No product with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    let images = match image_order::list_images(&*db, product.id).await {
        Ok(images) => images,
        Err(err) => return service_error(err),
    };

    (
        StatusCode::OK,
        Json(json!({
            "product": product,
            "images": images,
        })),
    )
        .into_response()
}

/// Multipart create: text fields plus any number of `image_files` parts.
/// Files are stored first, in submission order; the first stored image of a
/// brand-new gallery becomes the primary one.
async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let form = match read_product_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let name = match form.name.filter(|n| !n.is_empty()) {
        Some(name) => name,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Product name is required"
                })),
            )
                .into_response();
        }
    };

    let stored_urls = store_files(&form.files).await;

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let category_id = match category_tree::normalize_parent(&txn, form.category_id).await {
        Ok(category_id) => category_id,
        Err(err) => {
            let _ = txn.rollback().await;
            return service_error(err);
        }
    };

    let new_product = product::ActiveModel {
        name: Set(name),
        description: Set(form.description),
        image_url: Set(None),
        category_id: Set(category_id),
        is_active: Set(form.is_active),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = match new_product.insert(&txn).await {
        Ok(created) => created,
        Err(_) => {
            let _ = txn.rollback().await;
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Failed to create product"
                })),
            )
                .into_response();
        }
    };

    if let Err(err) = image_order::append_images(&txn, created.id, &stored_urls).await {
        let _ = txn.rollback().await;
        return service_error(err);
    }

    match txn.commit().await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Product created successfully",
                "product_id": created.id
            })),
        )
            .into_response(),
        Err(_) => commit_failed(),
    }
}

async fn patch_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<PatchProductPayload>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let existing = match ProductEntity::find_by_id(id).one(&txn).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No product with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    let mut active: product::ActiveModel = existing.into();

    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(category_id) = payload.category_id {
        // 0 is the "no category" sentinel; ghost ids normalize to None too.
        match category_tree::normalize_parent(&txn, Some(category_id)).await {
            Ok(category_id) => active.category_id = Set(category_id),
            Err(err) => {
                let _ = txn.rollback().await;
                return service_error(err);
            }
        }
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }

    match active.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Resource patched successfully"
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
                    "error": "Failed to patch this resource"
                })),
            )
                .into_response()
        }
    }
}

async fn toggle_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let existing = match ProductEntity::find_by_id(id).one(&txn).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No product with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    let flipped = !existing.is_active;
    let mut active: product::ActiveModel = existing.into();
    active.is_active = Set(flipped);

    match active.update(&txn).await {
        Ok(_) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Product status updated",
                    "is_active": flipped
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            internal_error()
        }
    }
}

/// Appends uploaded files to an existing gallery; nothing here ever steals
/// the primary flag from an image that already has it.
async fn add_product_images(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let form = match read_product_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    if form.files.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "No files submitted"
            })),
        )
            .into_response();
    }

    let stored_urls = store_files(&form.files).await;

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    match image_order::append_images(&txn, id, &stored_urls).await {
        Ok(()) => match txn.commit().await {
            Ok(_) => (
                StatusCode::CREATED,
                Json(json!({
                    "message": format!("Added {} image(s)", stored_urls.len())
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

/// Deletes one gallery image, keeping the order dense and the primary flag
/// consistent. The file on disk goes away only after the row is committed
/// out of the database.
async fn delete_product_image(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let deleted_url = match image_order::delete_image(&txn, id).await {
        Ok(deleted_url) => deleted_url,
        Err(err) => {
            let _ = txn.rollback().await;
            return service_error(err);
        }
    };

    if txn.commit().await.is_err() {
        return commit_failed();
    }

    uploads::delete_upload(&deleted_url).await;

    (
        StatusCode::OK,
        Json(json!({
            "message": "Image deleted successfully"
        })),
    )
        .into_response()
}

async fn delete_product(
    Path(id): Path<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> impl IntoResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let existing = match ProductEntity::find_by_id(id).one(&txn).await {
        Ok(Some(existing)) => existing,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": format!("No product with {} id was found", id)
                })),
            )
                .into_response();
        }
        Err(_) => return internal_error(),
    };

    if let Err(response) = remove_product_with_files(&txn, existing).await {
        let _ = txn.rollback().await;
        return response;
    }

    match txn.commit().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "message": "Resource deleted successfully"
            })),
        )
            .into_response(),
        Err(_) => commit_failed(),
    }
}

async fn bulk_activate(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<BulkPayload>,
) -> impl IntoResponse {
    set_active_bulk(db, payload, true).await
}

async fn bulk_deactivate(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<BulkPayload>,
) -> impl IntoResponse {
    set_active_bulk(db, payload, false).await
}

async fn set_active_bulk(
    db: Arc<DatabaseConnection>,
    payload: BulkPayload,
    is_active: bool,
) -> axum::response::Response {
    let ids = match parse_ids(&payload.product_ids) {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let result = ProductEntity::update_many()
        .col_expr(product::Column::IsActive, Expr::value(is_active))
        .filter(product::Column::Id.is_in(ids))
        .exec(&txn)
        .await;

    match result {
        Ok(updated) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": format!("Updated {} product(s)", updated.rows_affected)
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            internal_error()
        }
    }
}

/// Bulk delete mirrors the single delete per product: files are unlinked
/// first (missing ones are skipped), then the rows go.
async fn bulk_delete(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<BulkPayload>,
) -> impl IntoResponse {
    let ids = match parse_ids(&payload.product_ids) {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let products = match ProductEntity::find()
        .filter(product::Column::Id.is_in(ids))
        .all(&txn)
        .await
    {
        Ok(products) => products,
        Err(_) => return internal_error(),
    };

    let mut deleted = 0;
    for existing in products {
        if let Err(response) = remove_product_with_files(&txn, existing).await {
            let _ = txn.rollback().await;
            return response;
        }
        deleted += 1;
    }

    match txn.commit().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("Deleted {} product(s)", deleted)
            })),
        )
            .into_response(),
        Err(_) => commit_failed(),
    }
}

async fn bulk_change_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Json(payload): Json<BulkPayload>,
) -> impl IntoResponse {
    let ids = match parse_ids(&payload.product_ids) {
        Ok(ids) => ids,
        Err(response) => return response,
    };

    let category_id = match payload.category_id {
        Some(category_id) => category_id,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "No category selected"
                })),
            )
                .into_response();
        }
    };

    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(_) => return internal_error(),
    };

    let category_id = match category_tree::normalize_parent(&txn, Some(category_id)).await {
        Ok(category_id) => category_id,
        Err(err) => {
            let _ = txn.rollback().await;
            return service_error(err);
        }
    };

    let result = ProductEntity::update_many()
        .col_expr(product::Column::CategoryId, Expr::value(category_id))
        .filter(product::Column::Id.is_in(ids))
        .exec(&txn)
        .await;

    match result {
        Ok(updated) => match txn.commit().await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({
                    "message": format!("Changed category for {} product(s)", updated.rows_affected)
                })),
            )
                .into_response(),
            Err(_) => commit_failed(),
        },
        Err(_) => {
            let _ = txn.rollback().await;
            internal_error()
        }
    }
}

//Helpers

/// Unlinks every file the product references, then removes its image rows
/// and the product itself. Missing files never stop the deletion.
async fn remove_product_with_files(
    txn: &sea_orm::DatabaseTransaction,
    existing: product::Model,
) -> Result<(), axum::response::Response> {
    if let Some(url) = &existing.image_url {
        uploads::delete_upload(url).await;
    }

    let images = ImageEntity::find()
        .filter(product_image::Column::ProductId.eq(existing.id))
        .all(txn)
        .await
        .map_err(|_| internal_error())?;
    for img in &images {
        uploads::delete_upload(&img.image_url).await;
    }

    ImageEntity::delete_many()
        .filter(product_image::Column::ProductId.eq(existing.id))
        .exec(txn)
        .await
        .map_err(|_| internal_error())?;

    let active: product::ActiveModel = existing.into();
    active.delete(txn).await.map_err(|_| internal_error())?;

    Ok(())
}

/// Comma-separated ids as submitted by the admin UI; anything that does not
/// parse as an integer is silently dropped.
fn parse_ids(raw: &str) -> Result<Vec<i32>, axum::response::Response> {
    let ids: Vec<i32> = raw
        .split(',')
        .filter_map(|part| part.trim().parse::<i32>().ok())
        .collect();

    if ids.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "No products selected"
            })),
        )
            .into_response());
    }

    Ok(ids)
}

struct ProductForm {
    name: Option<String>,
    description: String,
    category_id: Option<i32>,
    is_active: bool,
    files: Vec<(String, Vec<u8>)>,
}

/// Pulls the known fields out of a multipart form. Unknown parts are
/// ignored; oversized files abort the whole request.
async fn read_product_form(
    mut multipart: Multipart,
) -> Result<ProductForm, axum::response::Response> {
    let mut form = ProductForm {
        name: None,
        description: String::new(),
        category_id: None,
        is_active: true,
        files: Vec::new(),
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // A parse error must not degrade into a partial form.
            Err(_) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "Malformed multipart body"
                    })),
                )
                    .into_response());
            }
        };
        let field_name = field.name().map(|n| n.to_owned());
        match field_name.as_deref() {
            Some("name") => form.name = field.text().await.ok(),
            Some("description") => form.description = field.text().await.unwrap_or_default(),
            Some("category_id") => {
                form.category_id = field.text().await.ok().and_then(|v| v.parse().ok());
            }
            Some("is_active") => {
                form.is_active = field
                    .text()
                    .await
                    .map(|v| matches!(v.as_str(), "true" | "1" | "on"))
                    .unwrap_or(true);
            }
            Some("image_files") => {
                let file_name = match field.file_name() {
                    Some(file_name) if !file_name.is_empty() => file_name.to_owned(),
                    _ => continue,
                };
                let data = match field.bytes().await {
                    Ok(data) => data,
                    Err(_) => {
                        return Err((
                            StatusCode::BAD_REQUEST,
                            Json(json!({
                                "error": "Failed to read file bytes"
                            })),
                        )
                            .into_response());
                    }
                };
                if data.len() > config::max_upload_bytes() {
                    return Err((
                        StatusCode::PAYLOAD_TOO_LARGE,
                        Json(json!({
                            "error": "Payload too large"
                        })),
                    )
                        .into_response());
                }
                form.files.push((file_name, data.to_vec()));
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Stores each file in submission order; a file that fails to store is
/// skipped, the rest keep their relative order.
async fn store_files(files: &[(String, Vec<u8>)]) -> Vec<String> {
    let mut stored_urls = Vec::new();
    for (file_name, data) in files {
        match uploads::save_upload(file_name, data).await {
            Ok(url) => stored_urls.push(url),
            Err(err) => {
                tracing::warn!(file = %file_name, error = %err, "Skipping upload");
            }
        }
    }
    stored_urls
}

//Structs
#[derive(Deserialize)]
struct ListProductsQuery {
    page: Option<u64>,
    search: Option<String>,
}

#[derive(Deserialize)]
struct PatchProductPayload {
    name: Option<String>,
    description: Option<String>,
    category_id: Option<i32>,
    is_active: Option<bool>,
}

#[derive(Deserialize, Clone, Debug)]
struct BulkPayload {
    product_ids: String,
    category_id: Option<i32>,
}
