use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::api::{internal_error, service_error};
use crate::entities::product::{self, Entity as ProductEntity};
use crate::services::image_order;

const PAGE_SIZE: u64 = 25;

pub fn catalog_router(db: Arc<DatabaseConnection>) -> Router {
    Router::new()
        .route("/product", get(get_products))
        .route("/product/:id", get(get_product))
        .layer(Extension(db))
}

async fn get_products(
    Query(params): Query<GetProductsQuery>,
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

    if let Some(category_id) = params.category {
        half_result = half_result.filter(product::Column::CategoryId.eq(category_id));
    }

    // Inactive products stay listed but always sort after active ones.
    half_result = half_result.order_by_desc(product::Column::IsActive);
    half_result = match params.sort.as_deref() {
        Some("name_asc") => half_result.order_by_asc(product::Column::Name),
        Some("name_desc") => half_result.order_by_desc(product::Column::Name),
        _ => half_result.order_by_desc(product::Column::CreatedAt),
    };

    let page = params.page.unwrap_or(1).max(1);
    let paginator = half_result.paginate(&*db, PAGE_SIZE);

    let total_pages = match paginator.num_pages().await {
        Ok(total_pages) => total_pages,
        Err(_) => return internal_error(),
    };

    match paginator.fetch_page(page - 1).await {
        Ok(products) => {
            let response: Vec<PublicProductResponse> = products
                .into_iter()
                .map(PublicProductResponse::new)
                .collect();
            (
                StatusCode::OK,
                Json(json!({
                    "products": response,
                    "page": page,
                    "total_pages": total_pages,
                })),
            )
                .into_response()
        }
        Err(_) => internal_error(),
    }
}

async fn get_product(
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

    let gallery: Vec<_> = images
        .into_iter()
        .map(|img| {
            json!({
                "id": img.id,
                "image_url": img.image_url,
                "is_primary": img.is_primary,
                "display_order": img.display_order,
            })
        })
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "id": product.id,
            "name": product.name,
            "description": product.description,
            "image_url": product.image_url,
            "category_id": product.category_id,
            "is_active": product.is_active,
            "images": gallery,
        })),
    )
        .into_response()
}

//Structs
#[derive(Deserialize)]
struct GetProductsQuery {
    page: Option<u64>,
    category: Option<i32>,
    search: Option<String>,
    sort: Option<String>,
}

#[derive(Serialize)]
struct PublicProductResponse {
    id: i32,
    name: String,
    description: String,
    image_url: Option<String>,
    category_id: Option<i32>,
    is_active: bool,
}

impl PublicProductResponse {
    fn new(value: product::Model) -> PublicProductResponse {
        PublicProductResponse {
            id: value.id,
            name: value.name,
            description: value.description,
            image_url: value.image_url,
            category_id: value.category_id,
            is_active: value.is_active,
        }
    }
}
