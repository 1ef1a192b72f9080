use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, patch},
    Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use validator::Validate;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::public::product::{ProductListResponse, ProductResponse, DEFAULT_PAGE_SIZE};
use crate::api::AppState;
use crate::error::AppError;
use crate::repository::{
    products::{AdminProductFilter, ProductFilter},
    Page,
};
use crate::response::ok;
use crate::services::products::ProductInput;

//ROUTERS
pub fn admin_product_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/products", get(list_products).post(create_product))
        .route(
            "/admin/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/admin/products/:id/activate", patch(activate_product))
        .route("/admin/products/:id/deactivate", patch(deactivate_product))
        .layer(Extension(state))
}

//ROUTES
async fn list_products(
    Extension(state): Extension<AppState>,
    ApiQuery(params): ApiQuery<AdminProductListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(params.page, params.page_size, DEFAULT_PAGE_SIZE);
    let (products, total) = state
        .products()
        .list_admin(&params.filter(), page)
        .await?;

    Ok(ok(
        ProductListResponse::new(products, page, total),
        "Admin products fetched",
    ))
}

async fn get_product(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.products().get_by_id(id).await?;
    Ok(ok(ProductResponse::new(product), "Admin product fetched"))
}

async fn create_product(
    Extension(state): Extension<AppState>,
    ApiJson(payload): ApiJson<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = state.products().create(payload.into_input()).await?;
    Ok(ok(ProductResponse::new(product), "Product created"))
}

async fn update_product(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ProductPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let product = state.products().update(id, payload.into_input()).await?;
    Ok(ok(ProductResponse::new(product), "Product updated"))
}

async fn activate_product(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.products().activate(id).await?;
    Ok(ok(ProductResponse::new(product), "Product activated"))
}

async fn deactivate_product(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.products().deactivate(id).await?;
    Ok(ok(ProductResponse::new(product), "Product deactivated"))
}

async fn delete_product(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.products().soft_delete(id).await?;
    Ok(ok(ProductResponse::new(product), "Product deleted"))
}

//Structs
#[derive(Deserialize, Debug)]
struct AdminProductListQuery {
    page: Option<i64>,
    page_size: Option<i64>,
    category: Option<String>,
    min_price: Option<i64>,
    max_price: Option<i64>,
    search: Option<String>,
    is_active: Option<bool>,
    include_deleted: Option<bool>,
}

impl AdminProductListQuery {
    fn filter(&self) -> AdminProductFilter {
        AdminProductFilter {
            base: ProductFilter {
                category: self.category.clone(),
                min_price: self.min_price,
                max_price: self.max_price,
                search: self.search.clone(),
            },
            is_active: self.is_active,
            include_deleted: self.include_deleted.unwrap_or(false),
        }
    }
}

#[derive(Deserialize, Validate, Debug)]
struct ProductPayload {
    #[validate(length(max = 150), regex(path = *SLUG_REGEX))]
    slug: String,
    #[validate(length(max = 200))]
    name: String,
    description: Option<String>,
    #[validate(range(min = 0))]
    price: i64,
    #[validate(length(max = 80))]
    category: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    quantity: i32,
    thumbnail_url: String,
    #[serde(default = "default_true")]
    is_active: bool,
    #[serde(default)]
    images: Vec<String>,
}

impl ProductPayload {
    fn into_input(self) -> ProductInput {
        ProductInput {
            slug: self.slug,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            quantity: self.quantity,
            thumbnail_url: self.thumbnail_url,
            is_active: self.is_active,
            images: self.images,
        }
    }
}

fn default_true() -> bool {
    true
}

// Lowercase words joined by dashes. Blank passes here and is reported by the
// service as a missing slug.
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([a-z0-9]+(-[a-z0-9]+)*)?\s*$").unwrap());
