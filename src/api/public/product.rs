use axum::{extract::Extension, response::IntoResponse, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::AppState;
use crate::error::AppError;
use crate::repository::{products::ProductFilter, Page};
use crate::response::ok;
use crate::services::products::ProductDetails;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

//ROUTERS
pub fn product_router(state: AppState) -> Router {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
        .layer(Extension(state))
}

//ROUTES
async fn list_products(
    Extension(state): Extension<AppState>,
    ApiQuery(params): ApiQuery<ProductListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(params.page, params.page_size, DEFAULT_PAGE_SIZE);
    let (products, total) = state
        .products()
        .list_public(&params.filter(), page)
        .await?;

    Ok(ok(ProductListResponse::new(products, page, total), "Products fetched"))
}

async fn get_product(
    Extension(state): Extension<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.products().get_public_by_slug(&slug).await?;
    Ok(ok(ProductResponse::new(product), "Product fetched"))
}

//Structs
#[derive(Deserialize, Debug, Default)]
pub struct ProductListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
}

impl ProductListQuery {
    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: self.category.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            search: self.search.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ProductImageResponse {
    pub url: String,
    pub position: i32,
}

#[derive(Serialize, Debug)]
pub struct ProductResponse {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: String,
    pub quantity: i32,
    pub thumbnail_url: Option<String>,
    pub is_active: bool,
    pub images: Vec<ProductImageResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductResponse {
    pub fn new(value: ProductDetails) -> ProductResponse {
        let product = value.product;
        ProductResponse {
            id: product.id,
            slug: product.slug,
            name: product.name,
            description: product.description,
            price: product.price,
            category: product.category,
            quantity: product.quantity,
            thumbnail_url: product.thumbnail_url,
            is_active: product.is_active,
            images: value
                .images
                .into_iter()
                .map(|image| ProductImageResponse {
                    url: image.url,
                    position: image.position,
                })
                .collect(),
            created_at: product.created_at,
            updated_at: product.updated_at,
            deleted_at: product.deleted_at,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

#[derive(Serialize, Debug)]
pub struct ProductListResponse {
    pub items: Vec<ProductResponse>,
    pub meta: PageMeta,
}

impl ProductListResponse {
    pub fn new(products: Vec<ProductDetails>, page: Page, total: u64) -> ProductListResponse {
        ProductListResponse {
            items: products.into_iter().map(ProductResponse::new).collect(),
            meta: PageMeta {
                page: page.page,
                page_size: page.page_size,
                total,
            },
        }
    }
}
