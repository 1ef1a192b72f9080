use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::public::order::OrderResponse;
use crate::api::AppState;
use crate::entities::order::OrderStatus;
use crate::error::AppError;
use crate::repository::Page;
use crate::response::ok;

const DEFAULT_PAGE_SIZE: u64 = 20;

//ROUTERS
pub fn admin_order_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id", get(get_order))
        .route("/admin/orders/:id/confirm", patch(confirm_order))
        .route("/admin/orders/:id/cancel", patch(cancel_order))
        .route("/admin/orders/:id/deliver", patch(deliver_order))
        .route("/admin/orders/:id/sheets/retry", post(retry_sheets_sync))
        .layer(Extension(state))
}

//ROUTES
async fn list_orders(
    Extension(state): Extension<AppState>,
    ApiQuery(params): ApiQuery<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = Page::new(params.page, params.page_size, DEFAULT_PAGE_SIZE);
    let (orders, total) = state
        .orders()
        .list_orders(page, params.status.as_deref(), params.phone_number)
        .await?;

    let data = OrderListResponse {
        items: orders.into_iter().map(OrderResponse::new).collect(),
        total,
        page: page.page,
        page_size: page.page_size,
    };
    Ok(ok(data, "Orders fetched"))
}

async fn get_order(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().get_order(id).await?;
    Ok(ok(OrderResponse::new(order), "Order fetched"))
}

async fn confirm_order(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().set_status(id, OrderStatus::Confirmed).await?;
    Ok(ok(OrderResponse::new(order), "Order confirmed"))
}

async fn cancel_order(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().set_status(id, OrderStatus::Canceled).await?;
    Ok(ok(OrderResponse::new(order), "Order canceled"))
}

async fn deliver_order(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().set_status(id, OrderStatus::Delivered).await?;
    Ok(ok(OrderResponse::new(order), "Order delivered"))
}

async fn retry_sheets_sync(
    Extension(state): Extension<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders().retry_sheets_sync(id).await?;
    Ok(ok(OrderResponse::new(order), "Sheets sync retried"))
}

//Structs
#[derive(Deserialize, Debug)]
struct OrderListQuery {
    page: Option<i64>,
    page_size: Option<i64>,
    status: Option<String>,
    phone_number: Option<String>,
}

#[derive(Serialize, Debug)]
struct OrderListResponse {
    items: Vec<OrderResponse>,
    total: u64,
    page: u64,
    page_size: u64,
}
