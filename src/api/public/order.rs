use axum::{extract::Extension, response::IntoResponse, routing::post, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extract::ApiJson;
use crate::api::AppState;
use crate::entities::order::{DeliveryMode, OrderStatus, SheetsStatus};
use crate::error::AppError;
use crate::middleware::logging::RequestId;
use crate::response::ok;
use crate::services::orders::{CreateOrderInput, OrderDetails, OrderItemInput};

//ROUTERS
pub fn order_router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(create_order))
        .layer(Extension(state))
}

//ROUTES
async fn create_order(
    Extension(state): Extension<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    ApiJson(payload): ApiJson<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let orders = state.orders();
    let created = orders.create_order(payload.into_input()).await?;
    let order_id = created.order.id;

    // The order is committed at this point; a sheets failure only gets logged.
    match orders.sync_to_sheets(order_id).await {
        Ok(()) => tracing::info!(order_id, request_id = %request_id, "Sheets sync attempted"),
        Err(err) => tracing::warn!(
            order_id,
            request_id = %request_id,
            error = %err,
            "Sheets sync failed"
        ),
    }

    let order = orders.get_order(order_id).await?;
    Ok(ok(OrderResponse::new(order), "Order created"))
}

//Structs
#[derive(Deserialize, Validate, Debug)]
pub struct CreateOrderPayload {
    #[validate(length(max = 100))]
    pub first_name: String,
    #[validate(length(max = 100))]
    pub last_name: String,
    #[validate(length(max = 30))]
    pub phone_number: String,
    #[validate(length(max = 80))]
    pub wilaya: String,
    #[validate(length(max = 120))]
    pub baladiya: String,
    #[validate(length(max = 20))]
    pub delivery_mode: String,
    pub address_line: Option<String>,
    pub delivery_fee: i64,
    pub items: Vec<OrderItemPayload>,
}

#[derive(Deserialize, Debug)]
pub struct OrderItemPayload {
    pub product_id: i32,
    pub quantity: i32,
}

impl CreateOrderPayload {
    fn into_input(self) -> CreateOrderInput {
        CreateOrderInput {
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            wilaya: self.wilaya,
            baladiya: self.baladiya,
            delivery_mode: self.delivery_mode,
            address_line: self.address_line,
            delivery_fee: self.delivery_fee,
            items: self
                .items
                .into_iter()
                .map(|item| OrderItemInput {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct OrderItemResponse {
    pub product_id: i32,
    pub product_slug: String,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Serialize, Debug)]
pub struct OrderResponse {
    pub id: i32,
    pub status: OrderStatus,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub wilaya: String,
    pub baladiya: String,
    pub delivery_mode: DeliveryMode,
    pub address_line: Option<String>,
    pub items_subtotal: i64,
    pub delivery_fee: i64,
    pub total_amount: i64,
    pub sheets_status: SheetsStatus,
    pub sheets_synced_at: Option<DateTime<Utc>>,
    pub sheets_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn new(value: OrderDetails) -> OrderResponse {
        let order = value.order;
        OrderResponse {
            id: order.id,
            status: order.status,
            first_name: order.first_name,
            last_name: order.last_name,
            phone_number: order.phone_number,
            wilaya: order.wilaya,
            baladiya: order.baladiya,
            delivery_mode: order.delivery_mode,
            address_line: order.address_line,
            items_subtotal: order.items_subtotal,
            delivery_fee: order.delivery_fee,
            total_amount: order.total_amount,
            sheets_status: order.sheets_status,
            sheets_synced_at: order.sheets_synced_at,
            sheets_error: order.sheets_error,
            created_at: order.created_at,
            items: value
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id,
                    product_slug: item.product_slug,
                    product_name: item.product_name,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total: item.line_total,
                })
                .collect(),
        }
    }
}
