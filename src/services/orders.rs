use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::entities::order::{self, DeliveryMode, OrderStatus};
use crate::entities::{order_item, product};
use crate::error::AppError;
use crate::integrations::google_sheets::SheetsClient;
use crate::repository::{
    orders::{self as repo, NewOrder, NewOrderItem, OrderFilter},
    products as product_repo, Page,
};
use crate::services::sheets_sync::{sync_order_to_sheets, SheetsSyncError};

#[derive(Clone, Debug)]
pub struct OrderItemInput {
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Clone, Debug)]
pub struct CreateOrderInput {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub wilaya: String,
    pub baladiya: String,
    pub delivery_mode: String,
    pub address_line: Option<String>,
    pub delivery_fee: i64,
    pub items: Vec<OrderItemInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub product_id: i32,
    pub requested: i32,
    pub available: i32,
}

#[derive(Clone, Debug)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    sheets: Arc<dyn SheetsClient>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, sheets: Arc<dyn SheetsClient>) -> OrderService {
        OrderService { db, sheets }
    }

    /// Places an order: validates, reserves stock and writes the order in one
    /// transaction. The sheets push is a separate step, see `sync_to_sheets`.
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderDetails, AppError> {
        let delivery_mode = validate(&input)?;
        let requested = merge_items(&input.items)?;
        let ids: Vec<i32> = requested.iter().map(|(id, _)| *id).collect();

        let products: HashMap<i32, product::Model> =
            product_repo::find_active_by_ids(&*self.db, &ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

        let missing: Vec<i32> = ids
            .iter()
            .copied()
            .filter(|id| !products.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::ProductUnavailable {
                missing_product_ids: missing,
            });
        }

        let mut lines = Vec::with_capacity(requested.len());
        let mut shortfalls = Vec::new();
        for &(product_id, quantity) in &requested {
            let Some(product) = products.get(&product_id) else {
                continue;
            };
            if product.quantity < quantity {
                shortfalls.push(StockShortfall {
                    product_id,
                    requested: quantity,
                    available: product.quantity,
                });
                continue;
            }
            lines.push(snapshot(product, quantity)?);
        }
        if !shortfalls.is_empty() {
            return Err(AppError::InsufficientStock { items: shortfalls });
        }

        let items_subtotal = lines
            .iter()
            .try_fold(0i64, |acc, line| acc.checked_add(line.line_total))
            .ok_or_else(|| AppError::invalid_payload("items", "order total is too large"))?;
        let total_amount = items_subtotal
            .checked_add(input.delivery_fee)
            .ok_or_else(|| AppError::invalid_payload("delivery_fee", input.delivery_fee))?;

        let new_order = NewOrder {
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            phone_number: input.phone_number.trim().to_string(),
            wilaya: input.wilaya.trim().to_string(),
            baladiya: input.baladiya.trim().to_string(),
            delivery_mode,
            address_line: input
                .address_line
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            items_subtotal,
            delivery_fee: input.delivery_fee,
            total_amount,
        };

        let txn = self.db.begin().await?;
        let order = match place_order(&txn, &requested, new_order, lines).await {
            Ok(order) => {
                txn.commit().await?;
                order
            }
            Err(err) => {
                let _ = txn.rollback().await;
                return Err(err);
            }
        };

        tracing::info!(
            order_id = order.id,
            total_amount = order.total_amount,
            "Order created"
        );
        self.get_order(order.id).await
    }

    /// Moves an order along the status table. Asking for the current status
    /// is a no-op. Entering CANCELED hands the stock back exactly once.
    pub async fn set_status(
        &self,
        order_id: i32,
        next: OrderStatus,
    ) -> Result<OrderDetails, AppError> {
        let txn = self.db.begin().await?;
        match transition(&txn, order_id, next).await {
            Ok(changed) => {
                txn.commit().await?;
                if changed {
                    tracing::info!(order_id, status = %next, "Order status changed");
                }
            }
            Err(err) => {
                let _ = txn.rollback().await;
                return Err(err);
            }
        }
        self.get_order(order_id).await
    }

    pub async fn list_orders(
        &self,
        page: Page,
        status: Option<&str>,
        phone_number: Option<String>,
    ) -> Result<(Vec<OrderDetails>, u64), AppError> {
        let status = match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.parse::<OrderStatus>()
                    .map_err(|_| AppError::invalid_payload("status", raw))?,
            ),
            None => None,
        };
        let filter = OrderFilter {
            status,
            phone_number,
        };

        let (orders, total) = repo::list(&*self.db, &filter, page).await?;
        let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let mut items = repo::items_for_many(&*self.db, &ids).await?;
        let details = orders
            .into_iter()
            .map(|order| OrderDetails {
                items: items.remove(&order.id).unwrap_or_default(),
                order,
            })
            .collect();
        Ok((details, total))
    }

    pub async fn get_order(&self, order_id: i32) -> Result<OrderDetails, AppError> {
        let order = repo::find_by_id(&*self.db, order_id)
            .await?
            .ok_or(AppError::OrderNotFound { order_id })?;
        let items = repo::items_for(&*self.db, order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// One push of the order to the spreadsheet. The outcome is already
    /// stored on the order when this returns.
    pub async fn sync_to_sheets(&self, order_id: i32) -> Result<(), SheetsSyncError> {
        sync_order_to_sheets(&*self.db, self.sheets.as_ref(), order_id).await
    }

    /// Manual re-push. Integration failures are logged, never returned.
    pub async fn retry_sheets_sync(&self, order_id: i32) -> Result<OrderDetails, AppError> {
        self.get_order(order_id).await?;
        if let Err(err) = self.sync_to_sheets(order_id).await {
            tracing::warn!(order_id, error = %err, "Sheets sync retry failed");
        }
        self.get_order(order_id).await
    }
}

async fn place_order(
    txn: &DatabaseTransaction,
    requested: &[(i32, i32)],
    new_order: NewOrder,
    lines: Vec<NewOrderItem>,
) -> Result<order::Model, AppError> {
    let mut shortfalls = Vec::new();
    for &(product_id, quantity) in requested {
        if product_repo::decrement_stock(txn, product_id, quantity).await? {
            continue;
        }
        // Someone else took the stock between the check and the update.
        let available = product_repo::find_by_id(txn, product_id)
            .await?
            .filter(product::Model::is_public)
            .map(|p| p.quantity)
            .unwrap_or(0);
        shortfalls.push(StockShortfall {
            product_id,
            requested: quantity,
            available,
        });
    }
    if !shortfalls.is_empty() {
        return Err(AppError::InsufficientStock { items: shortfalls });
    }

    Ok(repo::insert_with_items(txn, new_order, lines).await?)
}

/// Returns whether the status actually changed.
async fn transition(
    txn: &DatabaseTransaction,
    order_id: i32,
    next: OrderStatus,
) -> Result<bool, AppError> {
    let mut current = repo::find_by_id(txn, order_id)
        .await?
        .ok_or(AppError::OrderNotFound { order_id })?;

    if current.status == next {
        return Ok(false);
    }
    if !current.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: current.status,
            to: next,
        });
    }

    if next == OrderStatus::Canceled && current.stock_restored_at.is_none() {
        for item in repo::items_for(txn, order_id).await? {
            product_repo::restore_stock(txn, item.product_id, item.quantity).await?;
        }
        current = repo::mark_stock_restored(txn, current).await?;
    }

    repo::set_status(txn, current, next).await?;
    Ok(true)
}

/// First violation wins, checked in a fixed order.
fn validate(input: &CreateOrderInput) -> Result<DeliveryMode, AppError> {
    if input.items.is_empty() {
        return Err(AppError::invalid_payload(
            "items",
            "at least one item is required",
        ));
    }
    if input.delivery_fee < 0 {
        return Err(AppError::invalid_payload("delivery_fee", input.delivery_fee));
    }
    let delivery_mode = input
        .delivery_mode
        .parse::<DeliveryMode>()
        .map_err(|_| AppError::invalid_payload("delivery_mode", input.delivery_mode.as_str()))?;

    let required = [
        ("first_name", &input.first_name),
        ("last_name", &input.last_name),
        ("phone_number", &input.phone_number),
        ("wilaya", &input.wilaya),
        ("baladiya", &input.baladiya),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(AppError::invalid_payload(field, "required"));
        }
    }

    for item in &input.items {
        if item.product_id <= 0 {
            return Err(AppError::invalid_payload("product_id", item.product_id));
        }
        if item.quantity <= 0 {
            return Err(AppError::invalid_payload("quantity", item.quantity));
        }
    }
    Ok(delivery_mode)
}

/// Sums quantities per product, keeping first-seen order.
fn merge_items(items: &[OrderItemInput]) -> Result<Vec<(i32, i32)>, AppError> {
    let mut merged: Vec<(i32, i32)> = Vec::new();
    for item in items {
        match merged.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::invalid_payload("quantity", item.quantity))?;
            }
            None => merged.push((item.product_id, item.quantity)),
        }
    }
    Ok(merged)
}

fn snapshot(product: &product::Model, quantity: i32) -> Result<NewOrderItem, AppError> {
    let line_total = product
        .price
        .checked_mul(i64::from(quantity))
        .ok_or_else(|| AppError::invalid_payload("quantity", quantity))?;
    Ok(NewOrderItem {
        product_id: product.id,
        product_slug: product.slug.clone(),
        product_name: product.name.clone(),
        unit_price: product.price,
        quantity,
        line_total,
    })
}
