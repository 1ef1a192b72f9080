use sea_orm::{ConnectionTrait, DbErr};
use thiserror::Error;

use crate::entities::order::{self, SheetsStatus};
use crate::entities::order_item;
use crate::integrations::google_sheets::{SheetsClient, SheetsError};
use crate::repository::orders as repo;

const MAX_ERROR_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum SheetsSyncError {
    #[error("Order {0} not found")]
    OrderNotFound(i32),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("Failed to record sheets result: {0}")]
    Database(#[from] DbErr),
}

/// Pushes one order to the spreadsheet and records the outcome on the order.
///
/// A failed append is stored as `FAILED` with the error message and also
/// returned, so the caller decides how loudly to log it. Nothing here panics
/// and nothing is retried.
pub async fn sync_order_to_sheets<C: ConnectionTrait>(
    db: &C,
    client: &dyn SheetsClient,
    order_id: i32,
) -> Result<(), SheetsSyncError> {
    let order = repo::find_by_id(db, order_id)
        .await?
        .ok_or(SheetsSyncError::OrderNotFound(order_id))?;
    let items = repo::items_for(db, order_id).await?;

    let row = build_order_row(&order, &items);
    match client.append_row(row).await {
        Ok(()) => {
            repo::set_sheets_result(db, order, SheetsStatus::Success, None).await?;
            tracing::info!(order_id, "Order appended to sheets");
            Ok(())
        }
        Err(err) => {
            let message = truncate_error(&err.to_string());
            repo::set_sheets_result(db, order, SheetsStatus::Failed, Some(message)).await?;
            Err(err.into())
        }
    }
}

/// Fixed column layout of the orders sheet.
pub fn build_order_row(order: &order::Model, items: &[order_item::Model]) -> Vec<String> {
    vec![
        order.id.to_string(),
        order.created_at.to_rfc3339(),
        order.status.as_str().to_string(),
        format!("{} {}", order.first_name, order.last_name),
        order.phone_number.clone(),
        order.wilaya.clone(),
        order.baladiya.clone(),
        order.delivery_mode.as_str().to_string(),
        order.address_line.clone().unwrap_or_default(),
        items_summary(items),
        order.items_subtotal.to_string(),
        order.delivery_fee.to_string(),
        order.total_amount.to_string(),
    ]
}

fn items_summary(items: &[order_item::Model]) -> String {
    items
        .iter()
        .map(|item| format!("{} x{}", item.product_slug, item.quantity))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn truncate_error(message: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        return "Unknown sheets error".to_string();
    }
    message.chars().take(MAX_ERROR_CHARS).collect()
}
