use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;

use crate::entities::order::{
    self, DeliveryMode, Entity as Order, OrderStatus, SheetsStatus,
};
use crate::entities::order_item::{self, Entity as OrderItem};
use crate::repository::Page;

#[derive(Clone, Debug)]
pub struct NewOrder {
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
}

#[derive(Clone, Debug)]
pub struct NewOrderItem {
    pub product_id: i32,
    pub product_slug: String,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Clone, Debug, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub phone_number: Option<String>,
}

/// Writes the order header as PENDING with a pending sheets sync, then its
/// lines in the given order.
pub async fn insert_with_items<C: ConnectionTrait>(
    db: &C,
    order: NewOrder,
    items: Vec<NewOrderItem>,
) -> Result<order::Model, DbErr> {
    let saved = order::ActiveModel {
        status: Set(OrderStatus::Pending),
        first_name: Set(order.first_name),
        last_name: Set(order.last_name),
        phone_number: Set(order.phone_number),
        wilaya: Set(order.wilaya),
        baladiya: Set(order.baladiya),
        delivery_mode: Set(order.delivery_mode),
        address_line: Set(order.address_line),
        items_subtotal: Set(order.items_subtotal),
        delivery_fee: Set(order.delivery_fee),
        total_amount: Set(order.total_amount),
        sheets_status: Set(SheetsStatus::Pending),
        sheets_synced_at: Set(None),
        sheets_error: Set(None),
        stock_restored_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let now = Utc::now();
    for item in items {
        order_item::ActiveModel {
            order_id: Set(saved.id),
            product_id: Set(item.product_id),
            product_slug: Set(item.product_slug),
            product_name: Set(item.product_name),
            unit_price: Set(item.unit_price),
            quantity: Set(item.quantity),
            line_total: Set(item.line_total),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(saved)
}

pub async fn find_by_id<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> Result<Option<order::Model>, DbErr> {
    Order::find_by_id(order_id).one(db).await
}

pub async fn items_for<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> Result<Vec<order_item::Model>, DbErr> {
    OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await
}

pub async fn items_for_many<C: ConnectionTrait>(
    db: &C,
    order_ids: &[i32],
) -> Result<HashMap<i32, Vec<order_item::Model>>, DbErr> {
    let mut grouped: HashMap<i32, Vec<order_item::Model>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(order_item::Column::OrderId)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

/// Newest first.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    filter: &OrderFilter,
    page: Page,
) -> Result<(Vec<order::Model>, u64), DbErr> {
    let mut query = Order::find();
    if let Some(status) = filter.status {
        query = query.filter(order::Column::Status.eq(status));
    }
    if let Some(phone) = filter
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        query = query.filter(order::Column::PhoneNumber.contains(phone));
    }

    let paginator = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .paginate(db, page.page_size);
    let total = paginator.num_items().await?;
    let orders = paginator.fetch_page(page.index()).await?;
    Ok((orders, total))
}

pub async fn set_status<C: ConnectionTrait>(
    db: &C,
    current: order::Model,
    status: OrderStatus,
) -> Result<order::Model, DbErr> {
    let mut order: order::ActiveModel = current.into();
    order.status = Set(status);
    order.update(db).await
}

pub async fn mark_stock_restored<C: ConnectionTrait>(
    db: &C,
    current: order::Model,
) -> Result<order::Model, DbErr> {
    let mut order: order::ActiveModel = current.into();
    order.stock_restored_at = Set(Some(Utc::now()));
    order.update(db).await
}

/// Records the outcome of a sheets push. Success stamps `sheets_synced_at`
/// and clears the error; failure clears the stamp and stores the message.
pub async fn set_sheets_result<C: ConnectionTrait>(
    db: &C,
    current: order::Model,
    status: SheetsStatus,
    error: Option<String>,
) -> Result<order::Model, DbErr> {
    let mut order: order::ActiveModel = current.into();
    order.sheets_status = Set(status);
    if status == SheetsStatus::Success {
        order.sheets_synced_at = Set(Some(Utc::now()));
        order.sheets_error = Set(None);
    } else {
        order.sheets_synced_at = Set(None);
        order.sheets_error = Set(error);
    }
    order.update(db).await
}
