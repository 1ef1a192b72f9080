use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::entities::order_item::Entity as OrderItem;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub status: OrderStatus,

    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub first_name: String,
    #[sea_orm(column_type = "String(StringLen::N(100))")]
    pub last_name: String,
    #[sea_orm(indexed, column_type = "String(StringLen::N(30))")]
    pub phone_number: String,

    #[sea_orm(column_type = "String(StringLen::N(80))")]
    pub wilaya: String,
    #[sea_orm(column_type = "String(StringLen::N(120))")]
    pub baladiya: String,
    pub delivery_mode: DeliveryMode,
    #[sea_orm(column_type = "Text", nullable)]
    pub address_line: Option<String>,

    pub items_subtotal: i64,
    pub delivery_fee: i64,
    pub total_amount: i64,

    pub sheets_status: SheetsStatus,
    #[sea_orm(nullable)]
    pub sheets_synced_at: Option<DateTimeUtc>,
    #[sea_orm(column_type = "Text", nullable)]
    pub sheets_error: Option<String>,

    /// Set the one time stock is handed back on cancellation.
    #[sea_orm(nullable)]
    pub stock_restored_at: Option<DateTimeUtc>,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "OrderItem")]
    Items,
}

impl Related<OrderItem> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert && self.created_at.is_not_set() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "String(StringLen::N(30))",
    enum_name = "order_status"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
}

/// Legal status edges. Anything not listed here is rejected.
const TRANSITIONS: [(OrderStatus, &[OrderStatus]); 4] = [
    (
        OrderStatus::Pending,
        &[OrderStatus::Confirmed, OrderStatus::Canceled],
    ),
    (
        OrderStatus::Confirmed,
        &[OrderStatus::Delivered, OrderStatus::Canceled],
    ),
    (OrderStatus::Delivered, &[]),
    (OrderStatus::Canceled, &[]),
];

impl OrderStatus {
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, next)| *next)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELED" => Ok(OrderStatus::Canceled),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "String(StringLen::N(20))",
    enum_name = "delivery_mode"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMode {
    #[sea_orm(string_value = "HOME")]
    Home,
    #[sea_orm(string_value = "STOP_DESK")]
    StopDesk,
}

impl DeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::Home => "HOME",
            DeliveryMode::StopDesk => "STOP_DESK",
        }
    }
}

impl FromStr for DeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HOME" => Ok(DeliveryMode::Home),
            "STOP_DESK" => Ok(DeliveryMode::StopDesk),
            _ => Err(format!("Invalid delivery mode: {s}")),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(
    rs_type = "String",
    db_type = "String(StringLen::N(20))",
    enum_name = "sheets_status"
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetsStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}
