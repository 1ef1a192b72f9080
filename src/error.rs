use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::ValidationErrors;

use crate::entities::order::OrderStatus;
use crate::integrations::cloudinary::ImageHostError;
use crate::middleware::auth::TokenError;
use crate::response::ApiFailure;
use crate::services::orders::StockShortfall;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Product not found.")]
    ProductNotFound(Value),
    #[error("Order not found")]
    OrderNotFound { order_id: i32 },
    #[error("Not found")]
    RouteNotFound,

    #[error("{message}")]
    Validation { message: String, details: Value },
    #[error("Validation error")]
    RequestValidation(Value),
    #[error("Invalid order payload")]
    InvalidOrderPayload(Value),
    #[error("{message}")]
    ImageValidation {
        message: &'static str,
        details: Value,
    },

    #[error("Slug already exists.")]
    SlugConflict { slug: String },
    #[error("One or more products are not available")]
    ProductUnavailable { missing_product_ids: Vec<i32> },
    #[error("Insufficient stock for one or more products")]
    InsufficientStock { items: Vec<StockShortfall> },
    #[error("Invalid order status transition")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Not authorized")]
    NotAuthorized,

    #[error("Image upload failed")]
    ImageUpload(#[from] ImageHostError),
    #[error("Service unavailable")]
    ServiceUnavailable(String),
    #[error("Internal server error")]
    Database(#[from] DbErr),
    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, details: Value) -> AppError {
        AppError::Validation {
            message: message.into(),
            details,
        }
    }

    pub fn invalid_payload(field: &str, value: impl Into<Value>) -> AppError {
        let mut details = Map::new();
        details.insert(field.to_string(), value.into());
        AppError::InvalidOrderPayload(Value::Object(details))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ProductNotFound(_) | AppError::OrderNotFound { .. } | AppError::RouteNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation { .. }
            | AppError::RequestValidation(_)
            | AppError::InvalidOrderPayload(_)
            | AppError::ImageValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SlugConflict { .. }
            | AppError::ProductUnavailable { .. }
            | AppError::InsufficientStock { .. }
            | AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::NotAuthenticated | AppError::InvalidCredentials | AppError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotAuthorized => StatusCode::FORBIDDEN,
            AppError::ImageUpload(_) => StatusCode::BAD_REQUEST,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable identifier, sent to clients under `errors.code`.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ProductNotFound(_) => "product_not_found",
            AppError::OrderNotFound { .. } => "order_not_found",
            AppError::RouteNotFound => "not_found",
            AppError::Validation { .. } | AppError::RequestValidation(_) => "validation_error",
            AppError::InvalidOrderPayload(_) => "invalid_order_payload",
            AppError::ImageValidation { .. } => "image_validation_error",
            AppError::SlugConflict { .. } => "product_slug_conflict",
            AppError::ProductUnavailable { .. } => "product_unavailable",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::InvalidTransition { .. } => "invalid_status_transition",
            AppError::NotAuthenticated => "auth_required",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Token(_) => "auth_error",
            AppError::NotAuthorized => "not_admin",
            AppError::ImageUpload(_) => "image_upload_failed",
            AppError::ServiceUnavailable(_) => "service_unavailable",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            AppError::ProductNotFound(details)
            | AppError::RequestValidation(details)
            | AppError::InvalidOrderPayload(details) => Some(details.clone()),
            AppError::Validation { details, .. } | AppError::ImageValidation { details, .. } => {
                Some(details.clone())
            }
            AppError::OrderNotFound { order_id } => Some(json!({ "order_id": order_id })),
            AppError::SlugConflict { slug } => Some(json!({ "slug": slug })),
            AppError::ProductUnavailable { missing_product_ids } => {
                Some(json!({ "missing_product_ids": missing_product_ids }))
            }
            AppError::InsufficientStock { items } => Some(json!({ "items": items })),
            AppError::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            AppError::Token(err) => Some(json!({ "reason": err.reason() })),
            AppError::ImageUpload(err) => Some(json!({ "reason": err.to_string() })),
            _ => None,
        }
    }

    fn cause(&self) -> Option<String> {
        match self {
            AppError::Database(err) => Some(err.to_string()),
            AppError::Internal(cause) | AppError::ServiceUnavailable(cause) => Some(cause.clone()),
            AppError::ImageUpload(err) => Some(err.to_string()),
            _ => None,
        }
    }

    fn to_failure(&self) -> ApiFailure {
        let status = self.status();
        // Server errors never expose details.
        let errors = if status.is_server_error() {
            None
        } else {
            let mut errors = match self.details() {
                Some(Value::Object(map)) => map,
                Some(other) => Map::from_iter([("detail".to_string(), other)]),
                None => Map::new(),
            };
            errors.insert("code".to_string(), Value::from(self.code()));
            Some(Value::Object(errors))
        };

        ApiFailure {
            code: self.code(),
            message: self.to_string(),
            errors,
            cause: self.cause(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_failure().render(self.status(), None)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::RequestValidation(json!({ "validation": rejection.body_text() }))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::RequestValidation(json!({ "validation": rejection.body_text() }))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::RequestValidation(json!({ "validation": rejection.body_text() }))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or(Value::Null);
        AppError::RequestValidation(json!({ "validation": details }))
    }
}
