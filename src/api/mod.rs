pub mod admin;
pub mod extract;
pub mod health;
pub mod public;

use axum::{
    middleware::from_fn,
    response::{IntoResponse, Response},
    Router,
};
use sea_orm::DatabaseConnection;
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::Settings;
use crate::error::AppError;
use crate::integrations::{cloudinary::ImageHost, google_sheets::SheetsClient};
use crate::middleware::logging::logging_middleware;
use crate::services::{orders::OrderService, products::ProductService};

use admin::admin_api_router;
use health::health_router;
use public::public_api_router;

/// Everything a handler may need, injected once through an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub settings: Arc<Settings>,
    pub sheets: Arc<dyn SheetsClient>,
    pub images: Arc<dyn ImageHost>,
}

impl AppState {
    pub fn products(&self) -> ProductService {
        ProductService::new(self.db.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.db.clone(), self.sheets.clone())
    }
}

pub fn create_api_router(state: AppState) -> Router {
    let v1 = Router::new()
        .merge(public_api_router(state.clone()))
        .merge(admin_api_router(state.clone()));

    Router::new()
        .nest("/api/v1", v1)
        .merge(health_router(state))
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(logging_middleware))
}

async fn route_not_found() -> AppError {
    AppError::RouteNotFound
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    AppError::Internal(format!("panic: {detail}")).into_response()
}
