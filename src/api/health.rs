use axum::{extract::Extension, response::IntoResponse, routing::get, Router};
use serde_json::json;

use crate::api::AppState;
use crate::error::AppError;
use crate::response::ok;

//ROUTERS
pub fn health_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/db", get(health_db))
        .layer(Extension(state))
}

//ROUTES
async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let settings = &state.settings;
    ok(
        json!({
            "status": "ok",
            "app": settings.app_name,
            "version": settings.version,
            "environment": settings.env,
        }),
        "Service healthy",
    )
}

async fn health_db(Extension(state): Extension<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.ping().await.map_err(|err| {
        AppError::ServiceUnavailable(format!("database ping failed: {err}"))
    })?;
    Ok(ok(json!({ "database": "ok" }), "Database reachable"))
}
