pub mod auth;
pub mod order;
pub mod product;
pub mod upload;

use axum::{middleware::from_fn_with_state, Router};

use auth::admin_auth_router;
use order::admin_order_router;
use product::admin_product_router;
use upload::upload_router;

use crate::api::AppState;
use crate::middleware::auth::{admin_auth_middleware, AuthState};

/// Login and logout stay open, everything else requires the admin cookie.
pub fn admin_api_router(state: AppState) -> Router {
    let admin_auth_router = admin_auth_router(state.clone());
    let admin_product_router = admin_product_router(state.clone());
    let admin_order_router = admin_order_router(state.clone());
    let upload_router = upload_router(state.clone());

    let protected = Router::new()
        .merge(admin_product_router)
        .merge(admin_order_router)
        .merge(upload_router)
        .route_layer(from_fn_with_state(
            AuthState {
                settings: state.settings.clone(),
            },
            admin_auth_middleware,
        ));

    Router::new().merge(admin_auth_router).merge(protected)
}
