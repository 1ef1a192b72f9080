pub mod order;
pub mod product;

use axum::Router;

use crate::api::AppState;
use order::order_router;
use product::product_router;

pub fn public_api_router(state: AppState) -> Router {
    let product_router = product_router(state.clone());
    let order_router = order_router(state);

    Router::new().merge(product_router).merge(order_router)
}
