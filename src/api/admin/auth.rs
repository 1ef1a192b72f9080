use axum::{
    extract::Extension,
    http::header::SET_COOKIE,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::extract::ApiJson;
use crate::api::AppState;
use crate::error::AppError;
use crate::middleware::auth::{access_cookie, clear_access_cookie, generate_token, normalize_email};
use crate::response::ok;

//ROUTERS
pub fn admin_auth_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .layer(Extension(state))
}

//ROUTES
async fn login(
    Extension(state): Extension<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let admin = &state.settings.admin;

    // Same answer whichever of the two is wrong.
    if normalize_email(&payload.email) != normalize_email(&admin.email)
        || payload.password != admin.password
    {
        tracing::warn!("Rejected admin login");
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_token(
        &normalize_email(&admin.email),
        &admin.jwt_secret_key,
        admin.token_expires_minutes,
    )?;
    let cookie = access_cookie(
        &token,
        admin.token_expires_minutes * 60,
        !state.settings.is_development(),
    );

    tracing::info!("Admin logged in");
    Ok((
        [(SET_COOKIE, cookie)],
        ok(json!({ "authenticated": true }), "Logged in"),
    ))
}

async fn logout(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let cookie = clear_access_cookie(!state.settings.is_development());
    (
        [(SET_COOKIE, cookie)],
        ok(json!({ "logged_out": true }), "Logged out"),
    )
}

//Structs
#[derive(Deserialize, Validate)]
struct LoginPayload {
    #[validate(length(min = 1, max = 254))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}
