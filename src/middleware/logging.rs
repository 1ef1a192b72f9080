use axum::{
    extract::Request,
    http::{header::CONTENT_LENGTH, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::response::ApiFailure;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identifier, also sent back as `X-Request-ID` and as the
/// `trace_id` of error bodies.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

pub async fn logging_middleware(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed = start.elapsed();
    let (mut parts, body) = response.into_parts();

    let body = match parts.extensions.remove::<ApiFailure>() {
        Some(failure) => {
            if status.is_server_error() {
                error!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    status = %status,
                    elapsed = ?elapsed,
                    code = failure.code,
                    cause = failure.cause.as_deref().unwrap_or(""),
                    "Request failed"
                );
            } else {
                warn!(
                    request_id = %request_id,
                    method = %method,
                    uri = %uri,
                    status = %status,
                    elapsed = ?elapsed,
                    code = failure.code,
                    "Request rejected"
                );
            }
            // Same envelope, now carrying the request id.
            parts.headers.remove(CONTENT_LENGTH);
            Json(failure.body(Some(request_id.clone())))
                .into_response()
                .into_body()
        }
        None => {
            info!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                elapsed = ?elapsed,
                "Processed request"
            );
            body
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts
            .headers
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Response::from_parts(parts, body)
}
