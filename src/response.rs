use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Success envelope: `{success, message, data}`.
#[derive(Serialize, Debug)]
pub struct ApiSuccess<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiSuccess<T>> {
    Json(ApiSuccess {
        success: true,
        message: message.into(),
        data,
    })
}

/// Failure envelope: `{success, message, errors, trace_id}`.
#[derive(Serialize, Debug)]
pub struct ApiErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Attached to every error response so the logging middleware can log the
/// failure and stamp the request id into the body.
#[derive(Clone, Debug)]
pub struct ApiFailure {
    pub code: &'static str,
    pub message: String,
    pub errors: Option<Value>,
    /// Internal cause, logged but never sent to the client.
    pub cause: Option<String>,
}

impl ApiFailure {
    pub fn body(&self, trace_id: Option<String>) -> ApiErrorBody {
        ApiErrorBody {
            success: false,
            message: self.message.clone(),
            errors: self.errors.clone(),
            trace_id,
        }
    }

    pub fn render(self, status: StatusCode, trace_id: Option<String>) -> Response {
        let mut response = (status, Json(self.body(trace_id))).into_response();
        response.extensions_mut().insert(self);
        response
    }
}
