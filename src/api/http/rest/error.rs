use std::any::Any;

use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::core;

/// Every failure leaves the proxy in this shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Value,
    path: Option<String>,
    requested_url: Option<String>,
}

#[derive(Serialize)]
struct Body<'a> {
    success: bool,
    message: &'a str,
    details: &'a Value,
    status: u16,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(rename = "requestedUrl", skip_serializing_if = "Option::is_none")]
    requested_url: Option<&'a str>,
}

impl ApiError {
    pub fn from_core(err: core::Error, path: &str) -> Self {
        error!(message = "Request failed", path, error = %err);

        let (status, message, details) = match err {
            core::Error::Upstream { status, body } => {
                let message = core::error_message(&body)
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("Auth0 API responded with {status}"));
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, message, body)
            }
            core::Error::Auth { status, message } => {
                let status = match status {
                    Some(401 | 403) => StatusCode::UNAUTHORIZED,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    "Failed to authenticate with Auth0".to_owned(),
                    Value::String(message),
                )
            }
            core::Error::Transport(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Auth0 API request failed".to_owned(),
                Value::String(reason),
            ),
        };

        Self {
            status,
            message,
            details,
            path: Some(path.to_owned()),
            requested_url: None,
        }
    }

    /// The inbound request could not be read (malformed JSON or form body).
    pub fn bad_request(reason: impl Into<String>, path: &str) -> Self {
        let reason = reason.into();
        warn!(message = "Rejected malformed request", path, reason = %reason);
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid request".to_owned(),
            details: Value::String(reason),
            path: Some(path.to_owned()),
            requested_url: None,
        }
    }

    pub fn not_found(path: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "Route not found".to_owned(),
            details: Value::Null,
            path: Some(path.to_owned()),
            requested_url: Some(path.to_owned()),
        }
    }

    /// Known path, unsupported method. Echoes the path like an unknown route.
    pub fn method_not_allowed(method: &Method, path: &str) -> Self {
        Self {
            status: StatusCode::METHOD_NOT_ALLOWED,
            message: format!("Method {method} not allowed"),
            details: Value::Null,
            path: Some(path.to_owned()),
            requested_url: Some(path.to_owned()),
        }
    }

    pub fn unsupported_media_type(content_type: &str, path: &str) -> Self {
        warn!(message = "Rejected request body", path, content_type);
        Self {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Unsupported content type".to_owned(),
            details: Value::String(format!(
                "expected application/json or application/x-www-form-urlencoded, got {content_type}"
            )),
            path: Some(path.to_owned()),
            requested_url: None,
        }
    }

    pub fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal Server Error".to_owned(),
            details: Value::Null,
            path: None,
            requested_url: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Body {
            success: false,
            message: &self.message,
            details: &self.details,
            status: self.status.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: self.path.as_deref(),
            requested_url: self.requested_url.as_deref(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Turns a handler panic into a plain 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let reason = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(message = "Handler panicked", reason);
    ApiError::internal().into_response()
}
