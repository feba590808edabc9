//! Common utilities shared across handlers.

use std::any::Any;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, warn};
use wmtsproxy_common::{ProxyError, ProxyResult};

// ============================================================================
// JSON / JSONP
// ============================================================================

/// Whether `callback` is a plain (possibly dotted) JavaScript identifier.
pub fn is_valid_callback(callback: &str) -> bool {
    !callback.is_empty()
        && callback.len() <= 128
        && callback
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
        && !callback.starts_with(|c: char| c.is_ascii_digit())
}

/// JSON response, wrapped as `callback(json)` when a callback is given.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T, callback: Option<&str>) -> Response {
    let json = match serde_json::to_string(body) {
        Ok(json) => json,
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response();
        }
    };

    match callback {
        Some(callback) if is_valid_callback(callback) => (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/javascript"),
            )],
            format!("{}({})", callback, json),
        )
            .into_response(),
        Some(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid callback name" })),
        )
            .into_response(),
        None => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            json,
        )
            .into_response(),
    }
}

/// `{"error": <message>}` with the status of the error kind.
pub fn error_response(err: &ProxyError, callback: Option<&str>) -> Response {
    log_error(err);
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, &json!({ "error": err.user_msg() }), callback)
}

/// Log an error with the level of its kind.
/// Response for a request whose handler panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = message, "Request handler panicked");
    metrics::counter!("wmtsproxy_panics_total").increment(1);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

pub fn log_error(err: &ProxyError) {
    match err {
        ProxyError::Capabilities(_) | ProxyError::User(_) => {
            debug!(kind = err.kind(), error = %err.system_msg(), "Request rejected")
        }
        ProxyError::Feature(_) | ProxyError::Service(_) | ProxyError::ConfigWriter(_) => {
            warn!(kind = err.kind(), error = %err.system_msg(), "Request failed")
        }
    }
}

/// Render a pipeline result, recording its outcome in `counter`.
pub fn respond<T: Serialize>(counter: &'static str, result: ProxyResult<T>, callback: Option<&str>) -> Response {
    match result {
        Ok(body) => {
            metrics::counter!(counter, "outcome" => "success").increment(1);
            json_response(StatusCode::OK, &body, callback)
        }
        Err(err) => {
            metrics::counter!(counter, "outcome" => err.kind()).increment(1);
            error_response(&err, callback)
        }
    }
}

/// Required query parameter, a user error when missing or empty.
pub fn required<'a>(value: &'a Option<String>, name: &str) -> ProxyResult<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProxyError::user(format!("Missing parameter \"{}\"", name)))
}
