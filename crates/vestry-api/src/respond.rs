//! Response envelopes and error mapping
//!
//! Every JSON response is wrapped as `{"success": true, "data": ...}` or
//! `{"success": false, "error": "..."}`. Domain errors map to 400, lookup
//! misses to 404, and anything else (store failures included) to 500.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde_json::{json, Value};
use vestry_core::domain::DomainError;

/// 200 with a success envelope around `data`.
pub fn ok(data: Value) -> Response<Full<Bytes>> {
    envelope(StatusCode::OK, json!({ "success": true, "data": data }))
}

/// Failure envelope with the given status.
pub fn error(status: StatusCode, message: impl Into<String>) -> Response<Full<Bytes>> {
    envelope(
        status,
        json!({ "success": false, "error": message.into() }),
    )
}

/// Maps a handler error onto the failure envelope.
pub fn from_error(err: &anyhow::Error) -> Response<Full<Bytes>> {
    if let Some(domain) = err.downcast_ref::<DomainError>() {
        let status = if domain.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_REQUEST
        };
        return error(status, domain.to_string());
    }

    tracing::error!(error = format!("{err:#}"), "Request handler failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

/// Raw body with an explicit content type, for non-envelope payloads
/// (metrics exposition, health probes from plain checkers).
pub fn raw(status: StatusCode, content_type: &'static str, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", content_type)
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Download response for exports: raw body plus a dated attachment name.
pub fn attachment(
    content_type: &'static str,
    filename: &str,
    body: String,
) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn envelope(status: StatusCode, value: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(value.to_string())))
        .unwrap()
}
