//! Request routing and handlers for the audit surface
//!
//! One flat match over method and path segments. Handlers return
//! `anyhow::Result`; the error path is mapped centrally onto the failure
//! envelope. Every request gets a generated request id echoed back as
//! `x-request-id`, a tracing line, and an `http_requests_total` sample
//! labeled with the route pattern.

use std::sync::Arc;

use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::HeaderValue;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use vestry_core::domain::{AuditEvent, DomainError, EventId, TargetKind};
use vestry_core::ports::{CleanupMode, Order, TimeRange};

use crate::identity::CallerIdentity;
use crate::query::{self, Params};
use crate::respond;
use crate::state::AppState;

/// Handles one request end to end.
pub async fn handle<B>(
    state: Arc<AppState>,
    req: Request<B>,
) -> Result<Response<Full<Bytes>>, hyper::Error>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    let request_id = Uuid::new_v4().to_string();
    let (parts, body) = req.into_parts();
    let method = parts.method;
    let path = parts.uri.path().to_string();
    let params = query::parse(parts.uri.query().unwrap_or(""));
    let identity = CallerIdentity::from_headers(&parts.headers);

    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let response = respond::error(
                StatusCode::BAD_REQUEST,
                format!("Failed to read request body: {e}"),
            );
            return Ok(finish(
                &state,
                "unmatched",
                &method,
                &path,
                &request_id,
                response,
            ));
        }
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let (endpoint, result) = route(&state, &method, &segments, &params, identity, &body).await;
    let response = match result {
        Ok(response) => response,
        Err(e) => respond::from_error(&e),
    };

    Ok(finish(
        &state, endpoint, &method, &path, &request_id, response,
    ))
}

fn finish(
    state: &AppState,
    endpoint: &str,
    method: &Method,
    path: &str,
    request_id: &str,
    mut response: Response<Full<Bytes>>,
) -> Response<Full<Bytes>> {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    state
        .metrics
        .record_http_request(endpoint, response.status().as_u16());
    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        "Handled request"
    );
    response
}

/// Maps the request to a handler and a stable route pattern for metrics.
async fn route(
    state: &AppState,
    method: &Method,
    segments: &[&str],
    params: &Params,
    identity: Option<CallerIdentity>,
    body: &[u8],
) -> (&'static str, anyhow::Result<Response<Full<Bytes>>>) {
    match (method, segments) {
        (&Method::GET, ["logs"]) => ("/logs", list_logs(state, params).await),
        (&Method::GET, ["logs", id]) => ("/logs/{id}", get_log(state, id).await),
        (&Method::POST, ["logs", id, "flag"]) => (
            "/logs/{id}/flag",
            flag_log(state, id, identity, body).await,
        ),
        (&Method::POST, ["logs", id, "review"]) => (
            "/logs/{id}/review",
            review_log(state, id, identity, body).await,
        ),
        (&Method::GET, ["actors", id, "logs"]) => {
            ("/actors/{id}/logs", actor_logs(state, id, params).await)
        }
        (&Method::GET, ["targets", kind, id, "logs"]) => (
            "/targets/{kind}/{id}/logs",
            target_logs(state, kind, id, params).await,
        ),
        (&Method::GET, ["security", "events"]) => {
            ("/security/events", security_events(state, params).await)
        }
        (&Method::GET, ["statistics"]) => ("/statistics", statistics(state, params).await),
        (&Method::GET, ["export"]) => ("/export", export(state, params, identity).await),
        (&Method::GET, ["compliance", "report"]) => {
            ("/compliance/report", compliance_report(state, params).await)
        }
        (&Method::GET, ["alerts"]) => ("/alerts", alerts(state, params).await),
        (&Method::POST, ["cleanup"]) => ("/cleanup", cleanup(state, identity, body).await),
        (&Method::GET, ["metrics"]) => ("/metrics", metrics(state)),
        (&Method::GET, ["health"]) => ("/health", Ok(health())),
        _ => (
            "unmatched",
            Ok(respond::error(StatusCode::NOT_FOUND, "Not found")),
        ),
    }
}

// ============================================================================
// Read surface
// ============================================================================

async fn list_logs(state: &AppState, params: &Params) -> anyhow::Result<Response<Full<Bytes>>> {
    let filter = query::event_filter(params)?;
    let page = query::page(params)?;
    let range = TimeRange::new(filter.from, filter.to);

    let events = state.store.list(&filter, page, Order::Desc).await?;
    let summary = state.security.window_summary(range).await?;

    Ok(respond::ok(json!({
        "logs": events.events,
        "pagination": events.pagination,
        "summary": summary,
    })))
}

async fn get_log(state: &AppState, id: &str) -> anyhow::Result<Response<Full<Bytes>>> {
    let id: EventId = id.parse()?;
    let event = state
        .store
        .get(id)
        .await?
        .ok_or(DomainError::EventNotFound(id))?;
    Ok(respond::ok(serde_json::to_value(&event)?))
}

async fn actor_logs(
    state: &AppState,
    actor_id: &str,
    params: &Params,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let filter = query::event_filter(params)?;
    let page = query::page(params)?;
    let history = state.history.actor_history(actor_id, filter, page).await?;
    Ok(respond::ok(serde_json::to_value(&history)?))
}

async fn target_logs(
    state: &AppState,
    kind: &str,
    target_id: &str,
    params: &Params,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let kind: TargetKind = kind.parse()?;
    let filter = query::event_filter(params)?;
    let page = query::page(params)?;
    let history = state
        .history
        .target_history(kind, target_id, filter, page)
        .await?;
    Ok(respond::ok(serde_json::to_value(&history)?))
}

async fn security_events(
    state: &AppState,
    params: &Params,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let levels = match query::get(params, "risk_level") {
        Some(value) => query::risk_levels(value)?,
        None => Vec::new(),
    };
    let flagged_only = match query::get(params, "flagged_only") {
        Some(value) => query::parse_bool(value, "flagged_only")?,
        None => false,
    };
    let range = query::time_range(params)?;
    let page = query::page(params)?;

    let feed = state
        .security
        .security_events(levels, flagged_only, range, page)
        .await?;
    Ok(respond::ok(serde_json::to_value(&feed)?))
}

async fn statistics(state: &AppState, params: &Params) -> anyhow::Result<Response<Full<Bytes>>> {
    let range = query::time_range(params)?;
    let granularity = query::granularity(params)?;
    let report = state.statistics.statistics(range, granularity).await?;
    Ok(respond::ok(serde_json::to_value(&report)?))
}

async fn compliance_report(
    state: &AppState,
    params: &Params,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let range = query::time_range(params)?;
    let report = state.compliance.report(range).await?;
    Ok(respond::ok(serde_json::to_value(&report)?))
}

async fn alerts(state: &AppState, params: &Params) -> anyhow::Result<Response<Full<Bytes>>> {
    let hours = match query::get(params, "hours") {
        Some(value) => query::parse_u32(value, "hours")?,
        None => 24,
    };
    let limit = match query::get(params, "limit") {
        Some(value) => query::parse_u32(value, "limit")?,
        None => 50,
    };

    let alerts = state.security.recent_alerts(hours, limit).await?;
    Ok(respond::ok(json!({
        "hours": hours,
        "count": alerts.len(),
        "alerts": alerts,
    })))
}

async fn export(
    state: &AppState,
    params: &Params,
    identity: Option<CallerIdentity>,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let identity = match identity {
        Some(identity) => identity,
        None => return Ok(unauthorized()),
    };
    let filter = query::event_filter(params)?;
    let format = query::export_format(params)?;
    let include_details = match query::get(params, "include_details") {
        Some(value) => query::parse_bool(value, "include_details")?,
        None => false,
    };

    let export = state.export.export(&filter, format, include_details).await?;
    note_recorded(
        state,
        state
            .recorder
            .log_export(identity.actor(), format.as_str(), export.count)
            .await,
    );

    let filename = format!(
        "audit-export-{}.{}",
        Utc::now().format("%Y%m%d-%H%M%S"),
        format.as_str()
    );
    Ok(respond::attachment(format.content_type(), &filename, export.body))
}

// ============================================================================
// Mutating surface
// ============================================================================

#[derive(Debug, Deserialize)]
struct FlagBody {
    reason: String,
    by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    notes: Option<String>,
    by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CleanupBody {
    older_than_days: u32,
    mode: String,
    preserve_critical: Option<bool>,
}

async fn flag_log(
    state: &AppState,
    id: &str,
    identity: Option<CallerIdentity>,
    body: &[u8],
) -> anyhow::Result<Response<Full<Bytes>>> {
    let identity = match identity {
        Some(identity) => identity,
        None => return Ok(unauthorized()),
    };
    let id: EventId = id.parse()?;
    let body: FlagBody = parse_body(body)?;
    let reviewer = body.by.unwrap_or_else(|| identity.id.clone());

    let event = state.review.flag(id, &body.reason, &reviewer).await?;
    note_recorded(
        state,
        state
            .recorder
            .log_flag_event(identity.actor(), id, &body.reason)
            .await,
    );
    Ok(respond::ok(serde_json::to_value(&event)?))
}

async fn review_log(
    state: &AppState,
    id: &str,
    identity: Option<CallerIdentity>,
    body: &[u8],
) -> anyhow::Result<Response<Full<Bytes>>> {
    let identity = match identity {
        Some(identity) => identity,
        None => return Ok(unauthorized()),
    };
    let id: EventId = id.parse()?;
    let body: ReviewBody = parse_body(body)?;
    let reviewer = body.by.unwrap_or_else(|| identity.id.clone());

    let event = state.review.review(id, body.notes, &reviewer).await?;
    note_recorded(
        state,
        state.recorder.log_review_event(identity.actor(), id).await,
    );
    Ok(respond::ok(serde_json::to_value(&event)?))
}

async fn cleanup(
    state: &AppState,
    identity: Option<CallerIdentity>,
    body: &[u8],
) -> anyhow::Result<Response<Full<Bytes>>> {
    let identity = match identity {
        Some(identity) => identity,
        None => return Ok(unauthorized()),
    };
    let body: CleanupBody = parse_body(body)?;
    let mode: CleanupMode = body.mode.parse()?;
    let preserve_critical = body.preserve_critical.unwrap_or(true);

    let report = state
        .retention
        .cleanup(body.older_than_days, mode, preserve_critical)
        .await?;
    note_recorded(
        state,
        state
            .recorder
            .log_cleanup_run(identity.actor(), mode, body.older_than_days, report.affected)
            .await,
    );
    Ok(respond::ok(serde_json::to_value(&report)?))
}

// ============================================================================
// Operational surface
// ============================================================================

fn metrics(state: &AppState) -> anyhow::Result<Response<Full<Bytes>>> {
    let body = state.metrics.encode()?;
    Ok(respond::raw(
        StatusCode::OK,
        "text/plain; version=0.0.4; charset=utf-8",
        body,
    ))
}

fn health() -> Response<Full<Bytes>> {
    respond::ok(json!({ "status": "ok" }))
}

fn unauthorized() -> Response<Full<Bytes>> {
    respond::error(StatusCode::UNAUTHORIZED, "Missing x-admin-id header")
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, DomainError> {
    serde_json::from_slice(body)
        .map_err(|e| DomainError::validation("body", format!("invalid request body: {e}")))
}

/// Counts a persisted self-audit event; `None` means the write was
/// swallowed by the recorder and there is nothing to count.
fn note_recorded(state: &AppState, recorded: Option<AuditEvent>) {
    if let Some(event) = recorded {
        state
            .metrics
            .record_audit_event(event.risk_level().as_str());
    }
}
