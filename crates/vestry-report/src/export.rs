//! Audit log export as JSON or CSV
//!
//! Exports run the normal list query page by page and stop at a hard row
//! cap, so one request cannot drag the whole table through memory. The
//! `include_details` toggle picks between a slim tabular shape and the
//! full record including payloads and correlation ids.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vestry_core::domain::{AuditEvent, DomainError};
use vestry_core::ports::{EventFilter, IEventStore, Order, Page, MAX_PAGE_SIZE};

use crate::csv;

/// Hard upper bound on rows per export.
pub const EXPORT_ROW_CAP: u32 = 10_000;

/// Serialization format for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// MIME type for serving the export over HTTP.
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(DomainError::validation(
                "format",
                format!("unknown export format '{other}'; valid: json, csv"),
            )),
        }
    }
}

/// One finished export: the rendered body plus row accounting
#[derive(Debug, Clone, Serialize)]
pub struct Export {
    pub format: ExportFormat,
    /// Rows in the body (after the cap)
    pub count: u64,
    pub body: String,
}

/// Renders filtered events as JSON or CSV.
pub struct ExportService {
    store: Arc<dyn IEventStore>,
}

impl ExportService {
    /// Creates an export service backed by the given store.
    pub fn new(store: Arc<dyn IEventStore>) -> Self {
        Self { store }
    }

    /// Exports the events matching `filter`, newest first, capped at
    /// [`EXPORT_ROW_CAP`] rows.
    pub async fn export(
        &self,
        filter: &EventFilter,
        format: ExportFormat,
        include_details: bool,
    ) -> Result<Export> {
        let events = self.fetch_capped(filter).await?;
        let count = events.len() as u64;

        let body = match format {
            ExportFormat::Json if include_details => serde_json::to_string_pretty(&events)
                .context("Failed to serialize export to JSON")?,
            ExportFormat::Json => {
                let slim: Vec<serde_json::Map<String, Value>> = events
                    .iter()
                    .map(|event| {
                        row(event, false)
                            .into_iter()
                            .map(|(key, value)| (key.to_string(), value))
                            .collect()
                    })
                    .collect();
                serde_json::to_string_pretty(&slim)
                    .context("Failed to serialize export to JSON")?
            }
            ExportFormat::Csv => {
                let rows: Vec<csv::Row> =
                    events.iter().map(|event| row(event, include_details)).collect();
                csv::to_csv(&rows)
            }
        };

        tracing::debug!(format = format.as_str(), rows = count, "Rendered export");

        Ok(Export {
            format,
            count,
            body,
        })
    }

    async fn fetch_capped(&self, filter: &EventFilter) -> Result<Vec<AuditEvent>> {
        let mut events: Vec<AuditEvent> = Vec::new();
        let mut number = 1u32;
        loop {
            let page = self
                .store
                .list(filter, Page::new(number, MAX_PAGE_SIZE), Order::Desc)
                .await
                .context("Failed to fetch events for export")?;
            let fetched = page.events.len();
            events.extend(page.events);
            if fetched < MAX_PAGE_SIZE as usize || events.len() >= EXPORT_ROW_CAP as usize {
                break;
            }
            number += 1;
        }
        events.truncate(EXPORT_ROW_CAP as usize);
        Ok(events)
    }
}

/// Flattens one event into export columns; `include_details` appends the
/// payload, correlation, and review columns.
fn row(event: &AuditEvent, include_details: bool) -> csv::Row {
    let mut row: csv::Row = vec![
        (
            "id",
            event
                .id()
                .map_or(Value::Null, |id| Value::from(id.as_i64())),
        ),
        ("timestamp", Value::String(ts(event.timestamp()))),
        ("action", Value::String(event.action().to_string())),
        (
            "category",
            Value::String(event.category().as_str().to_string()),
        ),
        ("description", Value::String(event.description().to_string())),
        (
            "actor_kind",
            Value::String(event.actor().kind.as_str().to_string()),
        ),
        ("actor_id", Value::String(event.actor().id.clone())),
        ("actor_name", opt(event.actor().name.as_deref())),
        ("actor_email", opt(event.actor().email.as_deref())),
        ("actor_role", opt(event.actor().role.as_deref())),
        ("actor_ip", opt(event.actor().source_ip.as_deref())),
        (
            "target_kind",
            event
                .target()
                .map_or(Value::Null, |t| Value::String(t.kind.as_str().to_string())),
        ),
        (
            "target_id",
            event
                .target()
                .map_or(Value::Null, |t| Value::String(t.id.clone())),
        ),
        (
            "target_name",
            event
                .target()
                .and_then(|t| t.name.as_deref())
                .map_or(Value::Null, |n| Value::String(n.to_string())),
        ),
        ("success", Value::Bool(event.outcome().is_success())),
        ("error_code", opt(event.outcome().error_code())),
        ("error_message", opt(event.outcome().error_message())),
        (
            "risk_level",
            Value::String(event.risk_level().as_str().to_string()),
        ),
        ("sensitive", Value::Bool(event.sensitive())),
        (
            "retention",
            Value::String(event.retention().as_str().to_string()),
        ),
        ("flagged", Value::Bool(event.flagged())),
        ("reviewed", Value::Bool(event.reviewed())),
        ("archived", Value::Bool(event.archived())),
    ];

    if include_details {
        row.extend([
            ("action_data", event.action_data().clone()),
            (
                "old_values",
                event.old_values().cloned().unwrap_or(Value::Null),
            ),
            (
                "new_values",
                event.new_values().cloned().unwrap_or(Value::Null),
            ),
            ("changes", event.changes().cloned().unwrap_or(Value::Null)),
            ("session_id", opt(event.session_id())),
            ("request_id", opt(event.request_id())),
            ("correlation_id", opt(event.correlation_id())),
            ("user_agent", opt(event.actor().user_agent.as_deref())),
            ("flag_reason", opt(event.flag_reason())),
            ("review_notes", opt(event.review_notes())),
            ("reviewed_by", opt(event.reviewed_by())),
            (
                "reviewed_at",
                event
                    .reviewed_at()
                    .map_or(Value::Null, |dt| Value::String(ts(dt))),
            ),
        ]);
    }

    row
}

fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn opt(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}
