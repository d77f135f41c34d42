//! Shared plumbing for the CLI commands
//!
//! Commands open the audit database directly (the same file vestryd
//! serves) rather than going through the HTTP API, so they keep working
//! while the daemon is down.

pub mod cleanup;
pub mod export;
pub mod history;
pub mod logs;
pub mod review;
pub mod security;
pub mod stats;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use vestry_audit::{AlertDispatcher, AuditRecorder, TracingAlertChannel};
use vestry_core::config::Config;
use vestry_core::domain::{ActionCategory, AuditEvent, RiskLevel};
use vestry_core::ports::{
    EventFilter, IAlertChannel, IDirectory, IEventStore, Page, MAX_PAGE_SIZE,
};
use vestry_store::{DatabasePool, SqliteDirectory, SqliteEventStore};

use crate::output::OutputFormatter;

/// Open handles over the audit database plus the loaded configuration
pub struct Stores {
    pub config: Config,
    pub store: Arc<dyn IEventStore>,
    pub directory: Arc<dyn IDirectory>,
}

impl Stores {
    /// Builds a recorder for commands that write self-audit entries.
    pub fn recorder(&self) -> AuditRecorder {
        let mut channels: Vec<Arc<dyn IAlertChannel>> = Vec::new();
        for name in &self.config.alerts.channels {
            match name.as_str() {
                "tracing" => channels.push(Arc::new(TracingAlertChannel)),
                other => tracing::warn!(channel = other, "Ignoring unknown alert channel"),
            }
        }
        let dispatcher = AlertDispatcher::new(
            channels,
            Duration::from_millis(self.config.alerts.dispatch_timeout_ms),
        );
        AuditRecorder::new(Arc::clone(&self.store), dispatcher)
    }
}

/// Opens the audit database behind the configured (or overridden) path.
///
/// An explicit `--config` file must parse; without one, a missing or
/// unreadable default config falls back to defaults. A missing database
/// is an error either way so scripts get a nonzero exit.
pub async fn open_stores(config_override: Option<&Path>) -> Result<Stores> {
    let config = match config_override {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    if !config.database.path.exists() {
        anyhow::bail!(
            "No audit database found at {}. Start vestryd first or pass --config.",
            config.database.path.display()
        );
    }

    let pool = DatabasePool::new(&config.database.path)
        .await
        .context("Failed to open audit database")?;
    let store: Arc<dyn IEventStore> = Arc::new(SqliteEventStore::new(pool.pool().clone()));
    let directory: Arc<dyn IDirectory> = Arc::new(SqliteDirectory::new(pool.pool().clone()));

    Ok(Stores {
        config,
        store,
        directory,
    })
}

// ============================================================================
// Shared argument groups
// ============================================================================

/// Filter flags shared by the listing commands
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Show entries since this time (e.g. "2h", "7d", "2026-01-01")
    #[arg(long)]
    pub since: Option<String>,

    /// Show entries until this time (same formats as --since)
    #[arg(long)]
    pub until: Option<String>,

    /// Filter by action name (substring match)
    #[arg(long)]
    pub action: Option<String>,

    /// Filter by category (e.g. "user_management", "security")
    #[arg(long)]
    pub category: Option<String>,

    /// Filter by risk level (repeatable)
    #[arg(long)]
    pub risk: Vec<String>,

    /// Only failed actions
    #[arg(long)]
    pub failed: bool,

    /// Only flagged entries
    #[arg(long)]
    pub flagged: bool,

    /// Only sensitive actions
    #[arg(long)]
    pub sensitive: bool,

    /// Filter by actor source IP
    #[arg(long)]
    pub ip: Option<String>,
}

impl FilterArgs {
    /// Builds a store filter from the flags, parsing user-facing strings.
    pub fn to_filter(&self) -> Result<EventFilter> {
        let mut filter = EventFilter::new();
        if let Some(since) = &self.since {
            filter = filter.with_from(parse_since(since)?);
        }
        if let Some(until) = &self.until {
            filter = filter.with_to(parse_since(until)?);
        }
        if let Some(action) = &self.action {
            filter = filter.with_action(action.as_str());
        }
        if let Some(category) = &self.category {
            filter = filter.with_category(category.parse::<ActionCategory>()?);
        }
        for risk in &self.risk {
            filter = filter.with_risk_level(risk.parse::<RiskLevel>()?);
        }
        if self.failed {
            filter = filter.with_success(false);
        }
        if self.flagged {
            filter = filter.with_flagged(true);
        }
        if self.sensitive {
            filter = filter.with_sensitive(true);
        }
        if let Some(ip) = &self.ip {
            filter = filter.with_actor_ip(ip.as_str());
        }
        Ok(filter)
    }
}

/// Pagination flags shared by the listing commands
#[derive(Debug, Args)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Entries per page
    #[arg(long, default_value = "50")]
    pub limit: u32,
}

impl PageArgs {
    pub fn to_page(&self) -> Page {
        Page::new(self.page.max(1), self.limit.clamp(1, MAX_PAGE_SIZE))
    }
}

// ============================================================================
// Time parsing
// ============================================================================

/// Parses a `--since`/`--until` value into a UTC instant
///
/// Supports:
/// - Relative: "30m", "2h", "7d", "1w"
/// - Absolute date: "2026-01-01" (midnight UTC)
/// - Absolute datetime: "2026-01-01T12:00:00"
pub fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(duration) = parse_relative_duration(input) {
        return Ok(Utc::now() - duration);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let datetime = date
            .and_hms_opt(0, 0, 0)
            .context("Failed to create datetime from date")?;
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    anyhow::bail!(
        "Could not parse '{}' as a time. Use relative (30m, 2h, 7d, 1w) or absolute (2026-01-01) format.",
        input
    )
}

/// Parse relative duration strings like "30m", "2h", "7d", "1w"
fn parse_relative_duration(input: &str) -> Option<chrono::Duration> {
    if input.len() < 2 {
        return None;
    }

    let (num_str, unit) = input.split_at(input.len() - 1);
    let num: i64 = num_str.parse().ok()?;

    match unit {
        "m" => Some(chrono::Duration::minutes(num)),
        "h" => Some(chrono::Duration::hours(num)),
        "d" => Some(chrono::Duration::days(num)),
        "w" => Some(chrono::Duration::weeks(num)),
        _ => None,
    }
}

// ============================================================================
// Table rendering
// ============================================================================

/// Prints the column header for event tables.
pub fn event_table_header(formatter: &dyn OutputFormatter) {
    formatter.info("");
    formatter.info(
        "ID      Timestamp            Risk      Marks  Action                Actor            Result",
    );
    formatter.info(
        "------- -------------------- --------- ------ --------------------- ---------------- -------",
    );
}

/// Prints one event as a table row.
pub fn event_row(formatter: &dyn OutputFormatter, event: &AuditEvent) {
    let id = event
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let result = if event.outcome().is_success() {
        "OK"
    } else {
        "FAILED"
    };
    formatter.info(&format!(
        "{:<7} {} {:<9} {:<6} {:<21} {:<16} {}",
        id,
        event.timestamp().format("%Y-%m-%d %H:%M:%S"),
        event.risk_level().as_str(),
        event_marks(event),
        truncate(event.action(), 21),
        truncate(&event.actor().id, 16),
        result
    ));
}

/// Compact status marks: S sensitive, F flagged, R reviewed, A archived.
pub fn event_marks(event: &AuditEvent) -> String {
    let mut marks = String::new();
    if event.sensitive() {
        marks.push('S');
    }
    if event.flagged() {
        marks.push('F');
    }
    if event.reviewed() {
        marks.push('R');
    }
    if event.archived() {
        marks.push('A');
    }
    marks
}

/// Prints the full detail view of one event.
pub fn print_event_details(formatter: &dyn OutputFormatter, event: &AuditEvent) {
    let id = event
        .id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    formatter.info(&format!("ID:          {}", id));
    formatter.info(&format!("Timestamp:   {}", event.timestamp().to_rfc3339()));
    formatter.info(&format!("Action:      {}", event.action()));
    formatter.info(&format!("Category:    {}", event.category()));
    formatter.info(&format!("Description: {}", event.description()));
    formatter.info(&format!(
        "Risk:        {}{}",
        event.risk_level(),
        if event.sensitive() { " (sensitive)" } else { "" }
    ));
    formatter.info(&format!("Retention:   {}", event.retention()));

    let actor = event.actor();
    formatter.info(&format!(
        "Actor:       {} {} ({})",
        actor.kind,
        actor.id,
        actor.name.as_deref().unwrap_or("unknown")
    ));
    if let Some(ip) = &actor.source_ip {
        formatter.info(&format!("Source IP:   {}", ip));
    }
    if let Some(target) = event.target() {
        formatter.info(&format!("Target:      {} {}", target.kind, target.id));
    }

    let outcome = event.outcome();
    if outcome.is_success() {
        formatter.info("Outcome:     success");
    } else {
        formatter.info(&format!(
            "Outcome:     failed [{}] {}",
            outcome.error_code().unwrap_or("unknown"),
            outcome.error_message().unwrap_or("")
        ));
    }

    if event.flagged() {
        formatter.info(&format!(
            "Flagged:     {}",
            event.flag_reason().unwrap_or("(no reason recorded)")
        ));
    }
    if event.reviewed() {
        formatter.info(&format!(
            "Reviewed:    by {}{}",
            event.reviewed_by().unwrap_or("unknown"),
            event
                .review_notes()
                .map(|notes| format!(": {notes}"))
                .unwrap_or_default()
        ));
    }
    if event.archived() {
        formatter.info("Archived:    yes");
    }
    if !event.action_data().is_null() {
        formatter.info(&format!("Data:        {}", event.action_data()));
    }
}

/// Truncate a string to a maximum length
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}

// ============================================================================
// Test fixtures
// ============================================================================
