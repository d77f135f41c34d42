//! SQLite implementation of IEventStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! event store port defined in vestry-core. It handles all domain type
//! serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                  |
//! |-------------------|----------|-------------------------------------------|
//! | EventId           | INTEGER  | rowid via `last_insert_rowid()`           |
//! | DateTime<Utc>     | TEXT     | RFC 3339 UTC, fixed-width microseconds    |
//! | ActionCategory    | TEXT     | `.as_str()` / `FromStr`                   |
//! | ActorKind         | TEXT     | `.as_str()` / `FromStr`                   |
//! | TargetKind        | TEXT     | `.as_str()` / `FromStr`                   |
//! | RiskLevel         | TEXT     | `.as_str()` / `FromStr`                   |
//! | RetentionCategory | TEXT     | `.as_str()` / `FromStr`                   |
//! | ActionOutcome     | INTEGER + TEXT | `success` flag plus error code/message columns |
//! | Value payloads    | TEXT     | serde_json serialization                  |
//!
//! Timestamps are written with `to_rfc3339_opts(SecondsFormat::Micros, true)`
//! because the store sorts and range-filters on the column as text; the
//! fixed width keeps lexicographic order equal to chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use vestry_core::domain::AuditEvent;
use vestry_core::domain::EventId;
use vestry_core::ports::{
    ActorStat, BucketStat, CategoryStat, CleanupMode, EventFilter, EventPage, Granularity,
    IEventStore, Order, Page, Pagination, ReviewState, RiskStat, TimeRange, MAX_PAGE_SIZE,
};

use crate::StoreError;

/// SQLite-based implementation of the event store port
///
/// Provides persistent storage for audit events using SQLite. All
/// operations are performed through a connection pool for concurrency.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Format a DateTime<Utc> in the fixed-width form the schema requires
fn fmt_ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Try parsing without timezone (SQLite default format)
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Parse a stored JSON text column, treating NULL/empty as JSON null
fn json_or_null(s: Option<String>) -> serde_json::Value {
    match s {
        Some(ref text) if !text.is_empty() => {
            serde_json::from_str(text).unwrap_or(serde_json::Value::Null)
        }
        _ => serde_json::Value::Null,
    }
}

/// One deferred bind for a dynamically built query
enum Bind {
    Text(String),
    Int(i64),
}

/// Append the WHERE fragments for an EventFilter
///
/// The base query must already end in `WHERE 1=1` so every fragment can
/// start with ` AND`.
fn push_filter(sql: &mut String, binds: &mut Vec<Bind>, filter: &EventFilter) {
    if let Some(ref from) = filter.from {
        sql.push_str(" AND timestamp >= ?");
        binds.push(Bind::Text(fmt_ts(from)));
    }

    if let Some(ref to) = filter.to {
        sql.push_str(" AND timestamp <= ?");
        binds.push(Bind::Text(fmt_ts(to)));
    }

    if let Some(ref actor_id) = filter.actor_id {
        sql.push_str(" AND actor_id = ?");
        binds.push(Bind::Text(actor_id.clone()));
    }

    if let Some(kind) = filter.target_kind {
        sql.push_str(" AND target_kind = ?");
        binds.push(Bind::Text(kind.as_str().to_string()));
    }

    if let Some(ref target_id) = filter.target_id {
        sql.push_str(" AND target_id = ?");
        binds.push(Bind::Text(target_id.clone()));
    }

    if let Some(ref action) = filter.action {
        // SQLite LIKE is case-insensitive for ASCII, which matches the
        // substring semantics of the action filter.
        sql.push_str(" AND action LIKE '%' || ? || '%'");
        binds.push(Bind::Text(action.clone()));
    }

    if let Some(category) = filter.category {
        sql.push_str(" AND category = ?");
        binds.push(Bind::Text(category.as_str().to_string()));
    }

    if !filter.risk_levels.is_empty() {
        let placeholders = vec!["?"; filter.risk_levels.len()].join(", ");
        sql.push_str(&format!(" AND risk_level IN ({placeholders})"));
        for level in &filter.risk_levels {
            binds.push(Bind::Text(level.as_str().to_string()));
        }
    }

    if let Some(success) = filter.success {
        sql.push_str(" AND success = ?");
        binds.push(Bind::Int(success as i64));
    }

    if let Some(flagged) = filter.flagged {
        sql.push_str(" AND flagged = ?");
        binds.push(Bind::Int(flagged as i64));
    }

    if let Some(reviewed) = filter.reviewed {
        sql.push_str(" AND reviewed = ?");
        binds.push(Bind::Int(reviewed as i64));
    }

    if let Some(sensitive) = filter.sensitive {
        sql.push_str(" AND sensitive = ?");
        binds.push(Bind::Int(sensitive as i64));
    }

    if let Some(ref ip) = filter.actor_ip {
        sql.push_str(" AND actor_ip = ?");
        binds.push(Bind::Text(ip.clone()));
    }

    if let Some(archived) = filter.archived {
        sql.push_str(" AND archived = ?");
        binds.push(Bind::Int(archived as i64));
    }
}

/// Append the WHERE fragments for a TimeRange (aggregation queries)
fn push_range(sql: &mut String, binds: &mut Vec<String>, range: &TimeRange) {
    if let Some(ref from) = range.from {
        sql.push_str(" AND timestamp >= ?");
        binds.push(fmt_ts(from));
    }
    if let Some(ref to) = range.to {
        sql.push_str(" AND timestamp <= ?");
        binds.push(fmt_ts(to));
    }
}

// ============================================================================
// Row mapping
// ============================================================================

/// Reconstruct an AuditEvent from a database row
///
/// Uses serde JSON deserialization to reconstruct the event since the
/// struct has private fields that can only be set through `from_draft` or
/// deserialization. This preserves the stored timestamp and derived
/// classification instead of recomputing them.
fn event_from_row(row: &SqliteRow) -> Result<AuditEvent, StoreError> {
    let id: i64 = row.get("id");
    let timestamp_str: String = row.get("timestamp");
    let action: String = row.get("action");
    let category: String = row.get("category");
    let description: String = row.get("description");
    let actor_kind: String = row.get("actor_kind");
    let actor_id: String = row.get("actor_id");
    let actor_email: Option<String> = row.get("actor_email");
    let actor_name: Option<String> = row.get("actor_name");
    let actor_role: Option<String> = row.get("actor_role");
    let actor_ip: Option<String> = row.get("actor_ip");
    let actor_user_agent: Option<String> = row.get("actor_user_agent");
    let target_kind: Option<String> = row.get("target_kind");
    let target_id: Option<String> = row.get("target_id");
    let target_email: Option<String> = row.get("target_email");
    let target_name: Option<String> = row.get("target_name");
    let action_data_str: Option<String> = row.get("action_data");
    let old_values_str: Option<String> = row.get("old_values");
    let new_values_str: Option<String> = row.get("new_values");
    let changes_str: Option<String> = row.get("changes");
    let success: i64 = row.get("success");
    let error_code: Option<String> = row.get("error_code");
    let error_message: Option<String> = row.get("error_message");
    let session_id: Option<String> = row.get("session_id");
    let request_id: Option<String> = row.get("request_id");
    let correlation_id: Option<String> = row.get("correlation_id");
    let risk_level: String = row.get("risk_level");
    let sensitive: i64 = row.get("sensitive");
    let retention: String = row.get("retention");
    let flagged: i64 = row.get("flagged");
    let flag_reason: Option<String> = row.get("flag_reason");
    let reviewed: i64 = row.get("reviewed");
    let review_notes: Option<String> = row.get("review_notes");
    let reviewed_by: Option<String> = row.get("reviewed_by");
    let reviewed_at_str: Option<String> = row.get("reviewed_at");
    let archived: i64 = row.get("archived");

    let timestamp = parse_datetime(&timestamp_str)?;
    let reviewed_at = parse_optional_datetime(reviewed_at_str)?;

    // Externally tagged ActionOutcome: "success" or {"failed": {...}}
    let outcome_val = if success != 0 {
        serde_json::Value::String("success".to_string())
    } else {
        serde_json::json!({
            "failed": {
                "code": error_code.unwrap_or_default(),
                "message": error_message.unwrap_or_default(),
            }
        })
    };

    let target_val = match target_kind {
        Some(ref kind) if !kind.is_empty() => serde_json::json!({
            "kind": kind,
            "id": target_id.unwrap_or_default(),
            "email": target_email,
            "name": target_name,
        }),
        _ => serde_json::Value::Null,
    };

    let reviewed_at_val = match reviewed_at {
        Some(dt) => serde_json::Value::String(dt.to_rfc3339()),
        None => serde_json::Value::Null,
    };

    // Reconstruct via JSON deserialization to preserve the stored
    // timestamp and classification
    let event_json = serde_json::json!({
        "id": id,
        "timestamp": timestamp.to_rfc3339(),
        "action": action,
        "category": category,
        "description": description,
        "actor": {
            "kind": actor_kind,
            "id": actor_id,
            "email": actor_email,
            "name": actor_name,
            "role": actor_role,
            "source_ip": actor_ip,
            "user_agent": actor_user_agent,
        },
        "target": target_val,
        "action_data": json_or_null(action_data_str),
        "old_values": json_or_null(old_values_str),
        "new_values": json_or_null(new_values_str),
        "changes": json_or_null(changes_str),
        "outcome": outcome_val,
        "session_id": session_id,
        "request_id": request_id,
        "correlation_id": correlation_id,
        "risk_level": risk_level,
        "sensitive": sensitive != 0,
        "retention": retention,
        "flagged": flagged != 0,
        "flag_reason": flag_reason,
        "reviewed": reviewed != 0,
        "review_notes": review_notes,
        "reviewed_by": reviewed_by,
        "reviewed_at": reviewed_at_val,
        "archived": archived != 0,
    });

    let event: AuditEvent = serde_json::from_value(event_json).map_err(|e| {
        StoreError::SerializationError(format!("Failed to reconstruct AuditEvent from row: {}", e))
    })?;

    Ok(event)
}

// ============================================================================
// IEventStore implementation
// ============================================================================

#[async_trait::async_trait]
impl IEventStore for SqliteEventStore {
    async fn append(&self, event: &AuditEvent) -> anyhow::Result<EventId> {
        let timestamp = fmt_ts(&event.timestamp());
        let actor = event.actor();
        let target = event.target();
        let action_data = serde_json::to_string(event.action_data())
            .map_err(|e| anyhow::anyhow!("Failed to serialize action_data: {}", e))?;
        let old_values = event
            .old_values()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Failed to serialize old_values: {}", e))?;
        let new_values = event
            .new_values()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Failed to serialize new_values: {}", e))?;
        let changes = event
            .changes()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Failed to serialize changes: {}", e))?;
        let reviewed_at = event.reviewed_at().map(|dt| fmt_ts(&dt));

        let result = sqlx::query(
            "INSERT INTO audit_events \
             (timestamp, action, category, description, \
              actor_kind, actor_id, actor_email, actor_name, actor_role, \
              actor_ip, actor_user_agent, \
              target_kind, target_id, target_email, target_name, \
              action_data, old_values, new_values, changes, \
              success, error_code, error_message, \
              session_id, request_id, correlation_id, \
              risk_level, sensitive, retention, \
              flagged, flag_reason, reviewed, review_notes, reviewed_by, \
              reviewed_at, archived) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
                     ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&timestamp)
        .bind(event.action())
        .bind(event.category().as_str())
        .bind(event.description())
        .bind(actor.kind.as_str())
        .bind(&actor.id)
        .bind(&actor.email)
        .bind(&actor.name)
        .bind(&actor.role)
        .bind(&actor.source_ip)
        .bind(&actor.user_agent)
        .bind(target.map(|t| t.kind.as_str()))
        .bind(target.map(|t| t.id.as_str()))
        .bind(target.and_then(|t| t.email.as_deref()))
        .bind(target.and_then(|t| t.name.as_deref()))
        .bind(&action_data)
        .bind(&old_values)
        .bind(&new_values)
        .bind(&changes)
        .bind(event.outcome().is_success() as i64)
        .bind(event.outcome().error_code())
        .bind(event.outcome().error_message())
        .bind(event.session_id())
        .bind(event.request_id())
        .bind(event.correlation_id())
        .bind(event.risk_level().as_str())
        .bind(event.sensitive() as i64)
        .bind(event.retention().as_str())
        .bind(event.flagged() as i64)
        .bind(event.flag_reason())
        .bind(event.reviewed() as i64)
        .bind(event.review_notes())
        .bind(event.reviewed_by())
        .bind(&reviewed_at)
        .bind(event.archived() as i64)
        .execute(&self.pool)
        .await?;

        let id = EventId::new(result.last_insert_rowid());
        tracing::trace!(event_id = %id, action = %event.action(), "Appended audit event");
        Ok(id)
    }

    async fn get(&self, id: EventId) -> anyhow::Result<Option<AuditEvent>> {
        let row = sqlx::query("SELECT * FROM audit_events WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(event_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        filter: &EventFilter,
        page: Page,
        order: Order,
    ) -> anyhow::Result<EventPage> {
        let page = Page::new(page.number.max(1), page.size.clamp(1, MAX_PAGE_SIZE));
        let total = self.count(filter).await?;
        let pagination = Pagination::new(page, total);

        let mut sql = String::from("SELECT * FROM audit_events WHERE 1=1");
        let mut binds: Vec<Bind> = Vec::new();
        push_filter(&mut sql, &mut binds, filter);

        sql.push_str(match order {
            Order::Desc => " ORDER BY timestamp DESC, id DESC",
            Order::Asc => " ORDER BY timestamp ASC, id ASC",
        });
        sql.push_str(" LIMIT ? OFFSET ?");

        let offset = u64::from(pagination.page - 1) * u64::from(pagination.limit);

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(s) => query.bind(s),
                Bind::Int(n) => query.bind(n),
            };
        }
        query = query.bind(pagination.limit as i64).bind(offset as i64);

        let rows = query.fetch_all(&self.pool).await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(event_from_row(row)?);
        }

        Ok(EventPage { events, pagination })
    }

    async fn count(&self, filter: &EventFilter) -> anyhow::Result<u64> {
        let mut sql = String::from("SELECT COUNT(*) AS count FROM audit_events WHERE 1=1");
        let mut binds: Vec<Bind> = Vec::new();
        push_filter(&mut sql, &mut binds, filter);

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = match bind {
                Bind::Text(s) => query.bind(s),
                Bind::Int(n) => query.bind(n),
            };
        }

        let row = query.fetch_one(&self.pool).await?;
        let count: i64 = row.get("count");
        Ok(count as u64)
    }

    async fn update_review(&self, id: EventId, review: &ReviewState) -> anyhow::Result<bool> {
        let reviewed_at = review.reviewed_at.as_ref().map(fmt_ts);

        let result = sqlx::query(
            "UPDATE audit_events SET flagged = ?, flag_reason = ?, reviewed = ?, \
             review_notes = ?, reviewed_by = ?, reviewed_at = ? WHERE id = ?",
        )
        .bind(review.flagged as i64)
        .bind(&review.flag_reason)
        .bind(review.reviewed as i64)
        .bind(&review.review_notes)
        .bind(&review.reviewed_by)
        .bind(&reviewed_at)
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        tracing::trace!(event_id = %id, "Updated review fields");
        Ok(result.rows_affected() > 0)
    }

    async fn recent_alerts(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<AuditEvent>> {
        let since_str = fmt_ts(&since);

        let rows = sqlx::query(
            "SELECT * FROM audit_events WHERE timestamp >= ? \
             AND (risk_level = 'critical' OR flagged = 1 \
                  OR (sensitive = 1 AND success = 0)) \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(&since_str)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in &rows {
            events.push(event_from_row(row)?);
        }

        Ok(events)
    }

    async fn cleanup(
        &self,
        cutoff: DateTime<Utc>,
        mode: CleanupMode,
        preserve_critical: bool,
    ) -> anyhow::Result<u64> {
        let cutoff_str = fmt_ts(&cutoff);

        let mut sql = match mode {
            CleanupMode::Archive => String::from(
                "UPDATE audit_events SET archived = 1 \
                 WHERE timestamp < ? AND archived = 0",
            ),
            CleanupMode::Delete => String::from("DELETE FROM audit_events WHERE timestamp < ?"),
        };
        if preserve_critical {
            sql.push_str(" AND risk_level != 'critical'");
        }

        let result = sqlx::query(&sql)
            .bind(&cutoff_str)
            .execute(&self.pool)
            .await?;

        let affected = result.rows_affected();
        tracing::debug!(mode = %mode, affected, "Retention cleanup completed");
        Ok(affected)
    }

    async fn bucket_series(
        &self,
        range: &TimeRange,
        granularity: Granularity,
    ) -> anyhow::Result<Vec<BucketStat>> {
        let bucket_fmt = match granularity {
            Granularity::Hour => "%Y-%m-%d %H:00",
            Granularity::Day => "%Y-%m-%d",
            Granularity::Month => "%Y-%m",
        };

        let mut sql = format!(
            "SELECT strftime('{bucket_fmt}', timestamp) AS bucket, \
             COUNT(*) AS total, \
             SUM(success) AS successful, \
             SUM(1 - success) AS failed, \
             SUM(sensitive) AS sensitive \
             FROM audit_events WHERE 1=1"
        );
        let mut binds: Vec<String> = Vec::new();
        push_range(&mut sql, &mut binds, range);
        sql.push_str(" GROUP BY bucket ORDER BY bucket ASC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut series = Vec::with_capacity(rows.len());
        for row in &rows {
            let total: i64 = row.get("total");
            let successful: i64 = row.get("successful");
            let failed: i64 = row.get("failed");
            let sensitive: i64 = row.get("sensitive");
            series.push(BucketStat {
                bucket: row.get("bucket"),
                total: total as u64,
                successful: successful as u64,
                failed: failed as u64,
                sensitive: sensitive as u64,
            });
        }

        Ok(series)
    }

    async fn category_breakdown(&self, range: &TimeRange) -> anyhow::Result<Vec<CategoryStat>> {
        let mut sql = String::from(
            "SELECT category, COUNT(*) AS total, SUM(success) AS successful \
             FROM audit_events WHERE 1=1",
        );
        let mut binds: Vec<String> = Vec::new();
        push_range(&mut sql, &mut binds, range);
        sql.push_str(" GROUP BY category ORDER BY total DESC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut breakdown = Vec::with_capacity(rows.len());
        for row in &rows {
            let category_str: String = row.get("category");
            let category = category_str.parse().map_err(|e| {
                StoreError::SerializationError(format!(
                    "Invalid category '{}': {}",
                    category_str, e
                ))
            })?;
            let total: i64 = row.get("total");
            let successful: i64 = row.get("successful");
            breakdown.push(CategoryStat {
                category,
                total: total as u64,
                successful: successful as u64,
            });
        }

        Ok(breakdown)
    }

    async fn risk_breakdown(&self, range: &TimeRange) -> anyhow::Result<Vec<RiskStat>> {
        let mut sql = String::from(
            "SELECT risk_level, COUNT(*) AS total, SUM(flagged) AS flagged \
             FROM audit_events WHERE 1=1",
        );
        let mut binds: Vec<String> = Vec::new();
        push_range(&mut sql, &mut binds, range);
        sql.push_str(" GROUP BY risk_level ORDER BY total DESC");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut breakdown = Vec::with_capacity(rows.len());
        for row in &rows {
            let risk_str: String = row.get("risk_level");
            let risk_level = risk_str.parse().map_err(|e| {
                StoreError::SerializationError(format!("Invalid risk level '{}': {}", risk_str, e))
            })?;
            let total: i64 = row.get("total");
            let flagged: i64 = row.get("flagged");
            breakdown.push(RiskStat {
                risk_level,
                total: total as u64,
                flagged: flagged as u64,
            });
        }

        Ok(breakdown)
    }

    async fn top_actors(&self, range: &TimeRange, limit: u32) -> anyhow::Result<Vec<ActorStat>> {
        // Bare actor_name resolves from the MAX(timestamp) row (SQLite
        // aggregate rule), so the newest name snapshot wins.
        let mut sql = String::from(
            "SELECT actor_id, actor_name, COUNT(*) AS total, \
             MAX(timestamp) AS last_action, \
             SUM(CASE WHEN risk_level IN ('high', 'critical') THEN 1 ELSE 0 END) AS elevated \
             FROM audit_events WHERE 1=1",
        );
        let mut binds: Vec<String> = Vec::new();
        push_range(&mut sql, &mut binds, range);
        sql.push_str(" GROUP BY actor_id ORDER BY total DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        query = query.bind(limit as i64);

        let rows = query.fetch_all(&self.pool).await?;

        let mut actors = Vec::with_capacity(rows.len());
        for row in &rows {
            let last_action_str: String = row.get("last_action");
            let total: i64 = row.get("total");
            let elevated: i64 = row.get("elevated");
            actors.push(ActorStat {
                actor_id: row.get("actor_id"),
                actor_name: row.get("actor_name"),
                total: total as u64,
                last_action: parse_datetime(&last_action_str)?,
                elevated: elevated as u64,
            });
        }

        Ok(actors)
    }
}
