//! Event store port (driven/secondary port)
//!
//! This module defines the interface for appending and querying audit
//! events, the composable filter, and the shapes returned by list and
//! aggregation operations.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, future backends) and don't need domain-level classification.
//! - `EventFilter` composes with AND logic; the alerts feed has its own
//!   method because its predicate is an OR across dimensions.
//! - Aggregations live on the same trait rather than on small sibling
//!   traits; implementations may delegate internally.
//! - The store never recomputes derived fields: `append` persists what the
//!   entity carries, reads reconstruct it verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    classifier::RiskLevel,
    errors::DomainError,
    event::{ActionCategory, AuditEvent, TargetKind},
    newtypes::EventId,
};

/// Default page size for list queries.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Upper bound on page size; larger requests are clamped by adapters.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Filter criteria for querying audit events
///
/// All fields are optional; when unset, no filtering is applied for that
/// dimension. Set fields are combined with AND logic. `risk_levels` is a
/// set membership test; an empty vector means unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Events at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Events at or before this instant
    pub to: Option<DateTime<Utc>>,
    /// Filter by actor id
    pub actor_id: Option<String>,
    /// Filter by target id
    pub target_id: Option<String>,
    /// Filter by target kind
    pub target_kind: Option<TargetKind>,
    /// Case-insensitive substring match on the action name
    pub action: Option<String>,
    /// Filter by action category
    pub category: Option<ActionCategory>,
    /// Set membership on risk level (empty = all levels)
    pub risk_levels: Vec<RiskLevel>,
    /// Filter by outcome success
    pub success: Option<bool>,
    /// Filter by flagged state
    pub flagged: Option<bool>,
    /// Filter by reviewed state
    pub reviewed: Option<bool>,
    /// Filter by sensitivity flag
    pub sensitive: Option<bool>,
    /// Filter by actor source IP
    pub actor_ip: Option<String>,
    /// Filter by archived state
    pub archived: Option<bool>,
}

impl EventFilter {
    /// Creates a new empty filter (matches all events)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Applies both bounds of `range`; an unset bound clears the
    /// corresponding filter field.
    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.from = range.from;
        self.to = range.to;
        self
    }

    pub fn with_actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_target(mut self, kind: TargetKind, target_id: impl Into<String>) -> Self {
        self.target_kind = Some(kind);
        self.target_id = Some(target_id.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_category(mut self, category: ActionCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Restricts to a single risk level (appends to the membership set).
    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_levels.push(level);
        self
    }

    /// Replaces the risk level membership set.
    pub fn with_risk_levels(mut self, levels: Vec<RiskLevel>) -> Self {
        self.risk_levels = levels;
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn with_flagged(mut self, flagged: bool) -> Self {
        self.flagged = Some(flagged);
        self
    }

    pub fn with_reviewed(mut self, reviewed: bool) -> Self {
        self.reviewed = Some(reviewed);
        self
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = Some(sensitive);
        self
    }

    pub fn with_actor_ip(mut self, ip: impl Into<String>) -> Self {
        self.actor_ip = Some(ip.into());
        self
    }

    pub fn with_archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    /// Returns true if no filters are set
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Sort direction on the timestamp column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    /// Newest first (the default everywhere)
    #[default]
    Desc,
    /// Oldest first
    Asc,
}

/// Page request for list queries (1-based page number)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Pagination summary returned alongside a page of events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Pagination {
    /// Computes the pagination summary for a total match count.
    pub fn new(page: Page, total: u64) -> Self {
        let limit = page.size.max(1);
        let total_pages = ((total + u64::from(limit) - 1) / u64::from(limit)) as u32;
        Self {
            page: page.number.max(1),
            limit,
            total,
            total_pages,
        }
    }
}

/// One page of events plus its pagination summary
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<AuditEvent>,
    pub pagination: Pagination,
}

/// Snapshot of the mutable review-workflow fields of an event
///
/// The store overwrites all six columns at once; last write wins when
/// reviews race, which is the accepted semantics for advisory annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewState {
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub reviewed: bool,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewState {
    /// Extracts the review fields from an event.
    pub fn of(event: &AuditEvent) -> Self {
        Self {
            flagged: event.flagged(),
            flag_reason: event.flag_reason().map(str::to_string),
            reviewed: event.reviewed(),
            review_notes: event.review_notes().map(str::to_string),
            reviewed_by: event.reviewed_by().map(str::to_string),
            reviewed_at: event.reviewed_at(),
        }
    }
}

/// What retention cleanup does with matching events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// Mark matching events archived
    Archive,
    /// Remove matching events
    Delete,
}

impl CleanupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupMode::Archive => "archive",
            CleanupMode::Delete => "delete",
        }
    }
}

impl std::fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CleanupMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive" => Ok(CleanupMode::Archive),
            "delete" => Ok(CleanupMode::Delete),
            other => Err(DomainError::validation(
                "mode",
                format!("unknown cleanup mode '{other}'; valid: archive, delete"),
            )),
        }
    }
}

/// Bucketing granularity for the statistics time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hour,
    Day,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Month => "month",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Granularity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            other => Err(DomainError::InvalidGranularity(other.to_string())),
        }
    }
}

/// Optional inclusive time bounds for aggregation queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// Range open on the right, starting at `from`.
    pub fn since(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }
}

/// One time bucket of the statistics series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStat {
    /// Bucket label, e.g. `2026-08-25` for day granularity
    pub bucket: String,
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub sensitive: u64,
}

/// Per-category counts for the statistics breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStat {
    pub category: ActionCategory,
    pub total: u64,
    pub successful: u64,
}

/// Per-risk-level counts for the statistics breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskStat {
    pub risk_level: RiskLevel,
    pub total: u64,
    pub flagged: u64,
}

/// One row of the top-actors breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorStat {
    pub actor_id: String,
    pub actor_name: Option<String>,
    pub total: u64,
    pub last_action: DateTime<Utc>,
    /// Actions at high or critical risk attributed to this actor
    pub elevated: u64,
}

/// Port trait for append-only audit event storage
///
/// This is the single persistence interface of the audit subsystem. It
/// covers the append path, point lookups, filtered listing with counts,
/// the review-field update, the alerts feed, retention cleanup, and the
/// aggregations behind the statistics surface.
///
/// ## Implementation Notes
///
/// - `append` assigns and returns the event id; the caller attaches it via
///   `AuditEvent::with_id`.
/// - `update_review` overwrites all review fields in one statement and
///   returns whether a row matched (single-document atomicity is enough).
/// - `cleanup` must report the count actually affected, not the requested
///   scope.
#[async_trait::async_trait]
pub trait IEventStore: Send + Sync {
    /// Appends an event, returning the assigned id.
    async fn append(&self, event: &AuditEvent) -> anyhow::Result<EventId>;

    /// Retrieves an event by id.
    async fn get(&self, id: EventId) -> anyhow::Result<Option<AuditEvent>>;

    /// Lists events matching the filter, sorted by timestamp.
    async fn list(
        &self,
        filter: &EventFilter,
        page: Page,
        order: Order,
    ) -> anyhow::Result<EventPage>;

    /// Counts events matching the filter.
    async fn count(&self, filter: &EventFilter) -> anyhow::Result<u64>;

    /// Overwrites the review-workflow fields of one event.
    ///
    /// Returns false when no event with that id exists.
    async fn update_review(&self, id: EventId, review: &ReviewState) -> anyhow::Result<bool>;

    /// Events since `since` that are critical, flagged, or sensitive-and-
    /// failed, newest first, capped at `limit`.
    async fn recent_alerts(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<AuditEvent>>;

    /// Archives or deletes events older than `cutoff`, optionally keeping
    /// critical ones, returning the count affected.
    async fn cleanup(
        &self,
        cutoff: DateTime<Utc>,
        mode: CleanupMode,
        preserve_critical: bool,
    ) -> anyhow::Result<u64>;

    /// Time series of event counts bucketed at the given granularity.
    async fn bucket_series(
        &self,
        range: &TimeRange,
        granularity: Granularity,
    ) -> anyhow::Result<Vec<BucketStat>>;

    /// Event counts grouped by action category, most active first.
    async fn category_breakdown(&self, range: &TimeRange) -> anyhow::Result<Vec<CategoryStat>>;

    /// Event counts grouped by risk level.
    async fn risk_breakdown(&self, range: &TimeRange) -> anyhow::Result<Vec<RiskStat>>;

    /// The most active actors in the window, busiest first.
    async fn top_actors(&self, range: &TimeRange, limit: u32) -> anyhow::Result<Vec<ActorStat>>;
}
