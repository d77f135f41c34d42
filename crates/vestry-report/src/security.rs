//! Security event feed and alerting queries
//!
//! The feed lists events whose risk level is in a caller-supplied set
//! (defaulting to high and critical), optionally restricted to flagged
//! events, inside an optional window. The summary block's sub-counts
//! refine the same selection: with a narrowed level set, levels outside
//! it count as zero.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use serde::Serialize;
use vestry_core::domain::{AuditEvent, DomainError, RiskLevel};
use vestry_core::ports::{
    EventFilter, IEventStore, Order, Page, Pagination, TimeRange, MAX_PAGE_SIZE,
};

/// Level set used when the caller supplies none.
pub const DEFAULT_SECURITY_LEVELS: &[RiskLevel] = &[RiskLevel::High, RiskLevel::Critical];

/// Triage counts accompanying a security feed or log listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecuritySummary {
    /// Events matching the selection
    pub total: u64,
    pub critical: u64,
    pub high: u64,
    pub flagged: u64,
    /// High/critical events nobody has reviewed yet
    pub unreviewed_elevated: u64,
}

/// One page of the security feed plus its summary block
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvents {
    pub events: Vec<AuditEvent>,
    pub pagination: Pagination,
    pub summary: SecuritySummary,
}

/// Serves the security feed, window summaries, and the alerts feed.
pub struct SecurityService {
    store: Arc<dyn IEventStore>,
}

impl SecurityService {
    /// Creates a security service backed by the given store.
    pub fn new(store: Arc<dyn IEventStore>) -> Self {
        Self { store }
    }

    /// Lists security events, newest first, with the summary block.
    ///
    /// An empty `levels` means [`DEFAULT_SECURITY_LEVELS`]. With
    /// `flagged_only`, every count in the summary is also restricted to
    /// flagged events.
    pub async fn security_events(
        &self,
        levels: Vec<RiskLevel>,
        flagged_only: bool,
        range: TimeRange,
        page: Page,
    ) -> Result<SecurityEvents> {
        let levels = if levels.is_empty() {
            DEFAULT_SECURITY_LEVELS.to_vec()
        } else {
            levels
        };

        let mut base = EventFilter::new().with_range(range);
        if flagged_only {
            base = base.with_flagged(true);
        }
        let selection = base.clone().with_risk_levels(levels.clone());

        let events = self
            .store
            .list(&selection, page, Order::Desc)
            .await
            .context("Failed to list security events")?;
        let summary = self
            .summarize(&base, &levels, events.pagination.total)
            .await?;

        Ok(SecurityEvents {
            events: events.events,
            pagination: events.pagination,
            summary,
        })
    }

    /// Triage counts for a time window, unrestricted by level selection.
    ///
    /// Used by the log listing surface, where the events themselves obey an
    /// arbitrary filter but the summary describes the window.
    pub async fn window_summary(&self, range: TimeRange) -> Result<SecuritySummary> {
        let base = EventFilter::new().with_range(range);
        let total = self
            .store
            .count(&base)
            .await
            .context("Failed to count events in window")?;
        self.summarize(&base, DEFAULT_SECURITY_LEVELS, total).await
    }

    /// Events from the last `hours` hours that are critical, flagged, or
    /// sensitive-and-failed, newest first.
    pub async fn recent_alerts(&self, hours: u32, limit: u32) -> Result<Vec<AuditEvent>> {
        if hours == 0 {
            return Err(DomainError::validation("hours", "must be at least 1").into());
        }
        let since = Utc::now() - Duration::hours(i64::from(hours));
        self.store
            .recent_alerts(since, limit.clamp(1, MAX_PAGE_SIZE))
            .await
            .context("Failed to load recent alerts")
    }

    async fn summarize(
        &self,
        base: &EventFilter,
        levels: &[RiskLevel],
        total: u64,
    ) -> Result<SecuritySummary> {
        let critical = if levels.contains(&RiskLevel::Critical) {
            self.count(base.clone().with_risk_levels(vec![RiskLevel::Critical]))
                .await?
        } else {
            0
        };
        let high = if levels.contains(&RiskLevel::High) {
            self.count(base.clone().with_risk_levels(vec![RiskLevel::High]))
                .await?
        } else {
            0
        };
        let flagged = self.count(base.clone().with_flagged(true)).await?;

        let elevated: Vec<RiskLevel> = levels.iter().copied().filter(RiskLevel::is_elevated).collect();
        let unreviewed_elevated = if elevated.is_empty() {
            0
        } else {
            self.count(base.clone().with_risk_levels(elevated).with_reviewed(false))
                .await?
        };

        Ok(SecuritySummary {
            total,
            critical,
            high,
            flagged,
            unreviewed_elevated,
        })
    }

    async fn count(&self, filter: EventFilter) -> Result<u64> {
        self.store
            .count(&filter)
            .await
            .context("Failed to count events for summary")
    }
}
