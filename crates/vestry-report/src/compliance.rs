//! Compliance reporting over a date range
//!
//! The score formula is a fixed heuristic: `max(0, 100 - 5*critical -
//! 2*flagged)`. It must stay exactly this so reports are reproducible
//! across versions; tuning it is a policy change, not a refactor.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use vestry_core::domain::RiskLevel;
use vestry_core::ports::{EventFilter, IEventStore, TimeRange};

/// Compliance counts, score, and recommendations for one period
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    pub period: TimeRange,
    pub total_logs: u64,
    pub critical_events: u64,
    pub sensitive_actions: u64,
    pub failed_actions: u64,
    pub flagged_events: u64,
    /// `max(0, 100 - 5*critical_events - 2*flagged_events)`
    pub compliance_score: u32,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Generates compliance reports.
pub struct ComplianceService {
    store: Arc<dyn IEventStore>,
}

impl ComplianceService {
    /// Creates a compliance service backed by the given store.
    pub fn new(store: Arc<dyn IEventStore>) -> Self {
        Self { store }
    }

    /// Computes the compliance report for a period.
    pub async fn report(&self, period: TimeRange) -> Result<ComplianceReport> {
        let base = EventFilter::new().with_range(period);

        let total_logs = self.count(base.clone()).await?;
        let critical_events = self
            .count(base.clone().with_risk_level(RiskLevel::Critical))
            .await?;
        let sensitive_actions = self.count(base.clone().with_sensitive(true)).await?;
        let failed_actions = self.count(base.clone().with_success(false)).await?;
        let flagged_events = self.count(base.with_flagged(true)).await?;

        let penalty = critical_events
            .saturating_mul(5)
            .saturating_add(flagged_events.saturating_mul(2));
        let compliance_score = 100u64.saturating_sub(penalty) as u32;

        let recommendations = recommendations(
            critical_events,
            flagged_events,
            failed_actions,
            sensitive_actions,
        );

        Ok(ComplianceReport {
            period,
            total_logs,
            critical_events,
            sensitive_actions,
            failed_actions,
            flagged_events,
            compliance_score,
            recommendations,
            generated_at: Utc::now(),
        })
    }

    async fn count(&self, filter: EventFilter) -> Result<u64> {
        self.store
            .count(&filter)
            .await
            .context("Failed to count events for compliance report")
    }
}

/// The fixed conditional recommendation set.
fn recommendations(critical: u64, flagged: u64, failed: u64, sensitive: u64) -> Vec<String> {
    let mut recs = Vec::new();
    if critical > 0 {
        recs.push("Review all critical events and confirm each was authorized.".to_string());
    }
    if flagged > 0 {
        recs.push("Investigate flagged events that are still awaiting review.".to_string());
    }
    if failed > 0 {
        recs.push(
            "Check failed actions for repeated permission or authentication errors.".to_string(),
        );
    }
    if sensitive > 0 {
        recs.push("Verify that sensitive data accesses had a documented purpose.".to_string());
    }
    if recs.is_empty() {
        recs.push("No compliance issues detected in this period.".to_string());
    }
    recs
}

#[cfg(test)]
mod tests {
    use vestry_core::domain::{
        ActionCategory, ActionOutcome, Actor, ActorKind, AuditEvent, DraftEvent,
    };
    use vestry_core::ports::ReviewState;
    use vestry_store::{DatabasePool, SqliteEventStore};

    use super::*;

    async fn setup() -> (Arc<SqliteEventStore>, ComplianceService) {
        let pool = DatabasePool::in_memory().await.unwrap();
        let store = Arc::new(SqliteEventStore::new(pool.pool().clone()));
        let service = ComplianceService::new(store.clone());
        (store, service)
    }

    async fn seed(store: &SqliteEventStore, action: &str, outcome: ActionOutcome) -> AuditEvent {
        let event = AuditEvent::from_draft(DraftEvent::new(
            action,
            ActionCategory::UserManagement,
            format!("test: {action}"),
            Actor::new(ActorKind::Admin, "adm-1"),
            outcome,
        ));
        let id = store.append(&event).await.unwrap();
        event.with_id(id)
    }

    #[tokio::test]
    async fn test_score_three_critical_one_flagged_is_83() {
        let (store, service) = setup().await;
        for _ in 0..3 {
            seed(&store, "hard_delete_user", ActionOutcome::success()).await;
        }
        let routine = seed(&store, "update_user", ActionOutcome::success()).await;
        let mut flagged = routine.clone();
        flagged.flag("odd", "adm-2").unwrap();
        store
            .update_review(routine.id().unwrap(), &ReviewState::of(&flagged))
            .await
            .unwrap();

        let report = service.report(TimeRange::default()).await.unwrap();

        assert_eq!(report.total_logs, 4);
        assert_eq!(report.critical_events, 3);
        assert_eq!(report.flagged_events, 1);
        assert_eq!(report.compliance_score, 83);
    }

    #[tokio::test]
    async fn test_score_floors_at_zero() {
        let (store, service) = setup().await;
        for _ in 0..25 {
            seed(&store, "hard_delete_user", ActionOutcome::success()).await;
        }

        let report = service.report(TimeRange::default()).await.unwrap();

        assert_eq!(report.critical_events, 25);
        assert_eq!(report.compliance_score, 0);
    }

    #[tokio::test]
    async fn test_clean_period_scores_100() {
        let (store, service) = setup().await;
        seed(&store, "update_user", ActionOutcome::success()).await;

        let report = service.report(TimeRange::default()).await.unwrap();

        assert_eq!(report.compliance_score, 100);
        assert_eq!(
            report.recommendations,
            vec!["No compliance issues detected in this period.".to_string()]
        );
    }

    #[tokio::test]
    async fn test_counts_cover_all_dimensions() {
        let (store, service) = setup().await;
        seed(&store, "hard_delete_user", ActionOutcome::success()).await;
        seed(&store, "export_user_data", ActionOutcome::success()).await; // sensitive
        seed(
            &store,
            "update_user",
            ActionOutcome::failed("VALIDATION", "bad email"),
        )
        .await;

        let report = service.report(TimeRange::default()).await.unwrap();

        assert_eq!(report.total_logs, 3);
        assert_eq!(report.critical_events, 1);
        assert_eq!(report.sensitive_actions, 1);
        assert_eq!(report.failed_actions, 1);
        assert_eq!(report.flagged_events, 0);
        // 100 - 5*1 - 2*0
        assert_eq!(report.compliance_score, 95);
    }

    #[test]
    fn test_recommendations_are_conditional() {
        let recs = recommendations(1, 0, 0, 0);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("critical"));

        let recs = recommendations(1, 1, 1, 1);
        assert_eq!(recs.len(), 4);

        let recs = recommendations(0, 0, 0, 0);
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("No compliance issues"));
    }

    #[tokio::test]
    async fn test_period_bounds_restrict_counts() {
        let (store, service) = setup().await;
        seed(&store, "hard_delete_user", ActionOutcome::success()).await;

        // A window ending before any event existed
        let past = TimeRange::new(None, Some(Utc::now() - chrono::Duration::days(30)));
        let report = service.report(past).await.unwrap();

        assert_eq!(report.total_logs, 0);
        assert_eq!(report.compliance_score, 100);
    }
}
