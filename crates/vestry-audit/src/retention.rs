//! RetentionService - scheduled archive/delete of aged audit events
//!
//! Turns a day-count policy into a concrete cutoff and runs the store's
//! batch operation. The affected count in the report is the number of rows
//! actually touched, which a caller-facing surface must echo back.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use vestry_core::domain::DomainError;
use vestry_core::ports::{CleanupMode, IEventStore};

/// Outcome of one retention cleanup run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    /// Events strictly older than this instant were in scope
    pub cutoff: DateTime<Utc>,
    /// Whether events were archived or deleted
    pub mode: CleanupMode,
    /// Whether critical events were exempt
    pub preserve_critical: bool,
    /// Rows actually archived or deleted
    pub affected: u64,
}

/// Runs retention cleanup against the event store.
pub struct RetentionService {
    store: Arc<dyn IEventStore>,
}

impl RetentionService {
    /// Creates a retention service backed by the given store.
    pub fn new(store: Arc<dyn IEventStore>) -> Self {
        Self { store }
    }

    /// Archives or deletes events older than `older_than_days` days.
    ///
    /// `older_than_days` must be at least 1; a zero cutoff would sweep
    /// current events. With `preserve_critical`, critical events stay
    /// untouched in either mode.
    pub async fn cleanup(
        &self,
        older_than_days: u32,
        mode: CleanupMode,
        preserve_critical: bool,
    ) -> anyhow::Result<CleanupReport> {
        if older_than_days == 0 {
            return Err(DomainError::validation("older_than_days", "must be at least 1").into());
        }

        let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
        let affected = self
            .store
            .cleanup(cutoff, mode, preserve_critical)
            .await
            .context("Failed to run retention cleanup")?;

        tracing::info!(
            mode = mode.as_str(),
            older_than_days,
            preserve_critical,
            affected,
            "Retention cleanup finished"
        );

        Ok(CleanupReport {
            cutoff,
            mode,
            preserve_critical,
            affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use vestry_core::domain::{
        ActionCategory, ActionOutcome, Actor, ActorKind, AuditEvent, DraftEvent, EventId,
    };
    use vestry_store::{DatabasePool, SqliteEventStore};

    use super::*;

    async fn setup() -> (Arc<SqliteEventStore>, RetentionService) {
        let pool = DatabasePool::in_memory().await.unwrap();
        let store = Arc::new(SqliteEventStore::new(pool.pool().clone()));
        let service = RetentionService::new(store.clone());
        (store, service)
    }

    /// Rewrites the creation timestamp so tests can place events in the past.
    fn backdate(event: &AuditEvent, ts: DateTime<Utc>) -> AuditEvent {
        let mut value = serde_json::to_value(event).unwrap();
        value["timestamp"] = serde_json::to_value(ts).unwrap();
        serde_json::from_value(value).unwrap()
    }

    async fn seed_at(store: &SqliteEventStore, action: &str, age_days: i64) -> EventId {
        let event = AuditEvent::from_draft(DraftEvent::new(
            action,
            ActionCategory::UserManagement,
            format!("test: {action}"),
            Actor::new(ActorKind::Admin, "adm-1"),
            ActionOutcome::success(),
        ));
        let event = backdate(&event, Utc::now() - Duration::days(age_days));
        store.append(&event).await.unwrap()
    }

    #[tokio::test]
    async fn test_cleanup_rejects_zero_days() {
        let (_store, service) = setup().await;

        let err = service
            .cleanup(0, CleanupMode::Delete, true)
            .await
            .unwrap_err();
        let domain = err.downcast_ref::<DomainError>().unwrap();
        assert!(matches!(domain, DomainError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_archive_preserves_critical() {
        let (store, service) = setup().await;
        let old_routine = seed_at(&store, "update_user", 400).await;
        let old_critical = seed_at(&store, "hard_delete_user", 400).await;
        let recent = seed_at(&store, "update_user", 10).await;

        let report = service
            .cleanup(365, CleanupMode::Archive, true)
            .await
            .unwrap();
        assert_eq!(report.affected, 1);

        assert!(store.get(old_routine).await.unwrap().unwrap().archived());
        assert!(!store.get(old_critical).await.unwrap().unwrap().archived());
        assert!(!store.get(recent).await.unwrap().unwrap().archived());
    }

    #[tokio::test]
    async fn test_delete_without_preserve_removes_all_old_events() {
        let (store, service) = setup().await;
        let old_routine = seed_at(&store, "update_user", 400).await;
        let old_critical = seed_at(&store, "hard_delete_user", 400).await;
        let recent = seed_at(&store, "update_user", 10).await;

        let report = service
            .cleanup(365, CleanupMode::Delete, false)
            .await
            .unwrap();
        assert_eq!(report.affected, 2);

        assert!(store.get(old_routine).await.unwrap().is_none());
        assert!(store.get(old_critical).await.unwrap().is_none());
        assert!(store.get(recent).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rerun_affects_nothing_new() {
        let (store, service) = setup().await;
        seed_at(&store, "update_user", 400).await;

        let first = service
            .cleanup(365, CleanupMode::Archive, true)
            .await
            .unwrap();
        assert_eq!(first.affected, 1);

        let second = service
            .cleanup(365, CleanupMode::Archive, true)
            .await
            .unwrap();
        assert_eq!(second.affected, 0);
    }

    #[tokio::test]
    async fn test_report_echoes_parameters() {
        let (_store, service) = setup().await;

        let report = service
            .cleanup(45, CleanupMode::Delete, true)
            .await
            .unwrap();

        assert_eq!(report.mode, CleanupMode::Delete);
        assert!(report.preserve_critical);
        assert_eq!(report.affected, 0);

        let expected = Utc::now() - Duration::days(45);
        assert!((expected - report.cutoff).num_seconds().abs() < 5);
    }
}
