//! AuditRecorder - the single write path for audit events
//!
//! Wraps `IEventStore::append()` behind [`AuditRecorder::log_action`] and
//! convenience methods for common call sites. Recording is non-fatal: a
//! store failure is logged via `tracing::warn!` and surfaces as `None`,
//! never as an error, so audit persistence can never break the operation
//! being audited. Alerts fire only after a successful write.

use std::sync::Arc;

use serde_json::json;
use vestry_core::domain::{
    ActionCategory, ActionOutcome, Actor, AuditEvent, DraftEvent, EventId, Target, TargetKind,
};
use vestry_core::ports::{CleanupMode, IEventStore, SecurityAlert};

use crate::dispatch::AlertDispatcher;

/// High-level recorder that finalizes drafts, persists them, and raises
/// security alerts for elevated or sensitive actions.
pub struct AuditRecorder {
    store: Arc<dyn IEventStore>,
    dispatcher: AlertDispatcher,
}

impl AuditRecorder {
    /// Creates a recorder backed by the given store and alert dispatcher.
    pub fn new(store: Arc<dyn IEventStore>, dispatcher: AlertDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Finalizes and persists a draft, returning the stored event.
    ///
    /// Returns `None` when the write fails; the failure is logged and
    /// swallowed. On success, elevated or sensitive events are offered to
    /// the alert dispatcher before this method returns.
    pub async fn log_action(&self, draft: DraftEvent) -> Option<AuditEvent> {
        let event = AuditEvent::from_draft(draft);

        let event = match self.store.append(&event).await {
            Ok(id) => event.with_id(id),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    action = %event.action(),
                    actor_id = %event.actor().id,
                    "Failed to save audit event"
                );
                return None;
            }
        };

        if event.requires_alert() {
            self.dispatcher
                .dispatch(&SecurityAlert::for_event(&event))
                .await;
        }

        Some(event)
    }

    // ========================================================================
    // Convenience call sites
    // ========================================================================

    /// Records a successful action.
    pub async fn log_success(
        &self,
        action: impl Into<String>,
        category: ActionCategory,
        description: impl Into<String>,
        actor: Actor,
    ) -> Option<AuditEvent> {
        self.log_action(DraftEvent::new(
            action,
            category,
            description,
            actor,
            ActionOutcome::success(),
        ))
        .await
    }

    /// Records a failed action with its error code and message.
    pub async fn log_failure(
        &self,
        action: impl Into<String>,
        category: ActionCategory,
        description: impl Into<String>,
        actor: Actor,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Option<AuditEvent> {
        self.log_action(DraftEvent::new(
            action,
            category,
            description,
            actor,
            ActionOutcome::failed(code, message),
        ))
        .await
    }

    // ========================================================================
    // Self-audit: the audit surface audits its own mutations
    // ========================================================================

    /// Records that an admin flagged an audit event.
    pub async fn log_flag_event(
        &self,
        actor: Actor,
        event_id: EventId,
        reason: &str,
    ) -> Option<AuditEvent> {
        let draft = DraftEvent::new(
            "flag_audit_log",
            ActionCategory::Security,
            format!("Flagged audit event {} for review", event_id.as_i64()),
            actor,
            ActionOutcome::success(),
        )
        .with_target(Target::new(TargetKind::Data, event_id.as_i64().to_string()))
        .with_action_data(json!({ "reason": reason }));
        self.log_action(draft).await
    }

    /// Records that an admin reviewed an audit event.
    pub async fn log_review_event(&self, actor: Actor, event_id: EventId) -> Option<AuditEvent> {
        let draft = DraftEvent::new(
            "review_audit_log",
            ActionCategory::Security,
            format!("Reviewed audit event {}", event_id.as_i64()),
            actor,
            ActionOutcome::success(),
        )
        .with_target(Target::new(TargetKind::Data, event_id.as_i64().to_string()));
        self.log_action(draft).await
    }

    /// Records a retention cleanup run and its affected count.
    pub async fn log_cleanup_run(
        &self,
        actor: Actor,
        mode: CleanupMode,
        older_than_days: u32,
        affected: u64,
    ) -> Option<AuditEvent> {
        let draft = DraftEvent::new(
            "cleanup_audit_logs",
            ActionCategory::Maintenance,
            format!(
                "Retention cleanup ({}) of events older than {older_than_days} days",
                mode.as_str()
            ),
            actor,
            ActionOutcome::success(),
        )
        .with_action_data(json!({
            "mode": mode.as_str(),
            "older_than_days": older_than_days,
            "affected": affected,
        }));
        self.log_action(draft).await
    }

    /// Records an audit log export and how many events it covered.
    pub async fn log_export(&self, actor: Actor, format: &str, count: u64) -> Option<AuditEvent> {
        let draft = DraftEvent::new(
            "export_audit_logs",
            ActionCategory::DataExport,
            format!("Exported {count} audit events as {format}"),
            actor,
            ActionOutcome::success(),
        )
        .with_action_data(json!({ "format": format, "events": count }));
        self.log_action(draft).await
    }
}
