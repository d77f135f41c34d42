//! Security alert port (driven/secondary port)
//!
//! This module defines the interface for pushing security alerts raised by
//! the audit write path. Implementations may log through tracing, post to
//! a webhook, or fan out to an on-call system.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery failures are adapter-specific.
//! - Alerts are fire-and-forget; the dispatcher bounds each delivery with
//!   a timeout and a failed channel never propagates into the caller.
//! - `SecurityAlert` is a flattened snapshot of the event, so channels
//!   don't need the domain entity to render a message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    classifier::RiskLevel,
    event::{ActionCategory, AuditEvent},
    newtypes::EventId,
};

/// A security alert derived from one audit event
///
/// Raised when an event is high/critical risk or touches a sensitive
/// action. Carries enough context for a channel to render a useful
/// message without a store round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAlert {
    /// Id of the triggering event, when the store assigned one
    pub event_id: Option<EventId>,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub category: ActionCategory,
    pub description: String,
    pub risk_level: RiskLevel,
    pub sensitive: bool,
    pub actor_id: String,
    pub actor_name: Option<String>,
    pub actor_ip: Option<String>,
    /// `kind:id` of the target, when the event has one
    pub target: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl SecurityAlert {
    /// Builds the alert snapshot for an event.
    pub fn for_event(event: &AuditEvent) -> Self {
        Self {
            event_id: event.id(),
            timestamp: event.timestamp(),
            action: event.action().to_string(),
            category: event.category(),
            description: event.description().to_string(),
            risk_level: event.risk_level(),
            sensitive: event.sensitive(),
            actor_id: event.actor().id.clone(),
            actor_name: event.actor().name.clone(),
            actor_ip: event.actor().source_ip.clone(),
            target: event
                .target()
                .map(|t| format!("{}:{}", t.kind, t.id)),
            success: event.outcome().is_success(),
            error_message: event.outcome().error_message().map(str::to_string),
        }
    }

    /// One-line summary suitable for a log or notification title.
    pub fn headline(&self) -> String {
        let outcome = if self.success { "succeeded" } else { "failed" };
        format!(
            "[{}] {} by {} {}",
            self.risk_level, self.action, self.actor_id, outcome
        )
    }
}

/// Port trait for one alert delivery channel
///
/// ## Implementation Notes
///
/// - `name` identifies the channel in logs and metrics labels.
/// - `deliver` should do its own formatting; the dispatcher passes every
///   alert to every configured channel.
/// - Implementations must not retry internally; the dispatcher's timeout
///   bounds the whole call.
#[async_trait::async_trait]
pub trait IAlertChannel: Send + Sync {
    /// Stable channel identifier, e.g. `"tracing"`
    fn name(&self) -> &'static str;

    /// Delivers one alert
    async fn deliver(&self, alert: &SecurityAlert) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use crate::domain::event::{ActionOutcome, Actor, ActorKind, DraftEvent, Target, TargetKind};

    use super::*;

    fn sample_event() -> AuditEvent {
        let actor = Actor::new(ActorKind::Admin, "adm-1")
            .with_name("Ruth")
            .with_source_ip("10.0.0.8");
        let draft = DraftEvent::new(
            "hard_delete_user",
            ActionCategory::UserManagement,
            "Hard-deleted member mem-4",
            actor,
            ActionOutcome::success(),
        )
        .with_target(Target::new(TargetKind::User, "mem-4"));
        AuditEvent::from_draft(draft).with_id(EventId::new(17))
    }

    #[test]
    fn test_alert_snapshot_from_event() {
        let alert = SecurityAlert::for_event(&sample_event());

        assert_eq!(alert.event_id, Some(EventId::new(17)));
        assert_eq!(alert.action, "hard_delete_user");
        assert_eq!(alert.risk_level, RiskLevel::Critical);
        assert!(!alert.sensitive);
        assert_eq!(alert.actor_id, "adm-1");
        assert_eq!(alert.actor_name.as_deref(), Some("Ruth"));
        assert_eq!(alert.actor_ip.as_deref(), Some("10.0.0.8"));
        assert_eq!(alert.target.as_deref(), Some("user:mem-4"));
        assert!(alert.success);
        assert!(alert.error_message.is_none());
    }

    #[test]
    fn test_alert_carries_failure_detail() {
        let draft = DraftEvent::new(
            "reset_user_password",
            ActionCategory::Security,
            "Password reset for mem-2",
            Actor::new(ActorKind::Admin, "adm-1"),
            ActionOutcome::failed("TOKEN_EXPIRED", "reset token expired"),
        );
        let alert = SecurityAlert::for_event(&AuditEvent::from_draft(draft));

        assert!(!alert.success);
        assert_eq!(alert.error_message.as_deref(), Some("reset token expired"));
        assert!(alert.event_id.is_none());
    }

    #[test]
    fn test_headline() {
        let alert = SecurityAlert::for_event(&sample_event());
        assert_eq!(
            alert.headline(),
            "[critical] hard_delete_user by adm-1 succeeded"
        );
    }
}
