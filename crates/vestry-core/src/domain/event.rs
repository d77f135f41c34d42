//! Audit event domain entities
//!
//! This module defines the immutable audit record and the draft type
//! collaborators use to create one. [`AuditEvent::from_draft`] is the only
//! constructor path for a valid event: it stamps the timestamp and derives
//! risk level, sensitivity, and retention category. No public setter exists
//! for those fields; only the review-workflow fields mutate after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classifier::{classify, RetentionCategory, RiskLevel};
use super::errors::DomainError;
use super::newtypes::EventId;

/// Functional area an audited action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Authentication,
    UserManagement,
    AdminManagement,
    SystemSettings,
    Dashboard,
    Biometric,
    Security,
    DataExport,
    DataImport,
    Backup,
    Maintenance,
}

impl ActionCategory {
    /// All categories, in declaration order.
    pub const ALL: &'static [ActionCategory] = &[
        ActionCategory::Authentication,
        ActionCategory::UserManagement,
        ActionCategory::AdminManagement,
        ActionCategory::SystemSettings,
        ActionCategory::Dashboard,
        ActionCategory::Biometric,
        ActionCategory::Security,
        ActionCategory::DataExport,
        ActionCategory::DataImport,
        ActionCategory::Backup,
        ActionCategory::Maintenance,
    ];

    /// Stable string form used in storage and query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCategory::Authentication => "authentication",
            ActionCategory::UserManagement => "user_management",
            ActionCategory::AdminManagement => "admin_management",
            ActionCategory::SystemSettings => "system_settings",
            ActionCategory::Dashboard => "dashboard",
            ActionCategory::Biometric => "biometric",
            ActionCategory::Security => "security",
            ActionCategory::DataExport => "data_export",
            ActionCategory::DataImport => "data_import",
            ActionCategory::Backup => "backup",
            ActionCategory::Maintenance => "maintenance",
        }
    }
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| DomainError::InvalidCategory(s.to_string()))
    }
}

/// Kind of identity that performed an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Admin,
    User,
    System,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Admin => "admin",
            ActorKind::User => "user",
            ActorKind::System => "system",
        }
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActorKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(ActorKind::Admin),
            "user" => Ok(ActorKind::User),
            "system" => Ok(ActorKind::System),
            other => Err(DomainError::InvalidActorKind(other.to_string())),
        }
    }
}

/// Kind of entity an action was performed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    User,
    Admin,
    Settings,
    System,
    Data,
    Session,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::User => "user",
            TargetKind::Admin => "admin",
            TargetKind::Settings => "settings",
            TargetKind::System => "system",
            TargetKind::Data => "data",
            TargetKind::Session => "session",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TargetKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TargetKind::User),
            "admin" => Ok(TargetKind::Admin),
            "settings" => Ok(TargetKind::Settings),
            "system" => Ok(TargetKind::System),
            "data" => Ok(TargetKind::Data),
            "session" => Ok(TargetKind::Session),
            other => Err(DomainError::InvalidTargetKind(other.to_string())),
        }
    }
}

/// Who performed an audited action
///
/// Identity fields are denormalized snapshots captured at write time; the
/// authoritative data lives in the admin/member directories. They are plain
/// strings so that a malformed snapshot can never block logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    /// Whether the actor is an admin, a member, or the system itself
    pub kind: ActorKind,
    /// Directory id of the actor ("system" for system actions)
    pub id: String,
    /// Email snapshot, if known
    pub email: Option<String>,
    /// Display name snapshot, if known
    pub name: Option<String>,
    /// Role snapshot, if known (admins only)
    pub role: Option<String>,
    /// Source IP of the request that triggered the action
    pub source_ip: Option<String>,
    /// User agent of the request that triggered the action
    pub user_agent: Option<String>,
}

impl Actor {
    /// Creates an actor with the required fields.
    pub fn new(kind: ActorKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            email: None,
            name: None,
            role: None,
            source_ip: None,
            user_agent: None,
        }
    }

    /// Creates the system actor for internally-triggered actions.
    pub fn system() -> Self {
        Self::new(ActorKind::System, "system")
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }
}

/// What an audited action was performed against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Kind of entity acted upon
    pub kind: TargetKind,
    /// Directory or record id of the target
    pub id: String,
    /// Email snapshot, if known
    pub email: Option<String>,
    /// Display name snapshot, if known
    pub name: Option<String>,
}

impl Target {
    /// Creates a target with the required fields.
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            email: None,
            name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Outcome of an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// The action completed successfully
    Success,
    /// The action failed with an error code and message
    Failed {
        /// Error code for categorization
        code: String,
        /// Human-readable error message
        message: String,
    },
}

impl ActionOutcome {
    /// Creates a successful outcome
    pub fn success() -> Self {
        ActionOutcome::Success
    }

    /// Creates a failed outcome with the given code and message
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        ActionOutcome::Failed {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns true if the outcome is a success
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }

    /// Returns the error code when failed
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ActionOutcome::Success => None,
            ActionOutcome::Failed { code, .. } => Some(code),
        }
    }

    /// Returns the error message when failed
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ActionOutcome::Success => None,
            ActionOutcome::Failed { message, .. } => Some(message),
        }
    }
}

/// What a collaborator supplies when recording an action
///
/// A draft carries everything the caller knows: the action name, category,
/// description, actor, outcome, and optional target/payloads/correlation
/// ids. It deliberately has no risk, sensitivity, retention, or timestamp
/// fields; those are derived when the draft is finalized.
#[derive(Debug, Clone)]
pub struct DraftEvent {
    pub(crate) action: String,
    pub(crate) category: ActionCategory,
    pub(crate) description: String,
    pub(crate) actor: Actor,
    pub(crate) outcome: ActionOutcome,
    pub(crate) target: Option<Target>,
    pub(crate) action_data: Value,
    pub(crate) old_values: Option<Value>,
    pub(crate) new_values: Option<Value>,
    pub(crate) changes: Option<Value>,
    pub(crate) session_id: Option<String>,
    pub(crate) request_id: Option<String>,
    pub(crate) correlation_id: Option<String>,
}

impl DraftEvent {
    /// Creates a draft with the required fields.
    pub fn new(
        action: impl Into<String>,
        category: ActionCategory,
        description: impl Into<String>,
        actor: Actor,
        outcome: ActionOutcome,
    ) -> Self {
        Self {
            action: action.into(),
            category,
            description: description.into(),
            actor,
            outcome,
            target: None,
            action_data: Value::Null,
            old_values: None,
            new_values: None,
            changes: None,
            session_id: None,
            request_id: None,
            correlation_id: None,
        }
    }

    /// Returns the action name (used by the recorder for log lines).
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the schema-less payload describing the action.
    pub fn with_action_data(mut self, data: Value) -> Self {
        self.action_data = data;
        self
    }

    pub fn with_old_values(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }

    /// Sets the semantic diff between old and new values.
    pub fn with_changes(mut self, changes: Value) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// An immutable audit record of one administrative action
///
/// Every field except the review-workflow fields (`flagged`, `flag_reason`,
/// `reviewed`, `review_notes`, `reviewed_by`, `reviewed_at`) and the
/// terminal `archived` marker is write-once. The derived fields
/// (`risk_level`, `sensitive`, `retention`, `timestamp`) are computed by
/// [`AuditEvent::from_draft`] and never recomputed, so later changes to the
/// classification tables do not alter history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier (assigned by the store on append)
    id: Option<EventId>,
    /// When the action occurred, set at creation
    timestamp: DateTime<Utc>,
    /// Short identifier of the operation performed
    action: String,
    /// Functional area of the action
    category: ActionCategory,
    /// Human-readable summary
    description: String,
    /// Who performed the action
    actor: Actor,
    /// What was acted upon, if anything
    target: Option<Target>,
    /// Schema-less payload describing the action
    action_data: Value,
    /// State before the action, when the caller captured it
    old_values: Option<Value>,
    /// State after the action, when the caller captured it
    new_values: Option<Value>,
    /// Semantic diff of the action, when the caller captured it
    changes: Option<Value>,
    /// Outcome of the action
    outcome: ActionOutcome,
    /// Correlation: session that triggered the action
    session_id: Option<String>,
    /// Correlation: request that triggered the action
    request_id: Option<String>,
    /// Correlation: cross-service correlation id
    correlation_id: Option<String>,
    /// Derived risk classification
    risk_level: RiskLevel,
    /// Derived sensitivity flag
    sensitive: bool,
    /// Derived retention category
    retention: RetentionCategory,
    /// Review workflow: flagged for review
    flagged: bool,
    /// Review workflow: why the record was flagged
    flag_reason: Option<String>,
    /// Review workflow: an admin has reviewed the record
    reviewed: bool,
    /// Review workflow: reviewer's notes
    review_notes: Option<String>,
    /// Review workflow: who flagged/reviewed last
    reviewed_by: Option<String>,
    /// Review workflow: when the last flag/review touch happened
    reviewed_at: Option<DateTime<Utc>>,
    /// Terminal marker set by retention cleanup in archive mode
    archived: bool,
}

impl AuditEvent {
    /// Finalizes a draft into a valid audit event.
    ///
    /// This is the sole producer of an `AuditEvent`: it stamps the
    /// timestamp and derives `risk_level`, `sensitive`, and `retention`
    /// from the action name. Callers cannot supply those values.
    pub fn from_draft(draft: DraftEvent) -> Self {
        let classification = classify(&draft.action, draft.category);
        let retention = RetentionCategory::derive(classification.risk, classification.sensitive);

        Self {
            id: None,
            timestamp: Utc::now(),
            action: draft.action,
            category: draft.category,
            description: draft.description,
            actor: draft.actor,
            target: draft.target,
            action_data: draft.action_data,
            old_values: draft.old_values,
            new_values: draft.new_values,
            changes: draft.changes,
            outcome: draft.outcome,
            session_id: draft.session_id,
            request_id: draft.request_id,
            correlation_id: draft.correlation_id,
            risk_level: classification.risk,
            sensitive: classification.sensitive,
            retention,
            flagged: false,
            flag_reason: None,
            reviewed: false,
            review_notes: None,
            reviewed_by: None,
            reviewed_at: None,
            archived: false,
        }
    }

    /// Sets the ID for this event (called after the store assigns one)
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the event ID (None if not yet persisted)
    pub fn id(&self) -> Option<EventId> {
        self.id
    }

    /// Returns when the action occurred
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the action name
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Returns the action category
    pub fn category(&self) -> ActionCategory {
        self.category
    }

    /// Returns the human-readable summary
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns who performed the action
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Returns what was acted upon, if anything
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    /// Returns the schema-less action payload
    pub fn action_data(&self) -> &Value {
        &self.action_data
    }

    pub fn old_values(&self) -> Option<&Value> {
        self.old_values.as_ref()
    }

    pub fn new_values(&self) -> Option<&Value> {
        self.new_values.as_ref()
    }

    pub fn changes(&self) -> Option<&Value> {
        self.changes.as_ref()
    }

    /// Returns the outcome of the action
    pub fn outcome(&self) -> &ActionOutcome {
        &self.outcome
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the derived risk level
    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Returns the derived sensitivity flag
    pub fn sensitive(&self) -> bool {
        self.sensitive
    }

    /// Returns the derived retention category
    pub fn retention(&self) -> RetentionCategory {
        self.retention
    }

    pub fn flagged(&self) -> bool {
        self.flagged
    }

    pub fn flag_reason(&self) -> Option<&str> {
        self.flag_reason.as_deref()
    }

    pub fn reviewed(&self) -> bool {
        self.reviewed
    }

    pub fn review_notes(&self) -> Option<&str> {
        self.review_notes.as_deref()
    }

    pub fn reviewed_by(&self) -> Option<&str> {
        self.reviewed_by.as_deref()
    }

    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.reviewed_at
    }

    pub fn archived(&self) -> bool {
        self.archived
    }

    /// True when a successful write of this event must invoke the alert
    /// dispatcher: high/critical risk, or a sensitive action.
    pub fn requires_alert(&self) -> bool {
        self.risk_level.is_elevated() || self.sensitive
    }

    /// Flags this event for review.
    ///
    /// Requires a non-empty reason. Flagging an already-flagged event
    /// overwrites the previous reason, reviewer, and timestamp; flagging
    /// counts as a review touch.
    pub fn flag(
        &mut self,
        reason: impl Into<String>,
        reviewer: impl Into<String>,
    ) -> Result<(), DomainError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(DomainError::validation("reason", "must not be empty"));
        }
        self.flagged = true;
        self.flag_reason = Some(reason);
        self.reviewed_by = Some(reviewer.into());
        self.reviewed_at = Some(Utc::now());
        Ok(())
    }

    /// Records an admin's review of this event.
    ///
    /// Does not require a prior flag. Repeated reviews overwrite the
    /// previous notes, reviewer, and timestamp.
    pub fn review(&mut self, notes: Option<String>, reviewer: impl Into<String>) {
        self.reviewed = true;
        self.review_notes = notes;
        self.reviewed_by = Some(reviewer.into());
        self.reviewed_at = Some(Utc::now());
    }

    /// Marks this event archived (terminal; set by retention cleanup).
    pub fn mark_archived(&mut self) {
        self.archived = true;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn admin_actor() -> Actor {
        Actor::new(ActorKind::Admin, "adm-1")
            .with_email("warden@parish.example")
            .with_name("Pat Warden")
            .with_role("super_admin")
            .with_source_ip("10.0.0.9")
    }

    fn draft(action: &str, category: ActionCategory) -> DraftEvent {
        DraftEvent::new(
            action,
            category,
            format!("test: {action}"),
            admin_actor(),
            ActionOutcome::success(),
        )
    }

    #[test]
    fn test_critical_action_derivation() {
        let event = AuditEvent::from_draft(draft(
            "hard_delete_user",
            ActionCategory::UserManagement,
        ));

        assert!(event.id().is_none());
        assert_eq!(event.risk_level(), RiskLevel::Critical);
        assert!(!event.sensitive());
        assert_eq!(event.retention(), RetentionCategory::Permanent);
        assert!(event.requires_alert());
    }

    #[test]
    fn test_medium_sensitive_action_derivation() {
        let event = AuditEvent::from_draft(draft(
            "view_system_settings",
            ActionCategory::SystemSettings,
        ));

        assert_eq!(event.risk_level(), RiskLevel::Medium);
        assert!(event.sensitive());
        assert_eq!(event.retention(), RetentionCategory::Extended);
        assert!(event.requires_alert());
    }

    #[test]
    fn test_unknown_action_derivation() {
        let event = AuditEvent::from_draft(draft("foo_bar", ActionCategory::Dashboard));

        assert_eq!(event.risk_level(), RiskLevel::Low);
        assert!(!event.sensitive());
        assert_eq!(event.retention(), RetentionCategory::Standard);
        assert!(!event.requires_alert());
    }

    #[test]
    fn test_from_draft_defaults() {
        let event = AuditEvent::from_draft(draft("update_user", ActionCategory::UserManagement));

        assert!(!event.flagged());
        assert!(!event.reviewed());
        assert!(!event.archived());
        assert!(event.flag_reason().is_none());
        assert!(event.reviewed_by().is_none());
        assert!(event.reviewed_at().is_none());
        assert!(event.target().is_none());
        assert_eq!(*event.action_data(), Value::Null);
    }

    #[test]
    fn test_draft_builder_pattern() {
        let d = draft("update_user_status", ActionCategory::UserManagement)
            .with_target(
                Target::new(TargetKind::User, "mem-7")
                    .with_email("member@parish.example")
                    .with_name("Sam Member"),
            )
            .with_action_data(json!({"field": "status"}))
            .with_old_values(json!({"status": "active"}))
            .with_new_values(json!({"status": "suspended"}))
            .with_changes(json!({"status": ["active", "suspended"]}))
            .with_session_id("sess-1")
            .with_request_id("req-1")
            .with_correlation_id("corr-1");

        let event = AuditEvent::from_draft(d);

        let target = event.target().unwrap();
        assert_eq!(target.kind, TargetKind::User);
        assert_eq!(target.id, "mem-7");
        assert_eq!(event.action_data()["field"], "status");
        assert_eq!(event.old_values().unwrap()["status"], "active");
        assert_eq!(event.new_values().unwrap()["status"], "suspended");
        assert_eq!(event.changes().unwrap()["status"][0], "active");
        assert_eq!(event.session_id(), Some("sess-1"));
        assert_eq!(event.request_id(), Some("req-1"));
        assert_eq!(event.correlation_id(), Some("corr-1"));
    }

    #[test]
    fn test_with_id() {
        let event = AuditEvent::from_draft(draft("create_user", ActionCategory::UserManagement))
            .with_id(EventId::new(42));
        assert_eq!(event.id(), Some(EventId::new(42)));
    }

    #[test]
    fn test_flag_requires_reason() {
        let mut event = AuditEvent::from_draft(draft("update_user", ActionCategory::UserManagement));

        assert!(event.flag("", "adm-2").is_err());
        assert!(event.flag("   ", "adm-2").is_err());
        assert!(!event.flagged());

        event.flag("unusual hours", "adm-2").unwrap();
        assert!(event.flagged());
        assert_eq!(event.flag_reason(), Some("unusual hours"));
        assert_eq!(event.reviewed_by(), Some("adm-2"));
        assert!(event.reviewed_at().is_some());
    }

    #[test]
    fn test_flag_overwrites_previous_flag() {
        let mut event = AuditEvent::from_draft(draft("update_user", ActionCategory::UserManagement));
        let action_before = event.action().to_string();
        let actor_before = event.actor().clone();
        let timestamp_before = event.timestamp();

        event.flag("first reason", "adm-1").unwrap();
        event.flag("second reason", "adm-2").unwrap();

        assert_eq!(event.flag_reason(), Some("second reason"));
        assert_eq!(event.reviewed_by(), Some("adm-2"));

        // Write-once fields are untouched by any number of flag calls
        assert_eq!(event.action(), action_before);
        assert_eq!(*event.actor(), actor_before);
        assert_eq!(event.timestamp(), timestamp_before);
    }

    #[test]
    fn test_review_without_prior_flag() {
        let mut event = AuditEvent::from_draft(draft("update_user", ActionCategory::UserManagement));

        event.review(Some("looks fine".to_string()), "adm-3");

        assert!(event.reviewed());
        assert!(!event.flagged());
        assert_eq!(event.review_notes(), Some("looks fine"));
        assert_eq!(event.reviewed_by(), Some("adm-3"));
    }

    #[test]
    fn test_review_notes_optional() {
        let mut event = AuditEvent::from_draft(draft("update_user", ActionCategory::UserManagement));
        event.review(None, "adm-3");
        assert!(event.reviewed());
        assert!(event.review_notes().is_none());
    }

    #[test]
    fn test_mark_archived() {
        let mut event = AuditEvent::from_draft(draft("update_user", ActionCategory::UserManagement));
        assert!(!event.archived());
        event.mark_archived();
        assert!(event.archived());
    }

    #[test]
    fn test_serde_round_trip_preserves_derived_fields() {
        let mut event = AuditEvent::from_draft(draft(
            "export_user_data",
            ActionCategory::DataExport,
        ));
        event.flag("bulk export", "adm-1").unwrap();

        let json = serde_json::to_string(&event).unwrap();
        let back: AuditEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(back, event);
        assert_eq!(back.risk_level(), RiskLevel::High);
        assert!(back.sensitive());
        assert_eq!(back.retention(), RetentionCategory::Extended);
        assert_eq!(back.timestamp(), event.timestamp());
    }

    #[test]
    fn test_outcome_success() {
        let outcome = ActionOutcome::success();
        assert!(outcome.is_success());
        assert!(outcome.error_code().is_none());
        assert!(outcome.error_message().is_none());
    }

    #[test]
    fn test_outcome_failed() {
        let outcome = ActionOutcome::failed("OTP_EXPIRED", "the code expired");
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_code(), Some("OTP_EXPIRED"));
        assert_eq!(outcome.error_message(), Some("the code expired"));
    }

    #[test]
    fn test_category_display_and_parse() {
        for category in ActionCategory::ALL {
            let parsed: ActionCategory = category.as_str().parse().unwrap();
            assert_eq!(parsed, *category);
        }
        assert!("bookkeeping".parse::<ActionCategory>().is_err());
    }

    #[test]
    fn test_actor_kind_parse() {
        assert_eq!("admin".parse::<ActorKind>().unwrap(), ActorKind::Admin);
        assert_eq!("system".parse::<ActorKind>().unwrap(), ActorKind::System);
        assert!("robot".parse::<ActorKind>().is_err());
    }

    #[test]
    fn test_target_kind_parse() {
        assert_eq!("user".parse::<TargetKind>().unwrap(), TargetKind::User);
        assert_eq!("session".parse::<TargetKind>().unwrap(), TargetKind::Session);
        assert!("building".parse::<TargetKind>().is_err());
    }

    #[test]
    fn test_system_actor() {
        let actor = Actor::system();
        assert_eq!(actor.kind, ActorKind::System);
        assert_eq!(actor.id, "system");
    }

    #[test]
    fn test_category_serialization() {
        let json = serde_json::to_string(&ActionCategory::UserManagement).unwrap();
        assert_eq!(json, "\"user_management\"");

        let back: ActionCategory = serde_json::from_str("\"data_export\"").unwrap();
        assert_eq!(back, ActionCategory::DataExport);
    }
}
