//! Risk classification policy
//!
//! Maps an action name to a risk level and a sensitivity flag through
//! static membership sets. Classification runs exactly once, when an event
//! is created; changing these sets later never alters historical records,
//! because the derived values are persisted with the event.
//!
//! Unknown action names classify as low/not-sensitive. Logging must never
//! be blocked by an unrecognized action.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Actions that irreversibly destroy data or alter who holds power.
pub const CRITICAL_ACTIONS: &[&str] = &[
    "hard_delete_user",
    "delete_admin",
    "change_admin_role",
    "restore_backup",
    "purge_audit_logs",
    "factory_reset",
    "disable_authentication",
];

/// Actions that modify accounts, credentials, or system behavior.
pub const HIGH_RISK_ACTIONS: &[&str] = &[
    "delete_user",
    "create_admin",
    "update_admin",
    "update_admin_permissions",
    "reset_user_password",
    "update_system_settings",
    "update_security_settings",
    "export_user_data",
    "import_user_data",
    "delete_backup",
    "delete_biometric_data",
    "revoke_session",
];

/// Routine administrative changes worth a second look.
pub const MEDIUM_RISK_ACTIONS: &[&str] = &[
    "create_user",
    "update_user",
    "update_user_status",
    "view_system_settings",
    "create_backup",
    "assign_unit_leader",
    "remove_unit_member",
    "approve_member",
    "login_failed",
    "update_biometric_data",
    "view_audit_logs",
    "export_audit_logs",
    "flag_audit_log",
    "review_audit_log",
    "cleanup_audit_logs",
];

/// Actions that touch privacy- or security-relevant data, independent of
/// how risky they are.
pub const SENSITIVE_ACTIONS: &[&str] = &[
    "view_system_settings",
    "update_system_settings",
    "update_security_settings",
    "export_user_data",
    "export_audit_logs",
    "import_user_data",
    "view_biometric_data",
    "update_biometric_data",
    "delete_biometric_data",
    "reset_user_password",
    "view_audit_logs",
    "restore_backup",
    "purge_audit_logs",
];

/// Severity classification for an audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels, lowest first.
    pub const ALL: &'static [RiskLevel] = &[
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Stable string form used in storage and query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// True for the levels that trigger security alerting on their own.
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(DomainError::InvalidRiskLevel(other.to_string())),
        }
    }
}

/// How long an event must be kept, derived once at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionCategory {
    Standard,
    Extended,
    Permanent,
}

impl RetentionCategory {
    /// Derive the retention category from the classification outcome.
    ///
    /// Critical events are kept permanently. High-risk OR sensitive events
    /// get extended retention; a medium-risk sensitive action therefore
    /// lands in `Extended`. Everything else is standard.
    pub fn derive(risk: RiskLevel, sensitive: bool) -> Self {
        if risk == RiskLevel::Critical {
            RetentionCategory::Permanent
        } else if risk == RiskLevel::High || sensitive {
            RetentionCategory::Extended
        } else {
            RetentionCategory::Standard
        }
    }

    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionCategory::Standard => "standard",
            RetentionCategory::Extended => "extended",
            RetentionCategory::Permanent => "permanent",
        }
    }
}

impl Display for RetentionCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RetentionCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(RetentionCategory::Standard),
            "extended" => Ok(RetentionCategory::Extended),
            "permanent" => Ok(RetentionCategory::Permanent),
            other => Err(DomainError::validation(
                "retention",
                format!("unknown retention category '{other}'"),
            )),
        }
    }
}

/// Output of [`classify`]: the derived risk level and sensitivity flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub risk: RiskLevel,
    pub sensitive: bool,
}

/// Classify an action name into a risk level and sensitivity flag.
///
/// Matching is exact-name membership in the static sets above, with
/// precedence critical > high > medium. Sensitivity is independent of
/// risk. `category` is accepted for forward compatibility with
/// category-based rules but does not participate in matching today.
///
/// Pure and infallible: unknown actions are low/not-sensitive.
pub fn classify(action: &str, _category: super::event::ActionCategory) -> Classification {
    let risk = if CRITICAL_ACTIONS.contains(&action) {
        RiskLevel::Critical
    } else if HIGH_RISK_ACTIONS.contains(&action) {
        RiskLevel::High
    } else if MEDIUM_RISK_ACTIONS.contains(&action) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    Classification {
        risk,
        sensitive: SENSITIVE_ACTIONS.contains(&action),
    }
}
