//! Identity directory port (driven/secondary port)
//!
//! This module defines the read-only interface for resolving the actor
//! and target ids carried by audit events against the congregation
//! directory (admins and members).
//!
//! ## Design Notes
//!
//! - Resolution is best-effort decoration: a missing identity is `None`,
//!   never an error, because events outlive the records they reference.
//! - Admins and members live in separate tables with different shapes;
//!   both resolve to the same flattened summary.

use serde::{Deserialize, Serialize};

/// Flattened identity details attached to history reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySummary {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    /// Admin role, e.g. `super_admin`; `None` for members
    pub role: Option<String>,
    /// Member status, e.g. `active`; `None` for admins
    pub status: Option<String>,
}

/// Port trait for directory lookups
///
/// ## Implementation Notes
///
/// - `Ok(None)` means the id does not exist; reserve `Err` for transport
///   failures.
/// - Callers resolve an unknown id first as an admin, then as a member.
#[async_trait::async_trait]
pub trait IDirectory: Send + Sync {
    /// Looks up an admin by directory id.
    async fn find_admin(&self, id: &str) -> anyhow::Result<Option<IdentitySummary>>;

    /// Looks up a member by directory id.
    async fn find_member(&self, id: &str) -> anyhow::Result<Option<IdentitySummary>>;
}
