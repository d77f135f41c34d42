//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for domain identifiers. Actor and target ids are
//! deliberately left as plain strings on their structs: they are denormalized
//! references into external directories and must never fail construction,
//! otherwise a malformed caller snapshot could block audit logging.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Identifier for audit events (database row ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(i64);

impl EventId {
    /// Create an EventId from an i64 value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid EventId: {e}")))
    }
}

impl From<i64> for EventId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
