//! Domain error types
//!
//! This module defines error types for domain operations: validation
//! failures on query/filter parameters, lookup misses, and review-workflow
//! rule violations. Persistence failures on the write path are deliberately
//! NOT represented here; the recorder swallows them (see `vestry-audit`).

use thiserror::Error;

use super::newtypes::EventId;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A filter or request parameter failed validation
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Name of the offending parameter
        field: String,
        /// Human-readable explanation
        message: String,
    },

    /// Lookup by id yielded nothing
    #[error("Audit event {0} not found")]
    EventNotFound(EventId),

    /// Unknown risk level value
    #[error("Invalid risk level: {0}")]
    InvalidRiskLevel(String),

    /// Unknown action category value
    #[error("Invalid action category: {0}")]
    InvalidCategory(String),

    /// Unknown actor type value
    #[error("Invalid actor type: {0}")]
    InvalidActorKind(String),

    /// Unknown target type value
    #[error("Invalid target type: {0}")]
    InvalidTargetKind(String),

    /// Unknown statistics granularity value
    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

impl DomainError {
    /// Shorthand for a [`DomainError::Validation`] with the given field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// True when the error is a lookup miss rather than a bad parameter.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::EventNotFound(_))
    }
}
