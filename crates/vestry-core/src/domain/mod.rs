//! Domain entities and business logic
//!
//! This module contains the core domain types for the audit subsystem:
//! - Newtypes for type-safe identifiers
//! - The risk classification policy and retention derivation
//! - The audit event entity, its draft builder, and actor/target types
//! - Domain-specific error types

pub mod classifier;
pub mod errors;
pub mod event;
pub mod newtypes;

// Re-export commonly used types
pub use classifier::{classify, Classification, RetentionCategory, RiskLevel};
pub use errors::DomainError;
pub use event::{
    ActionCategory, ActionOutcome, Actor, ActorKind, AuditEvent, DraftEvent, Target, TargetKind,
};
pub use newtypes::EventId;
