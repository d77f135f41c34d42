//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IEventStore`] - Persistent storage and aggregation for audit events
//! - [`IAlertChannel`] - One delivery channel for security alerts
//! - [`IDirectory`] - Read-only admin/member identity lookups

pub mod alert;
pub mod directory;
pub mod event_store;

pub use alert::{IAlertChannel, SecurityAlert};
pub use directory::{IDirectory, IdentitySummary};
pub use event_store::{
    ActorStat, BucketStat, CategoryStat, CleanupMode, EventFilter, EventPage, Granularity,
    IEventStore, Order, Page, Pagination, ReviewState, RiskStat, TimeRange, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
