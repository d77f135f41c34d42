//! Vestry Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `AuditEvent`, `DraftEvent`, `Actor`, `Target`
//! - **Classification** - Risk level, sensitivity, and retention rules
//! - **Port definitions** - Traits for adapters: `IEventStore`, `IAlertChannel`, `IDirectory`
//! - **Configuration** - Typed YAML config with validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement. Services in
//! the sibling crates orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
