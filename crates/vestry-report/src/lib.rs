//! Vestry Report - Read-path services over the audit log
//!
//! Provides:
//! - `HistoryService`: Actor/target history with identity resolution
//! - `SecurityService`: Security event feed, window summaries, recent alerts
//! - `StatisticsService`: Time series and breakdown aggregations
//! - `ComplianceService`: Period counts, scoring, and recommendations
//! - `ExportService`: Capped JSON/CSV dumps of filtered events
//!
//! All services are thin coordinators over the `IEventStore` (and, for
//! history, `IDirectory`) ports; they own no state and hold no locks.

pub mod compliance;
pub mod csv;
pub mod export;
pub mod history;
pub mod security;
pub mod statistics;

pub use compliance::{ComplianceReport, ComplianceService};
pub use export::{Export, ExportFormat, ExportService, EXPORT_ROW_CAP};
pub use history::{ActorHistory, HistoryService, TargetHistory};
pub use security::{SecurityEvents, SecurityService, SecuritySummary};
pub use statistics::{CategoryBreakdown, StatisticsReport, StatisticsService, TOP_ACTORS_LIMIT};
