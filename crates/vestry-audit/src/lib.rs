//! Vestry Audit - Recording and alerting services
//!
//! Provides:
//! - `AuditRecorder`: High-level service for recording audit events
//! - `AlertDispatcher`: Bounded, best-effort security alert fan-out
//! - `ReviewService`: Flagging and review of recorded events
//! - `RetentionService`: Age-based archive/delete cleanup

pub mod dispatch;
pub mod recorder;
pub mod retention;
pub mod review;

pub use dispatch::{AlertDispatcher, TracingAlertChannel};
pub use recorder::AuditRecorder;
pub use retention::{CleanupReport, RetentionService};
pub use review::ReviewService;
