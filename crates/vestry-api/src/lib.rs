//! Vestry API - HTTP surface and metrics for the audit service
//!
//! Provides:
//! - `ApiServer`: Accept-loop HTTP/1 server with graceful shutdown
//! - `router`: Route dispatch, handlers, and the response envelope
//! - `CallerIdentity`: Admin identity from trusted gateway headers
//! - `MetricsRegistry` / `MeteredChannel`: Prometheus counters and the
//!   alert channel wrapper that feeds them
//!
//! The HTTP layer is a driving adapter: it parses the request, calls one
//! service from `AppState`, and maps the result onto the JSON envelope.
//! No business rules live here.

pub mod identity;
pub mod metrics;
pub mod query;
pub mod respond;
pub mod router;
pub mod server;
pub mod state;

pub use identity::CallerIdentity;
pub use metrics::{MeteredChannel, MetricsRegistry};
pub use server::ApiServer;
pub use state::AppState;
