//! Shared handler state
//!
//! One `AppState` is built at startup and shared across connections. It
//! owns the recorder, every query/report service, and the metrics
//! registry, all wired over the same store.

use std::sync::Arc;

use vestry_audit::{AuditRecorder, RetentionService, ReviewService};
use vestry_core::ports::{IDirectory, IEventStore};
use vestry_report::{
    ComplianceService, ExportService, HistoryService, SecurityService, StatisticsService,
};

use crate::metrics::MetricsRegistry;

/// Everything the request handlers need
pub struct AppState {
    pub store: Arc<dyn IEventStore>,
    pub recorder: AuditRecorder,
    pub review: ReviewService,
    pub retention: RetentionService,
    pub history: HistoryService,
    pub security: SecurityService,
    pub statistics: StatisticsService,
    pub compliance: ComplianceService,
    pub export: ExportService,
    pub metrics: Arc<MetricsRegistry>,
}

impl AppState {
    /// Wires every service over one store and directory.
    pub fn new(
        store: Arc<dyn IEventStore>,
        directory: Arc<dyn IDirectory>,
        recorder: AuditRecorder,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            recorder,
            review: ReviewService::new(Arc::clone(&store)),
            retention: RetentionService::new(Arc::clone(&store)),
            history: HistoryService::new(Arc::clone(&store), directory),
            security: SecurityService::new(Arc::clone(&store)),
            statistics: StatisticsService::new(Arc::clone(&store)),
            compliance: ComplianceService::new(Arc::clone(&store)),
            export: ExportService::new(Arc::clone(&store)),
            store,
            metrics,
        }
    }
}
