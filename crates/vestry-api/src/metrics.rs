//! Prometheus metrics for the audit service
//!
//! One registry under the `vestry` namespace with counters for the HTTP
//! surface, the audit write path, and alert channel deliveries. The
//! registry is shared via `Arc` between the router and the daemon wiring.

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use vestry_core::ports::{IAlertChannel, SecurityAlert};

/// Central metrics registry for the audit service
pub struct MetricsRegistry {
    registry: Registry,

    /// Counter: HTTP requests by route pattern and status code
    pub http_requests_total: IntCounterVec,

    /// Counter: audit events persisted, by risk level
    pub audit_events_total: IntCounterVec,

    /// Counter: alert deliveries by channel name and outcome
    pub alert_deliveries_total: IntCounterVec,
}

impl MetricsRegistry {
    /// Creates a new registry with all metrics registered under the
    /// `vestry` namespace.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("vestry".to_string()), None)?;

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled"),
            &["endpoint", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let audit_events_total = IntCounterVec::new(
            Opts::new("audit_events_total", "Total audit events persisted"),
            &["risk_level"],
        )?;
        registry.register(Box::new(audit_events_total.clone()))?;

        let alert_deliveries_total = IntCounterVec::new(
            Opts::new(
                "alert_deliveries_total",
                "Total alert channel delivery attempts",
            ),
            &["channel", "outcome"],
        )?;
        registry.register(Box::new(alert_deliveries_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            audit_events_total,
            alert_deliveries_total,
        })
    }

    /// Records one handled HTTP request.
    pub fn record_http_request(&self, endpoint: &str, status: u16) {
        self.http_requests_total
            .with_label_values(&[endpoint, &status.to_string()])
            .inc();
    }

    /// Records one persisted audit event.
    pub fn record_audit_event(&self, risk_level: &str) {
        self.audit_events_total
            .with_label_values(&[risk_level])
            .inc();
    }

    /// Records one alert delivery attempt.
    pub fn record_alert_delivery(&self, channel: &str, outcome: &str) {
        self.alert_deliveries_total
            .with_label_values(&[channel, outcome])
            .inc();
    }

    /// Encodes all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Alert channel wrapper that counts delivery outcomes
///
/// Deliveries abandoned by the dispatcher's timeout never resolve inside
/// the wrapper, so timed-out attempts are not counted.
pub struct MeteredChannel {
    inner: Arc<dyn IAlertChannel>,
    metrics: Arc<MetricsRegistry>,
}

impl MeteredChannel {
    /// Wraps an alert channel so its deliveries land in the registry.
    pub fn new(inner: Arc<dyn IAlertChannel>, metrics: Arc<MetricsRegistry>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl IAlertChannel for MeteredChannel {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn deliver(&self, alert: &SecurityAlert) -> anyhow::Result<()> {
        match self.inner.deliver(alert).await {
            Ok(()) => {
                self.metrics
                    .record_alert_delivery(self.inner.name(), "delivered");
                Ok(())
            }
            Err(e) => {
                self.metrics
                    .record_alert_delivery(self.inner.name(), "failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use vestry_core::domain::{ActionCategory, RiskLevel};

    use super::*;

    fn sample_alert() -> SecurityAlert {
        SecurityAlert {
            event_id: None,
            timestamp: Utc::now(),
            action: "hard_delete_user".to_string(),
            category: ActionCategory::UserManagement,
            description: "Hard-deleted member".to_string(),
            risk_level: RiskLevel::Critical,
            sensitive: false,
            actor_id: "adm-1".to_string(),
            actor_name: None,
            actor_ip: None,
            target: None,
            success: true,
            error_message: None,
        }
    }

    struct OkChannel;

    #[async_trait]
    impl IAlertChannel for OkChannel {
        fn name(&self) -> &'static str {
            "ok"
        }
        async fn deliver(&self, _alert: &SecurityAlert) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct BrokenChannel;

    #[async_trait]
    impl IAlertChannel for BrokenChannel {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn deliver(&self, _alert: &SecurityAlert) -> anyhow::Result<()> {
            anyhow::bail!("delivery refused")
        }
    }

    #[test]
    fn test_metrics_registry_creation() {
        let metrics = MetricsRegistry::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_http_request() {
        let metrics = MetricsRegistry::new().unwrap();

        metrics.record_http_request("/logs", 200);
        metrics.record_http_request("/logs", 200);
        metrics.record_http_request("/logs/{id}", 404);

        assert_eq!(
            metrics
                .http_requests_total
                .with_label_values(&["/logs", "200"])
                .get(),
            2
        );
        assert_eq!(
            metrics
                .http_requests_total
                .with_label_values(&["/logs/{id}", "404"])
                .get(),
            1
        );
    }

    #[test]
    fn test_record_audit_event() {
        let metrics = MetricsRegistry::new().unwrap();

        metrics.record_audit_event("critical");
        metrics.record_audit_event("low");
        metrics.record_audit_event("critical");

        assert_eq!(
            metrics
                .audit_events_total
                .with_label_values(&["critical"])
                .get(),
            2
        );
    }

    #[test]
    fn test_encode_produces_exposition_format() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.record_http_request("/health", 200);

        let output = metrics.encode().unwrap();
        assert!(output.contains("vestry_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[tokio::test]
    async fn test_metered_channel_counts_success() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let channel = MeteredChannel::new(Arc::new(OkChannel), metrics.clone());

        assert_eq!(channel.name(), "ok");
        channel.deliver(&sample_alert()).await.unwrap();

        assert_eq!(
            metrics
                .alert_deliveries_total
                .with_label_values(&["ok", "delivered"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_metered_channel_counts_failure() {
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let channel = MeteredChannel::new(Arc::new(BrokenChannel), metrics.clone());

        let result = channel.deliver(&sample_alert()).await;
        assert!(result.is_err());

        assert_eq!(
            metrics
                .alert_deliveries_total
                .with_label_values(&["broken", "failed"])
                .get(),
            1
        );
    }
}
