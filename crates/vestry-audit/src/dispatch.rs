//! AlertDispatcher - bounded security alert fan-out
//!
//! Pushes a [`SecurityAlert`] to every configured channel. Dispatch is
//! best-effort on purpose: a channel that fails or hangs must never stall
//! or fail the audit write path, so each delivery runs under a timeout and
//! every failure ends as a `tracing::warn!` line.

use std::sync::Arc;
use std::time::Duration;

use vestry_core::ports::{IAlertChannel, SecurityAlert};

/// Fans one alert out to every configured channel
///
/// The dispatcher itself always emits one structured warning per alert,
/// so an alert is observable in the logs even with no channels configured.
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn IAlertChannel>>,
    timeout: Duration,
}

impl AlertDispatcher {
    /// Creates a dispatcher over the given channels.
    ///
    /// `timeout` bounds each channel delivery individually.
    pub fn new(channels: Vec<Arc<dyn IAlertChannel>>, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    /// Delivers one alert to every channel, swallowing failures.
    pub async fn dispatch(&self, alert: &SecurityAlert) {
        // The one delivery that cannot fail.
        tracing::warn!(
            action = %alert.action,
            risk_level = %alert.risk_level,
            sensitive = alert.sensitive,
            actor_id = %alert.actor_id,
            success = alert.success,
            "Security alert raised"
        );

        for channel in &self.channels {
            match tokio::time::timeout(self.timeout, channel.deliver(alert)).await {
                Ok(Ok(())) => {
                    tracing::debug!(channel = channel.name(), "Alert delivered");
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        channel = channel.name(),
                        error = %e,
                        "Alert delivery failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        channel = channel.name(),
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Alert delivery timed out"
                    );
                }
            }
        }
    }
}

/// Alert channel that renders alerts into the tracing log
///
/// The default (and currently only) channel. Useful on its own for small
/// deployments where the process log is the alerting surface.
pub struct TracingAlertChannel;

#[async_trait::async_trait]
impl IAlertChannel for TracingAlertChannel {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn deliver(&self, alert: &SecurityAlert) -> anyhow::Result<()> {
        tracing::warn!(
            event_id = ?alert.event_id.map(|id| id.as_i64()),
            category = %alert.category,
            target = alert.target.as_deref().unwrap_or("-"),
            actor_ip = alert.actor_ip.as_deref().unwrap_or("-"),
            "{}",
            alert.headline()
        );
        Ok(())
    }
}
