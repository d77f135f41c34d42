//! Vestry Daemon - Audit logging service
//!
//! This binary runs as a systemd service and handles:
//! - The HTTP audit API used by the admin backend
//! - Security alert dispatch for elevated-risk events
//! - Prometheus metrics exposition
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon opens the audit database, wires the recording and reporting
//! services into shared [`AppState`], and hands it to the API accept loop.
//! The loop is controlled by a `CancellationToken` that is triggered on
//! receipt of SIGTERM or SIGINT.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use vestry_api::{ApiServer, AppState, MeteredChannel, MetricsRegistry};
use vestry_audit::{AlertDispatcher, AuditRecorder, TracingAlertChannel};
use vestry_core::config::Config;
use vestry_core::ports::{IAlertChannel, IDirectory, IEventStore};
use vestry_store::{DatabasePool, SqliteDirectory, SqliteEventStore};

// ============================================================================
// AuditService
// ============================================================================

/// Main daemon service that wires storage, recording, and the API together
struct AuditService {
    /// Application configuration loaded from YAML
    config: Config,
    /// Shared state handed to every request handler
    state: Arc<AppState>,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl AuditService {
    /// Creates a new AuditService
    ///
    /// Validates the configuration, opens the database, and builds the
    /// service graph behind [`AppState`].
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                error!(field = %error.field, message = %error.message, "Invalid configuration value");
            }
            anyhow::bail!(
                "Configuration failed validation with {} error(s)",
                errors.len()
            );
        }

        let db_pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open audit database")?;
        let store: Arc<dyn IEventStore> = Arc::new(SqliteEventStore::new(db_pool.pool().clone()));
        let directory: Arc<dyn IDirectory> =
            Arc::new(SqliteDirectory::new(db_pool.pool().clone()));

        let metrics =
            Arc::new(MetricsRegistry::new().context("Failed to build metrics registry")?);

        let channels = alert_channels(&config, &metrics);
        let dispatcher = AlertDispatcher::new(
            channels,
            Duration::from_millis(config.alerts.dispatch_timeout_ms),
        );
        let recorder = AuditRecorder::new(Arc::clone(&store), dispatcher);

        let state = Arc::new(AppState::new(store, directory, recorder, metrics));

        info!(
            db_path = %config.database.path.display(),
            bind = %config.server.bind,
            "Audit service initialized"
        );

        Ok(Self {
            config,
            state,
            shutdown,
        })
    }

    /// Runs the API server until shutdown is signalled.
    async fn run(&self) -> Result<()> {
        let server = ApiServer::new(Arc::clone(&self.state), &self.config.server.bind)?;
        server.run(self.shutdown.clone()).await
    }
}

/// Builds the configured alert channels, wrapped for delivery metrics.
///
/// Unknown channel names are skipped with a warning rather than refusing
/// to start; validation normally catches them first.
fn alert_channels(config: &Config, metrics: &Arc<MetricsRegistry>) -> Vec<Arc<dyn IAlertChannel>> {
    let mut channels: Vec<Arc<dyn IAlertChannel>> = Vec::new();
    for name in &config.alerts.channels {
        match name.as_str() {
            "tracing" => channels.push(Arc::new(MeteredChannel::new(
                Arc::new(TracingAlertChannel),
                Arc::clone(metrics),
            ))),
            other => warn!(channel = other, "Ignoring unknown alert channel"),
        }
    }
    channels
}

// ============================================================================
// Tracing setup
// ============================================================================

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level so operators can
/// raise verbosity without editing the config file.
fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
///
/// This function listens for OS signals and cancels the provided token
/// when a shutdown signal is received.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);

    init_tracing(&config);

    info!(config_path = %config_path.display(), "Vestry daemon starting (vestryd)");

    // Cancellation token propagated to all tasks
    let shutdown_token = CancellationToken::new();

    // Spawn signal handler task
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = AuditService::new(config, shutdown_token.clone()).await?;

    let result = service.run().await;

    match &result {
        Ok(()) => info!("Vestry daemon shut down gracefully"),
        Err(e) => error!(error = %e, "Vestry daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_cancel() {
        let token = CancellationToken::new();
        let child = token.child_token();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_default_bind_is_a_socket_addr() {
        let config = Config::default();
        assert!(config.server.bind.parse::<std::net::SocketAddr>().is_ok());
    }

    #[test]
    fn test_config_default_path_exists() {
        let path = Config::default_path();
        // Just verify it returns a non-empty path
        assert!(!path.as_os_str().is_empty());
    }

    #[test]
    fn test_alert_channels_builds_default_set() {
        let config = Config::default();
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let channels = alert_channels(&config, &metrics);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name(), "tracing");
    }

    #[test]
    fn test_alert_channels_skips_unknown_names() {
        let mut config = Config::default();
        config.alerts.channels.push("pager".to_string());
        let metrics = Arc::new(MetricsRegistry::new().unwrap());
        let channels = alert_channels(&config, &metrics);
        assert_eq!(channels.len(), 1);
    }

    #[tokio::test]
    async fn test_service_rejects_invalid_config() {
        let mut config = Config::default();
        config.server.bind = "not-an-address".to_string();
        let result = AuditService::new(config, CancellationToken::new()).await;
        assert!(result.is_err());
    }
}
