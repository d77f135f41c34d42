//! HTTP server for the audit surface
//!
//! Plain accept loop: one spawned task per connection, HTTP/1 only,
//! graceful shutdown through a cancellation token. The admin backend
//! fronts this service, so there is no TLS termination here.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::router;
use crate::state::AppState;

/// HTTP server exposing the audit surface
pub struct ApiServer {
    state: Arc<AppState>,
    addr: SocketAddr,
}

impl ApiServer {
    /// Creates a new `ApiServer`.
    ///
    /// # Arguments
    /// * `state` - Shared handler state
    /// * `endpoint` - Address to bind, e.g. `"127.0.0.1:8687"`
    pub fn new(state: Arc<AppState>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint
            .parse()
            .with_context(|| format!("Invalid bind address '{endpoint}'"))?;
        Ok(Self { state, addr })
    }

    /// Starts the server. This future runs until the provided
    /// cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        info!(addr = %self.addr, "Audit API listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, _) = result?;
                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { router::handle(state, req).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(error = %e, "API connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Audit API shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
