use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use confirm_engine::ConfirmationGate;
use tokio::net::TcpListener;

use crate::routes::{app_router, AppState};

/// Default port of the confirmation daemon.
pub const DEFAULT_PORT: u16 = 3001;

/// Configuration for the HTTP daemon.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listening socket to.
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
        }
    }
}

/// The confirmation daemon.
///
/// Every `/confirm` request goes through the shared [`ConfirmationGate`], so
/// rate limits and metrics are global to the process.
pub struct Server {
    config: ServerConfig,
    gate: Arc<ConfirmationGate>,
}

impl Server {
    pub fn new(config: ServerConfig, gate: Arc<ConfirmationGate>) -> Self {
        Self { config, gate }
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.config.listen_addr))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr().context("listener has no local address")?;

        self.gate.initialize();

        tracing::info!(%addr, "auto-confirm daemon listening");
        tracing::info!("  POST http://{addr}/confirm - process confirmation");
        tracing::info!("  GET  http://{addr}/status  - get status");

        let app = app_router(AppState::new(Arc::clone(&self.gate)));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        tracing::info!("auto-confirm daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confirm_engine::{DecisionEngine, PolicyConfig, StaticConfig};

    fn gate() -> Arc<ConfirmationGate> {
        let provider = Arc::new(StaticConfig::new(PolicyConfig::default()));
        Arc::new(ConfirmationGate::new(Arc::new(DecisionEngine::with_provider(
            provider,
        ))))
    }

    #[test]
    fn default_config_is_localhost() {
        let config = ServerConfig::default();
        assert!(config.listen_addr.ip().is_loopback());
        assert_eq!(config.listen_addr.port(), DEFAULT_PORT);
    }

    #[tokio::test]
    async fn serve_returns_on_shutdown_and_initializes_gate() {
        let gate = gate();
        let server = Server::new(ServerConfig::default(), Arc::clone(&gate));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        server.serve(listener, async {}).await.unwrap();
        assert!(gate.is_initialized());
    }

    #[tokio::test]
    async fn run_fails_on_taken_port() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            listen_addr: taken.local_addr().unwrap(),
        };
        let err = Server::new(config, gate()).run(async {}).await.unwrap_err();
        assert!(err.to_string().contains("failed to bind"), "{err}");
    }
}
