mod cli;
mod commands;
mod config;
mod theme;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use confirm_daemon::{Server, ServerConfig};
use confirm_engine::{ConfigProvider, ConfirmationGate, DecisionEngine, LogLevel};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::ConfigStore;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config. Problems are collected and logged once tracing is up.
    let path = config::resolve_path(cli.config.as_deref());
    let store = Arc::new(ConfigStore::open(path));

    // 3. Init tracing: JSON for the daemon, compact stderr for one-shot commands.
    let daemon = matches!(cli.command, Command::Daemon { .. });
    init_tracing(store.snapshot().log_level, daemon);
    for warning in store.warnings() {
        warn!(path = %store.path().display(), "{warning}");
    }

    // 4. Build the gate on top of the store so config changes apply live.
    let provider: Arc<dyn ConfigProvider> = store.clone();
    let gate = Arc::new(ConfirmationGate::new(Arc::new(DecisionEngine::with_provider(
        provider,
    ))));

    // 5. Dispatch.
    match cli.command {
        Command::Status => commands::status(&store, &gate),
        Command::Enable => commands::set_enabled(&store, true)?,
        Command::Disable => commands::set_enabled(&store, false)?,
        Command::Metrics { reset } => commands::metrics(&gate, reset),
        Command::Test { message, action } => commands::test(&gate, &message, &action),
        Command::Init => commands::init(&gate),
        Command::Patterns(command) => commands::patterns(&store, command)?,
        Command::Config(command) => commands::config(&store, command)?,
        Command::Daemon { port, bind } => {
            run_daemon(&store, gate, SocketAddr::new(bind, port)).await?
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(level: LogLevel, json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run_daemon(
    store: &ConfigStore,
    gate: Arc<ConfirmationGate>,
    listen_addr: SocketAddr,
) -> Result<()> {
    info!(
        config_file = %store.path().display(),
        listen = %listen_addr,
        "auto-confirm daemon starting"
    );

    let server = Server::new(ServerConfig { listen_addr }, Arc::clone(&gate));
    server.run(shutdown_signal()).await?;

    let config = store.snapshot();
    let metrics = gate.status().metrics;
    if config.metrics_enabled && metrics.total_requests > 0 {
        info!(
            total_requests = metrics.total_requests,
            auto_confirmed = metrics.auto_confirmed,
            manual_confirmed = metrics.manual_confirmed,
            denied = metrics.denied,
            timeouts = metrics.timeouts,
            average_response_time_ms = metrics.average_response_time,
            "final metrics"
        );
    }
    Ok(())
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("received SIGINT (ctrl-c)");
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => info!("received SIGTERM"),
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await;
}
