mod config;
mod connection;
mod ids;
mod matchmaking;
mod outcome;
mod pairing;
mod persistence;
mod service;
mod session;
mod sweep;
mod time_control;
mod tournament;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::ServerConfig;
use connection::ConnectionRegistry;
use matchmaking::MatchmakingQueue;
use persistence::{FinishedGameStore, TournamentStore};
use service::AppState;
use session::SessionManager;
use tournament::TournamentManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();

    // Stdout always; a daily-rolling file as well when a log dir is set.
    let (file_layer, _guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "chess-arena-server");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_span_events(FmtSpan::CLOSE))
        .with(file_layer)
        .init();

    tracing::info!("Starting chess arena server");

    config.ensure_data_dir()?;
    tracing::info!("Using data directory: {}", config.data_dir.display());

    let (sessions, completions) = SessionManager::new(config.session);
    let sessions = Arc::new(sessions);
    let tournaments = Arc::new(TournamentManager::new(
        sessions.clone(),
        TournamentStore::new(&config.data_dir),
    ));
    let queue = Arc::new(MatchmakingQueue::new(sessions.clone()));
    let archive = Arc::new(FinishedGameStore::new(&config.data_dir));
    let connections = Arc::new(ConnectionRegistry::new(sessions.clone()));

    tokio::spawn(sweep::run_completion_pump(
        completions,
        sessions.clone(),
        tournaments.clone(),
        archive.clone(),
    ));
    tokio::spawn(sweep::run_sweeper(
        config.sweep_interval,
        sessions.clone(),
        tournaments.clone(),
        queue.clone(),
    ));

    let app = service::router(AppState {
        sessions,
        connections,
        queue,
        tournaments,
        archive,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.bind_addr))?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
