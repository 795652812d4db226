// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use zap_mcp_bridge::config::{AppConfig, LogFormat};
use zap_mcp_bridge::session::{CloseReason, SessionManager};
use zap_mcp_bridge::{create_router, AppContext};

#[derive(Parser)]
#[command(name = "zap-mcp-bridge")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "MCP server exposing OWASP ZAP scanning tools over SSE", long_about = None)]
struct Cli {
    /// Bind host (overrides SERVER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides SERVER_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON log output
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.debug {
        config.observability.log_level = "debug".to_string();
    }
    if cli.json_logs {
        config.observability.log_format = LogFormat::Json;
    }
    config.validate()?;

    init_tracing(&config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("zap-mcp-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.observability.log_level));

    match config.observability.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

async fn async_main(config: AppConfig) -> Result<()> {
    info!(
        version = zap_mcp_bridge::VERSION,
        zap = %config.backend.base_url,
        "ZAP MCP bridge starting"
    );

    let bind_address = config.bind_address();
    let probe_interval = std::time::Duration::from_secs(config.backend.probe_interval_secs);

    let ctx = AppContext::new(config).await?;

    let sweeper = ctx.sessions.spawn_sweeper();
    let probe = ctx
        .health
        .clone()
        .start_periodic_checks(probe_interval, ctx.client.clone());

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("[SUCCESS] Listening on http://{} (SSE endpoint /sse)", bind_address);

    let sessions = ctx.sessions.clone();
    let app = create_router(ctx);

    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(sessions))
        .await;

    sweeper.abort();
    probe.abort();

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e).context("HTTP server failed");
    }

    info!("ZAP MCP bridge stopped");
    Ok(())
}

/// Waits for Ctrl+C, then ends every open stream so graceful shutdown can finish
async fn shutdown_signal(sessions: Arc<SessionManager>) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(open_sessions = sessions.len(), "Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
    sessions.close_all(CloseReason::Shutdown);
}
