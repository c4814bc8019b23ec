//! # bootimg-server — Binary Entry Point
//!
//! Loads the base templates, registers any static configurations and serves
//! images until interrupted.

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use bootimg_server::config::{LogFormat, ServerArgs};
use bootimg_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    // Install the recorder first so startup registrations are counted.
    let metrics = if args.no_metrics {
        tracing::info!("metrics endpoint disabled");
        None
    } else {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing Prometheus recorder")?;
        Some(handle)
    };

    let images = bootimg_server::bootstrap::bootstrap(&args).map_err(|e| {
        tracing::error!(error = %e, "bootstrap failed");
        e
    })?;

    let mut state = AppState::new(images);
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }
    let app = bootimg_server::app(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind to {}", args.bind))?;
    tracing::info!(addr = %args.bind, "bootimg server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("bootimg server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
