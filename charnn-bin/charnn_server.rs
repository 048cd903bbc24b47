use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use charnn_inference::{load_engine, InferenceConfig};
use charnn_service::{run_server, AppState, ServiceConfig};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_appender::{
    non_blocking,
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::UtcTime},
    prelude::*,
    EnvFilter, Registry,
};

/// The directory where the logs are stored.
const LOGS: &str = "./logs";
/// The log file name.
const LOG_FILE: &str = "charnn-server.log";

/// Command line arguments for the text generation server
#[derive(Parser)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config_path: String,
}

/// Configures JSON logging to a daily rotated file plus human-readable console output.
///
/// The returned guard flushes the file writer when dropped and must be kept
/// alive for the lifetime of the process.
fn setup_logging<P: AsRef<Path>>(log_dir: P) -> WorkerGuard {
    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE);
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_appender);

    let console_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_span_events(FmtSpan::ENTER);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,charnn_service=debug,charnn_inference=debug"));

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = setup_logging(LOGS);
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let inference_config = InferenceConfig::from_file_path(&args.config_path)
        .context("Failed to load inference configuration")?;
    let service_config = ServiceConfig::from_file_path(&args.config_path)
        .context("Failed to load service configuration")?;

    info!(
        target = "charnn-server",
        event = "loading_engine",
        corpus_path = %inference_config.corpus_path.display(),
        weights_path = %inference_config.weights_path.display(),
        "Loading generation engine"
    );
    // Loading maps the weights and may take a while, keep it off the async workers.
    let engine = tokio::task::spawn_blocking(move || load_engine(&inference_config))
        .await
        .context("Engine loading task panicked")?
        .context("Failed to load generation engine")?;

    let app_state = AppState::new(Arc::new(engine), &service_config);
    let tcp_listener = TcpListener::bind(&service_config.service_bind_address)
        .await
        .with_context(|| {
            format!(
                "Failed to bind to {}",
                service_config.service_bind_address
            )
        })?;
    info!(
        target = "charnn-server",
        event = "server_started",
        address = %service_config.service_bind_address,
        "Starting text generation server"
    );

    if let Err(e) = run_server(app_state, tcp_listener).await {
        error!(
            target = "charnn-server",
            event = "server_error",
            error = %e,
            "Server terminated with an error"
        );
        return Err(e);
    }
    info!(
        target = "charnn-server",
        event = "server_stopped",
        "Server stopped"
    );
    Ok(())
}
