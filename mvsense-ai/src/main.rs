//! MV Sense analysis service (mvsense-ai) - Main entry point
//!
//! Listens for motion events from one camera over MQTT, analyses a fresh
//! snapshot per event and publishes the results to the dashboard topics.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use mvsense_ai::config::resolve_settings;
use mvsense_ai::models::topics;
use mvsense_ai::services::{MqttBus, TriggerListener};
use mvsense_ai::workflow::{run_worker, ServiceTasks, TriggerDispatcher};
use mvsense_ai::{build_pipeline, PipelineError};
use mvsense_common::config::{load_or_default, ConfigFileResolver};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for configuration problems
const EXIT_CONFIG: u8 = 2;

/// Time allowed for queued publishes and an in-flight run on shutdown
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Command-line arguments for mvsense-ai
#[derive(Parser, Debug)]
#[command(name = "mvsense-ai")]
#[command(about = "Camera snapshot analysis for the MV Sense dashboard")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "MVSENSE_CONFIG")]
    config: Option<PathBuf>,

    /// MQTT broker port (overrides [server] port)
    #[arg(long, env = "MVSENSE_BROKER_PORT")]
    broker_port: Option<u16>,

    /// Run the pipeline once and exit instead of waiting for triggers
    #[arg(long)]
    once: bool,

    /// Historical snapshot time (RFC 3339), only with --once
    #[arg(long, requires = "once")]
    timestamp: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let resolver = ConfigFileResolver::new(args.config.clone());
    let loaded = load_or_default(&resolver);

    // Logging level may come from the config file, so tracing starts after
    // the file is read.
    let log_level = loaded
        .as_ref()
        .ok()
        .and_then(|(config, _)| config.logging.level.clone());
    init_tracing(log_level);

    let (toml_config, source) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    match &source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No config file found, relying on environment variables and defaults"),
    }

    let mut settings = match resolve_settings(&toml_config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if let Some(port) = args.broker_port {
        settings.broker.port = port;
    }

    match run(args, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<PipelineError>() {
                Some(PipelineError::ConfigurationMissing(_)) => ExitCode::from(EXIT_CONFIG),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(config_level: Option<String>) {
    // RUST_LOG → [logging] level → default
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| config_level.and_then(|level| tracing_subscriber::EnvFilter::try_new(level).ok()))
        .unwrap_or_else(|| "mvsense_ai=info".into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(args: Args, settings: mvsense_ai::config::Settings) -> Result<()> {
    info!(
        camera = %settings.serial,
        broker = %settings.broker.host,
        port = settings.broker.port,
        "Starting mvsense-ai"
    );

    let (bus, eventloop) = MqttBus::connect(&settings.broker);
    let orchestrator = Arc::new(
        build_pipeline(&settings, Arc::new(bus.clone())).context("Failed to build pipeline")?,
    );
    let cancel = CancellationToken::new();

    if args.once {
        let listener = TriggerListener::new(eventloop, bus.client());
        let listener_task = tokio::spawn(listener.run(cancel.clone()));

        let outcome = orchestrator.run_once(args.timestamp).await;

        // Flush queued publishes before leaving
        if let Err(e) = bus.disconnect().await {
            warn!(error = %e, "Disconnect failed");
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, listener_task).await.is_err() {
            warn!("Timed out waiting for the broker connection to close");
            cancel.cancel();
        }

        let report = outcome.context("Pipeline run failed")?;
        info!(
            faces = report.face_count,
            labels = report.label_count,
            texts = report.text_count,
            metrics = report.metrics_published,
            "Single run finished"
        );
        return Ok(());
    }

    let (dispatcher, triggers) = TriggerDispatcher::channel();
    let trigger_topic = topics::trigger(&settings.serial);
    let listener =
        TriggerListener::new(eventloop, bus.client()).with_trigger(trigger_topic, dispatcher);
    let listener_task = tokio::spawn(listener.run(cancel.clone()));

    if let Err(e) = orchestrator.reset_dashboard().await {
        warn!(error = %e, "Dashboard reset failed");
    }

    // Separate token so the listener keeps the connection up while a run drains
    let worker_cancel = CancellationToken::new();
    let worker_task = tokio::spawn(run_worker(
        orchestrator.clone(),
        triggers,
        worker_cancel.clone(),
    ));
    info!("Waiting for motion triggers");

    shutdown_signal().await;

    let tasks = ServiceTasks::new(worker_task, worker_cancel, listener_task, cancel);
    tasks
        .shutdown(SHUTDOWN_GRACE, async {
            // Flush queued publishes before the connection closes
            if let Err(e) = bus.disconnect().await {
                warn!(error = %e, "Disconnect failed");
            }
        })
        .await;

    info!(runs = orchestrator.run_count(), "Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
