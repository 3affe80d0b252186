//! Service scaffold binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────────────────────────────────────┐
//!   Client ───────▶│ CORS → http_request span → request log        │
//!                  │   → catch panic → handlers (/, /health)       │
//!                  └──────────────┬───────────────┬────────────────┘
//!                                 │ AppState      │ tracing events
//!                 ┌───────────────┼────────┐      ▼
//!                 ▼               ▼        ▼    AppLogger ─▶ console
//!              Redis           Kafka   Postgres  (+trace id) ─▶ file
//!           CacheClient  ProducerClient Database             ─▶ Loki
//!
//!   tracing spans ─▶ OpenTelemetry ─▶ OTLP/gRPC (Tempo)
//! ```
//!
//! # Startup order
//!
//! settings → telemetry + subscriber → logger sinks → metrics → clients →
//! listener. Teardown runs in reverse.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tokio::net::TcpListener;

use service_scaffold::config::{load_settings, ConfigError};
use service_scaffold::http::HttpServer;
use service_scaffold::lifecycle::{start_services, stop_services, wait_for_signal, Shutdown};
use service_scaffold::observability::tracing::{init_subscriber, init_tracer_provider};
use service_scaffold::observability::{metrics, AppLogger, LoggerOptions};

const LOG_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(ConfigError::Cli(e)) => e.exit(),
        Err(e) => return Err(e.into()),
    };
    let settings = Arc::new(settings);

    let telemetry = init_tracer_provider(&settings.project_name, settings.tempo_exporter.as_deref())?;
    let level = settings
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    let logger = AppLogger::new(env!("CARGO_CRATE_NAME")).with_level(level);
    init_subscriber(&telemetry, &logger, &settings.log_level)?;

    logger
        .setup(&LoggerOptions {
            service_name: settings.project_name.clone(),
            loki_url: settings.loki_url.clone(),
            enable_console: settings.log_console,
            enable_file: settings.log_file,
            enable_loki: settings.log_loki,
            log_file_path: settings.log_file_path.clone(),
        })
        .context("failed to set up logging")?;

    tracing::info!(
        project = %settings.project_name,
        debug = settings.debug,
        bind_address = %settings.bind_address(),
        "Configuration loaded"
    );

    if let Some(address) = &settings.metrics_address {
        match address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => {
                tracing::error!(metrics_address = %address, error = %e, "Failed to parse metrics address");
            }
        }
    }

    let services = start_services(&settings).await;

    let listener = TcpListener::bind(settings.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address()))?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(services.app_state(Arc::clone(&settings)));
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!("Application startup complete");

    match wait_for_signal().await {
        Ok(signal) => tracing::info!(signal, "Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
    }
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }

    stop_services(&services).await;
    tracing::info!("Application shutdown");

    logger.shutdown(LOG_DRAIN_TIMEOUT).await;
    telemetry.shutdown();
    Ok(())
}
