//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the OpenTelemetry tracer provider for the service
//! - Export spans over OTLP/gRPC when a collector endpoint is configured
//! - Extract W3C trace context from incoming request headers
//! - Install the global subscriber (filter, OpenTelemetry bridge, logger)
//!
//! # Design Decisions
//! - A provider is always built so every `tracing` span carries a trace id;
//!   without an endpoint spans are simply not exported
//! - Export uses the batch processor on the tokio runtime
//! - The level filter applies to log events only; spans are always built
//!   so records logged inside a request keep its trace id at any level

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use tracing::Subscriber;
use tracing_subscriber::filter::{filter_fn, FilterExt};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::observability::logging::AppLogger;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to build span exporter for {endpoint}: {message}")]
    Exporter { endpoint: String, message: String },
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("global subscriber already installed: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Owns the tracer provider; flushes pending spans on shutdown.
pub struct Telemetry {
    provider: TracerProvider,
    service_name: String,
}

impl Telemetry {
    pub fn provider(&self) -> &TracerProvider {
        &self.provider
    }

    pub fn tracer(&self) -> opentelemetry_sdk::trace::Tracer {
        self.provider.tracer(self.service_name.clone())
    }

    pub fn shutdown(self) {
        if let Err(e) = self.provider.shutdown() {
            eprintln!("tracer provider shutdown failed: {e}");
        }
    }
}

/// Build the tracer provider tagged with `service_name` and register it
/// globally along with the W3C propagator.
///
/// Must be called from within a tokio runtime when `endpoint` is set.
pub fn init_tracer_provider(
    service_name: &str,
    endpoint: Option<&str>,
) -> Result<Telemetry, TelemetryError> {
    let resource = Resource::new(vec![KeyValue::new("service.name", service_name.to_string())]);
    let mut builder = TracerProvider::builder().with_resource(resource);

    if let Some(endpoint) = endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| TelemetryError::Exporter {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;
        builder = builder.with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio);
    }

    let provider = builder.build();
    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TraceContextPropagator::new());

    Ok(Telemetry {
        provider,
        service_name: service_name.to_string(),
    })
}

/// Default filter directives for `level`.
///
/// HTTP client internals are capped at `warn` so the remote log sink does not
/// log its own pushes.
pub fn default_directives(level: &str) -> String {
    format!("{level},h2=warn,hyper=warn,hyper_util=warn,reqwest=warn,tonic=warn,tower=warn,rdkafka=warn")
}

/// Subscriber stack: the OpenTelemetry bridge sees every application span,
/// the logger sees events passing `filter`.
///
/// Spans pass the logger's filter too, otherwise a record logged inside a
/// span the level would hide loses that span's trace id.
pub fn build_subscriber(
    tracer: opentelemetry_sdk::trace::Tracer,
    logger: &AppLogger,
    filter: EnvFilter,
) -> Result<impl Subscriber + for<'a> LookupSpan<'a> + Send + Sync, TelemetryError> {
    let span_filter = EnvFilter::try_new(default_directives("trace"))?;
    let event_filter = filter.or(filter_fn(|meta| meta.is_span()));

    Ok(tracing_subscriber::registry()
        .with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer)
                .with_filter(span_filter),
        )
        .with(logger.layer().with_filter(event_filter)))
}

/// Install the global subscriber: `RUST_LOG` (or `level`), the OpenTelemetry
/// bridge and the application logger.
pub fn init_subscriber(
    telemetry: &Telemetry,
    logger: &AppLogger,
    level: &str,
) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(level))?,
    };

    build_subscriber(telemetry.tracer(), logger, filter)?.try_init()?;
    Ok(())
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Remote parent context carried by `traceparent`/`tracestate` headers.
pub fn extract_remote_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}
