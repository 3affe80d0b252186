//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing event
//!     → logging.rs (AppLogLayer: fields → LogRecord)
//!     → trace_filter.rs (stamp active trace id)
//!     → sinks: console.rs | rotating.rs | loki.rs
//!
//! tracing span
//!     → tracing.rs (OpenTelemetry bridge → OTLP exporter)
//!
//! HTTP middleware
//!     → metrics.rs (counters, histograms → Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Log records carry the trace id so logs and spans can be joined
//! - Sinks never fail the caller; problems are reported on stderr
//! - Metrics are cheap (no-op without an installed recorder)

pub mod console;
pub mod logging;
pub mod loki;
pub mod metrics;
pub mod record;
pub mod rotating;
pub mod sink;
pub mod trace_filter;
pub mod tracing;

pub use logging::{AppLogger, LoggerError, LoggerOptions};
pub use record::LogRecord;
pub use sink::{LogSink, SinkKind};
pub use self::tracing::{Telemetry, TelemetryError};
