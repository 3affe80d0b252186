//! Structured logging.
//!
//! # Responsibilities
//! - Own the set of log sinks (console, rotating file, Loki)
//! - Turn `tracing` events into [`LogRecord`]s
//! - Stamp every record with the active trace id before dispatch
//!
//! # Design Decisions
//! - One [`AppLogger`] is built at startup and installed into the global
//!   subscriber through [`AppLogger::layer`]; clones share state
//! - [`AppLogger::setup`] can run any number of times: each call builds a
//!   fresh sink set and swaps it in atomically, so sinks never accumulate
//! - Enrichment happens once per record, before any sink sees it

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::observability::console::ConsoleSink;
use crate::observability::loki::{LokiConfig, LokiSink};
use crate::observability::record::{FieldVisitor, LogRecord};
use crate::observability::rotating::RotatingFileSink;
use crate::observability::sink::{LogSink, SinkKind};
use crate::observability::trace_filter::{scope_trace_id, TraceIdFilter};

type SinkSet = Vec<Arc<dyn LogSink>>;

/// HTTP client internals used by the remote sink and the span exporter.
/// Below `WARN` their events would feed the Loki sink its own pushes.
const TRANSPORT_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "tonic", "tower"];

fn is_transport_noise(meta: &tracing::Metadata<'_>) -> bool {
    *meta.level() > Level::WARN
        && TRANSPORT_TARGETS.iter().any(|prefix| {
            meta.target()
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to open log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which sinks [`AppLogger::setup`] attaches.
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Tag for the remote sink (`application` label).
    pub service_name: String,
    /// Loki push URL; required for the remote sink.
    pub loki_url: Option<String>,
    pub enable_console: bool,
    pub enable_file: bool,
    pub enable_loki: bool,
    pub log_file_path: PathBuf,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            service_name: env!("CARGO_PKG_NAME").to_string(),
            loki_url: None,
            enable_console: true,
            enable_file: true,
            enable_loki: false,
            log_file_path: PathBuf::from("logs/app.log"),
        }
    }
}

struct LoggerShared {
    name: String,
    level: ArcSwap<Level>,
    filter: TraceIdFilter,
    sinks: ArcSwap<SinkSet>,
    shippers: Mutex<Vec<JoinHandle<()>>>,
}

/// Process-wide logging context.
#[derive(Clone)]
pub struct AppLogger {
    shared: Arc<LoggerShared>,
}

impl AppLogger {
    /// A logger with no sinks at `INFO` level.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_sinks(name, Vec::new())
    }

    /// A logger with a caller-supplied sink set.
    pub fn with_sinks(name: impl Into<String>, sinks: SinkSet) -> Self {
        Self {
            shared: Arc::new(LoggerShared {
                name: name.into(),
                level: ArcSwap::from_pointee(Level::INFO),
                filter: TraceIdFilter,
                sinks: ArcSwap::from_pointee(sinks),
                shippers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Set the most verbose level dispatched to sinks. Shared by all clones
    /// and layers of this logger.
    pub fn with_level(self, level: Level) -> Self {
        self.shared.level.store(Arc::new(level));
        self
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn level(&self) -> Level {
        **self.shared.level.load()
    }

    pub fn sink_count(&self) -> usize {
        self.shared.sinks.load().len()
    }

    pub fn sink_kinds(&self) -> Vec<SinkKind> {
        self.shared.sinks.load().iter().map(|s| s.kind()).collect()
    }

    /// (Re)configure the sinks of this logger.
    ///
    /// Replaces whatever sinks were attached before. A remote sink requested
    /// without an endpoint is skipped with a warning.
    pub fn setup(&self, options: &LoggerOptions) -> Result<&Self, LoggerError> {
        let mut sinks: SinkSet = Vec::new();
        let mut warnings = Vec::new();

        if options.enable_console {
            sinks.push(Arc::new(ConsoleSink::stderr()));
        }

        if options.enable_file {
            let path = &options.log_file_path;
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir).map_err(|source| LoggerError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
            }
            let sink = RotatingFileSink::open(path).map_err(|source| LoggerError::Io {
                path: path.clone(),
                source,
            })?;
            sinks.push(Arc::new(sink));
        }

        if options.enable_loki {
            match (&options.loki_url, tokio::runtime::Handle::try_current()) {
                (Some(url), Ok(runtime)) => {
                    let config = LokiConfig::new(url.clone(), options.service_name.clone());
                    let (sink, handle) = LokiSink::spawn(config, &runtime);
                    sinks.push(Arc::new(sink));
                    if let Ok(mut shippers) = self.shared.shippers.lock() {
                        shippers.retain(|h| !h.is_finished());
                        shippers.push(handle);
                    }
                }
                (None, _) => warnings.push("Loki logging enabled but no URL provided"),
                (Some(_), Err(_)) => {
                    warnings.push("Loki logging enabled but no async runtime is running")
                }
            }
        }

        let previous = self.shared.sinks.swap(Arc::new(sinks));
        for sink in previous.iter() {
            sink.flush();
        }

        for warning in warnings {
            tracing::warn!(logger = %self.shared.name, "{}", warning);
        }
        tracing::debug!(
            logger = %self.shared.name,
            sinks = ?self.sink_kinds(),
            "Logger configured"
        );

        Ok(self)
    }

    /// Flush every attached sink.
    pub fn flush(&self) {
        for sink in self.shared.sinks.load().iter() {
            sink.flush();
        }
    }

    /// Detach all sinks and wait up to `timeout` for remote shippers to
    /// push what they still hold.
    pub async fn shutdown(&self, timeout: Duration) {
        let previous = self.shared.sinks.swap(Arc::new(Vec::new()));
        for sink in previous.iter() {
            sink.flush();
        }
        drop(previous);

        let shippers = match self.shared.shippers.lock() {
            Ok(mut shippers) => std::mem::take(&mut *shippers),
            Err(_) => Vec::new(),
        };
        for shipper in shippers {
            if tokio::time::timeout(timeout, shipper).await.is_err() {
                eprintln!("log shipper did not finish within {timeout:?}");
            }
        }
    }

    /// The `tracing_subscriber` layer that feeds this logger.
    pub fn layer(&self) -> AppLogLayer {
        AppLogLayer {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Layer that converts events into records and dispatches them to the
/// sinks of an [`AppLogger`].
pub struct AppLogLayer {
    shared: Arc<LoggerShared>,
}

impl<S> Layer<S> for AppLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > **self.shared.level.load() || is_transport_noise(meta) {
            return;
        }

        let sinks = self.shared.sinks.load();
        if sinks.is_empty() {
            return;
        }

        let mut record = LogRecord::new(meta.level(), meta.target(), String::new());
        let mut visitor = FieldVisitor {
            fields: &mut record.fields,
            message: &mut record.message,
        };
        event.record(&mut visitor);

        let trace_id = scope_trace_id(ctx.event_scope(event));
        let record = self.shared.filter.enrich(record, trace_id);

        for sink in sinks.iter() {
            sink.emit(&record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::TracerProvider as _;
    use std::io::{self, Write};
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct CollectingSink(Mutex<Vec<LogRecord>>);

    impl LogSink for CollectingSink {
        fn kind(&self) -> SinkKind {
            SinkKind::Custom
        }

        fn emit(&self, record: &LogRecord) {
            self.0.lock().unwrap().push(record.clone());
        }
    }

    fn unique_name() -> String {
        format!("test_logger_{}", uuid::Uuid::new_v4().simple())
    }

    fn options(console: bool, file: bool, loki: bool) -> LoggerOptions {
        LoggerOptions {
            service_name: "test_service".into(),
            loki_url: None,
            enable_console: console,
            enable_file: file,
            enable_loki: loki,
            log_file_path: PathBuf::from("logs/app.log"),
        }
    }

    #[test]
    fn test_new_logger_defaults() {
        let logger = AppLogger::new(unique_name());
        assert!(logger.name().starts_with("test_logger_"));
        assert_eq!(logger.level(), Level::INFO);
        assert_eq!(logger.sink_count(), 0);
    }

    #[test]
    fn test_console_setup() {
        let logger = AppLogger::new(unique_name());
        logger.setup(&options(true, false, false)).unwrap();
        assert_eq!(logger.sink_kinds(), vec![SinkKind::Console]);
    }

    #[test]
    fn test_repeated_setup_does_not_duplicate_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let logger = AppLogger::new(unique_name());

        let mut first = options(true, true, false);
        first.log_file_path = dir.path().join("app.log");
        logger.setup(&first).unwrap();
        assert_eq!(logger.sink_count(), 2);

        logger.setup(&options(true, false, false)).unwrap();
        assert_eq!(logger.sink_kinds(), vec![SinkKind::Console]);

        logger.setup(&options(true, false, false)).unwrap();
        assert_eq!(logger.sink_count(), 1);
    }

    #[test]
    fn test_file_setup_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom_logs").join("nested").join("custom.log");
        let logger = AppLogger::new(unique_name());

        let mut opts = options(false, true, false);
        opts.log_file_path = path.clone();
        logger.setup(&opts).unwrap();

        assert!(path.parent().unwrap().is_dir());
        assert!(path.exists());
        assert_eq!(logger.sink_kinds(), vec![SinkKind::File]);
    }

    #[test]
    fn test_loki_without_url_warns_and_skips() {
        let captured = Captured::default();
        let observer = AppLogger::with_sinks(
            "observer",
            vec![Arc::new(ConsoleSink::with_writer(Box::new(captured.clone())))],
        );
        let subscriber = tracing_subscriber::registry().with(observer.layer());

        let logger = AppLogger::new(unique_name());
        tracing::subscriber::with_default(subscriber, || {
            logger.setup(&options(true, false, true)).unwrap();
        });

        assert_eq!(logger.sink_kinds(), vec![SinkKind::Console]);
        let output = captured.text();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("no URL provided"), "{output}");
    }

    #[test]
    fn test_level_filtering() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let logger = AppLogger::with_sinks(unique_name(), vec![sink.clone()]);
        let subscriber = tracing_subscriber::registry().with(logger.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("too verbose");
            tracing::info!(user = "alice", "kept");
        });

        let records = sink.0.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "kept");
        assert_eq!(records[0].fields["user"], "alice");
    }

    #[test]
    fn test_transport_debug_events_are_dropped() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let logger = AppLogger::with_sinks(unique_name(), vec![sink.clone()]).with_level(Level::DEBUG);
        let subscriber = tracing_subscriber::registry().with(logger.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "reqwest::connect", "starting new connection");
            tracing::debug!(target: "hyper_util::client::legacy::pool", "pooling idle connection");
            tracing::warn!(target: "reqwest::connect", "connection refused");
            tracing::debug!(target: "hyperion", "not a transport target");
        });

        let messages: Vec<_> = sink.0.lock().unwrap().iter().map(|r| r.message.clone()).collect();
        assert_eq!(messages, vec!["connection refused", "not a transport target"]);
    }

    #[tokio::test]
    async fn test_with_level_keeps_loki_shippers() {
        let logger = AppLogger::new(unique_name());
        let mut opts = options(false, false, true);
        opts.loki_url = Some("http://127.0.0.1:1/loki/api/v1/push".into());
        logger.setup(&opts).unwrap();

        let early_clone = logger.clone();
        let logger = logger.with_level(Level::WARN);
        assert_eq!(early_clone.level(), Level::WARN);
        assert_eq!(logger.shared.shippers.lock().unwrap().len(), 1);

        logger.shutdown(Duration::from_secs(5)).await;
        assert!(logger.shared.shippers.lock().unwrap().is_empty());
    }

    #[test]
    fn test_records_without_span_carry_sentinel() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let logger = AppLogger::with_sinks(unique_name(), vec![sink.clone()]);
        let provider = opentelemetry_sdk::trace::TracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")))
            .with(logger.layer());

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("outside any span");
        });

        let records = sink.0.lock().unwrap();
        assert_eq!(records[0].trace_id, "0");
    }

    #[test]
    fn test_records_inside_span_carry_trace_id() {
        let sink = Arc::new(CollectingSink(Mutex::new(Vec::new())));
        let logger = AppLogger::with_sinks(unique_name(), vec![sink.clone()]);
        let provider = opentelemetry_sdk::trace::TracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")))
            .with(logger.layer());

        tracing::subscriber::with_default(subscriber, || {
            let outer = tracing::info_span!("request");
            let _outer = outer.enter();
            tracing::info!("in outer");
            let inner = tracing::info_span!("db_query");
            let _inner = inner.enter();
            tracing::info!("in inner");
        });

        let records = sink.0.lock().unwrap();
        assert_eq!(records.len(), 2);
        let trace_id = &records[0].trace_id;
        assert_eq!(trace_id.len(), 32);
        assert!(trace_id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(trace_id, &"0".repeat(32));
        // child span shares the trace
        assert_eq!(&records[1].trace_id, trace_id);
    }
}
