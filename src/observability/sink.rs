use std::fmt;

use crate::observability::record::LogRecord;

/// Kind of destination a sink writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    File,
    Loki,
    Custom,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SinkKind::Console => "console",
            SinkKind::File => "file",
            SinkKind::Loki => "loki",
            SinkKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Destination for enriched [`LogRecord`]s.
///
/// `emit` is called synchronously from the logging layer on the thread that
/// produced the event. Implementations must not panic and must not log
/// through `tracing` themselves; failures go to stderr.
pub trait LogSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    fn emit(&self, record: &LogRecord);

    /// Flush buffered output, if any. Default is a no-op.
    fn flush(&self) {}
}
