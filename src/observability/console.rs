//! Console sink.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::observability::record::LogRecord;
use crate::observability::sink::{LogSink, SinkKind};

const CONSOLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes `<LEVEL> | <timestamp> | <message>` lines, to stderr by default.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(io::stderr()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn format(record: &LogRecord) -> String {
        format!(
            "{} | {} | {}",
            record.level,
            record.timestamp.format(CONSOLE_TIME_FORMAT),
            record.rendered_message()
        )
    }
}

impl LogSink for ConsoleSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    fn emit(&self, record: &LogRecord) {
        let line = Self::format(record);
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
        }
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_console_format() {
        let mut record = LogRecord::new(&tracing::Level::INFO, "app", "Application startup complete");
        record.timestamp = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            ConsoleSink::format(&record),
            "INFO | 2024-05-01 12:30:00 | Application startup complete"
        );
    }
}
