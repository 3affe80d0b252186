//! Size-bounded rotating file sink.
//!
//! The active file is `<path>`. When writing a record would push it past
//! `max_bytes`, the generations shift (`<path>.N-1` → `<path>.N`, ...,
//! `<path>` → `<path>.1`), the oldest generation beyond `backup_count` is
//! dropped, and a fresh `<path>` is started.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::observability::record::LogRecord;
use crate::observability::sink::{LogSink, SinkKind};

/// Rotate once the active file reaches 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Keep five rotated generations.
pub const DEFAULT_BACKUP_COUNT: usize = 5;

const FILE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

struct ActiveFile {
    file: File,
    written: u64,
}

pub struct RotatingFileSink {
    path: PathBuf,
    max_bytes: u64,
    backup_count: usize,
    active: Mutex<ActiveFile>,
}

impl RotatingFileSink {
    /// Open (or append to) `path` with the default thresholds.
    ///
    /// The parent directory must exist.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        Self::with_limits(path, DEFAULT_MAX_BYTES, DEFAULT_BACKUP_COUNT)
    }

    pub fn with_limits(
        path: impl Into<PathBuf>,
        max_bytes: u64,
        backup_count: usize,
    ) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            backup_count,
            active: Mutex::new(ActiveFile { file, written }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(record: &LogRecord) -> String {
        format!(
            "{} - {} - {} - [TraceID: {}] - {}",
            record.timestamp.format(FILE_TIME_FORMAT),
            record.logger,
            record.level,
            record.trace_id,
            record.rendered_message()
        )
    }

    fn generation(&self, n: usize) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate(&self, active: &mut ActiveFile) -> io::Result<()> {
        active.file.flush()?;

        if self.backup_count > 0 {
            let oldest = self.generation(self.backup_count);
            if oldest.exists() {
                fs::remove_file(&oldest)?;
            }
            for n in (1..self.backup_count).rev() {
                let from = self.generation(n);
                if from.exists() {
                    fs::rename(&from, self.generation(n + 1))?;
                }
            }
            fs::rename(&self.path, self.generation(1))?;
        }

        active.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        active.written = 0;
        Ok(())
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let len = line.len() as u64 + 1;
        if self.max_bytes > 0 && active.written > 0 && active.written + len > self.max_bytes {
            self.rotate(&mut active)?;
        }

        writeln!(active.file, "{line}")?;
        active.written += len;
        Ok(())
    }
}

impl LogSink for RotatingFileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    fn emit(&self, record: &LogRecord) {
        if let Err(e) = self.write_line(&Self::format(record)) {
            eprintln!("log file {} write failed: {}", self.path.display(), e);
        }
    }

    fn flush(&self) {
        if let Ok(mut active) = self.active.lock() {
            let _ = active.file.flush();
        }
    }
}
