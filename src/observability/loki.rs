//! Remote sink for a Loki log aggregator.
//!
//! Records are handed to a bounded channel on the logging thread and shipped
//! by a background task, so network I/O never runs on the caller. Batches
//! are flushed when they reach `batch_size` or every `flush_interval`.
//! A failed push is reported on stderr and the batch is discarded.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::observability::record::LogRecord;
use crate::observability::sink::{LogSink, SinkKind};

#[derive(Debug, Clone)]
pub struct LokiConfig {
    /// Full push URL, e.g. `http://loki:3100/loki/api/v1/push`.
    pub url: String,
    /// Value of the `application` stream label.
    pub service_name: String,
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl LokiConfig {
    pub fn new(url: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_name: service_name.into(),
            channel_buffer: 1024,
            batch_size: 100,
            flush_interval: Duration::from_secs(1),
        }
    }
}

pub struct LokiSink {
    sender: mpsc::Sender<LogRecord>,
    dropped: Arc<AtomicU64>,
}

impl LokiSink {
    /// Create the sink and spawn its shipping task on `runtime`.
    ///
    /// The task ends after a final flush once the sink is dropped.
    pub fn spawn(config: LokiConfig, runtime: &Handle) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.channel_buffer.max(16));
        let handle = runtime.spawn(ship(config, reqwest::Client::new(), receiver));
        (
            Self {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            handle,
        )
    }

    /// Records dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl LogSink for LokiSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Loki
    }

    fn emit(&self, record: &LogRecord) {
        if self.sender.try_send(record.clone()).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

async fn ship(config: LokiConfig, client: reqwest::Client, mut receiver: mpsc::Receiver<LogRecord>) {
    let batch_size = config.batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut ticker = tokio::time::interval(config.flush_interval.max(Duration::from_millis(10)));

    loop {
        tokio::select! {
            received = receiver.recv() => match received {
                Some(record) => {
                    batch.push(record);
                    if batch.len() >= batch_size {
                        push(&client, &config, &mut batch).await;
                    }
                }
                None => {
                    push(&client, &config, &mut batch).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                push(&client, &config, &mut batch).await;
            }
        }
    }
}

async fn push(client: &reqwest::Client, config: &LokiConfig, batch: &mut Vec<LogRecord>) {
    if batch.is_empty() {
        return;
    }
    let body = push_body(&config.service_name, batch);
    batch.clear();

    let result = client
        .post(&config.url)
        .json(&body)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status);
    if let Err(e) = result {
        eprintln!("loki push to {} failed: {}", config.url, e);
    }
}

/// Build a Loki push API payload, one stream per (level, logger) pair.
pub fn push_body(service_name: &str, records: &[LogRecord]) -> serde_json::Value {
    let mut streams: BTreeMap<(String, String), Vec<serde_json::Value>> = BTreeMap::new();

    for record in records {
        let key = (record.level.to_lowercase(), record.logger.clone());
        let timestamp = record
            .timestamp
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string();
        let line = serde_json::to_string(record).unwrap_or_else(|_| record.rendered_message());
        streams
            .entry(key)
            .or_default()
            .push(json!([timestamp, line]));
    }

    let streams: Vec<_> = streams
        .into_iter()
        .map(|((level, logger), values)| {
            json!({
                "stream": {
                    "application": service_name,
                    "level": level,
                    "logger": logger,
                },
                "values": values,
            })
        })
        .collect();

    json!({ "streams": streams })
}
