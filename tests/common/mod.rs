//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use clap::Parser;
use tower::ServiceExt;

use service_scaffold::config::Settings;
use service_scaffold::lifecycle::Services;
use service_scaffold::observability::{LogRecord, LogSink, SinkKind};
use service_scaffold::AppState;

/// Settings for tests; dependencies point at closed ports.
pub fn test_settings(extra: &[&str]) -> Settings {
    let mut args = vec![
        "service-scaffold",
        "--project-name",
        "test_service",
        "--redis-url",
        "redis://127.0.0.1:1",
        "--kafka-brokers",
        "127.0.0.1:1",
        "--log-file",
        "false",
        "--log-loki",
        "false",
    ];
    args.extend_from_slice(extra);
    Settings::try_parse_from(args).unwrap()
}

/// State with unstarted clients.
pub fn test_state(settings: Settings) -> AppState {
    let settings = Arc::new(settings);
    Services::from_settings(&settings).app_state(settings)
}

/// Send one request through `router` and return status and JSON body.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Sink that keeps every record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.message).collect()
    }
}

impl LogSink for MemorySink {
    fn kind(&self) -> SinkKind {
        SinkKind::Custom
    }

    fn emit(&self, record: &LogRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}
