//! Log records and field capture.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::field::{Field, Visit};

use crate::observability::trace_filter::NO_TRACE_ID;

/// One log event on its way through the sink pipeline.
///
/// `trace_id` is always populated: either the 32-character hex id of the
/// active trace or [`NO_TRACE_ID`].
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    /// Logger name; the `tracing` target of the event.
    pub logger: String,
    pub message: String,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub trace_id: String,
}

impl LogRecord {
    pub fn new(level: &tracing::Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level: level.to_string(),
            logger: logger.into(),
            message: message.into(),
            fields: BTreeMap::new(),
            trace_id: NO_TRACE_ID.to_string(),
        }
    }

    /// Message followed by the structured fields as `key=value` pairs.
    pub fn rendered_message(&self) -> String {
        let mut out = self.message.clone();
        for (key, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            match value {
                serde_json::Value::String(s) => {
                    let _ = write!(out, "{key}={s}");
                }
                other => {
                    let _ = write!(out, "{key}={other}");
                }
            }
        }
        out
    }
}

/// Collects the message and fields of a `tracing` event.
pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut String,
}

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `info!("...")` arrives here as fmt::Arguments
        if field.name() == "message" {
            *self.message = format!("{:?}", value);
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(format!("{:?}", value)),
            );
        }
    }
}
