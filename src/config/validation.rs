//! Configuration validation and list normalization.
//!
//! # Responsibilities
//! - Normalize list-valued variables (JSON array or comma string)
//! - Validate URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: &Settings → Result<(), Vec<ValidationError>>

use std::fmt;
use url::Url;

use crate::config::schema::Settings;

/// A single semantic problem with the loaded settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Normalize a list-valued setting.
///
/// - empty or blank → `[]`
/// - starts with `[` and is valid JSON → must be an array of strings
/// - otherwise → split on commas, trimmed, empty pieces dropped
///
/// A leading `[` that is not JSON at all (`[::1]:9092,[::2]:9092`) falls
/// back to the comma split.
pub fn parse_list(raw: &str) -> Result<Vec<String>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(items) => {
                return Ok(items
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect())
            }
            Err(e) if e.is_data() => return Err(format!("invalid JSON list: {e}")),
            Err(_) => {}
        }
    }

    Ok(trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

fn check_url(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: Option<&str>,
    schemes: &[&str],
) {
    let Some(value) = value else { return };
    match Url::parse(value) {
        Ok(url) if schemes.is_empty() || schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}', expected one of {:?}", url.scheme(), schemes),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {e}"))),
    }
}

/// Validate loaded settings.
pub fn validate_settings(settings: &Settings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.project_name.trim().is_empty() {
        errors.push(ValidationError::new("PROJECT_NAME", "must not be empty"));
    }
    if settings.default_port == 0 {
        errors.push(ValidationError::new("DEFAULT_PORT", "must be non-zero"));
    }
    if settings.kafka_brokers.is_empty() {
        errors.push(ValidationError::new("KAFKA_BROKERS", "at least one broker is required"));
    }
    if settings.log_level.parse::<tracing::Level>().is_err() {
        errors.push(ValidationError::new(
            "LOG_LEVEL",
            format!("unknown level '{}'", settings.log_level),
        ));
    }
    if let Some(addr) = &settings.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new("METRICS_ADDRESS", format!("invalid socket address '{addr}'")));
        }
    }

    check_url(&mut errors, "REDIS_URL", Some(&settings.redis_url), &["redis", "rediss"]);
    check_url(&mut errors, "TEMPO_EXPORTER", settings.tempo_exporter.as_deref(), &["http", "https"]);
    check_url(&mut errors, "LOKI_URL", settings.loki_url.as_deref(), &["http", "https"]);
    check_url(
        &mut errors,
        "DATABASE_WRITE_URL",
        settings.database_write_url.as_deref(),
        &["postgres", "postgresql"],
    );
    check_url(
        &mut errors,
        "DATABASE_READ_URL",
        settings.database_read_url.as_deref(),
        &["postgres", "postgresql"],
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
