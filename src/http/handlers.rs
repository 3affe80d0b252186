//! Endpoint handlers.

use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// Dependency readiness report.
///
/// Static: the values are not the result of a live probe.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub services: BTreeMap<&'static str, &'static str>,
}

pub async fn root() -> Json<RootResponse> {
    tracing::info!("Root endpoint accessed");
    Json(RootResponse {
        message: "Hello World",
    })
}

pub async fn health() -> Json<HealthReport> {
    let services = BTreeMap::from([
        ("kafka", "connected"),
        ("database", "connected"),
        ("redis", "connected"),
        ("ollama", "ready"),
    ]);
    Json(HealthReport {
        status: "healthy",
        services,
    })
}
