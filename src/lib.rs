//! HTTP service scaffold library.
//!
//! Wires an Axum application to a Redis cache, a Kafka producer, a pair of
//! PostgreSQL pools and a trace-correlated logging pipeline.

pub mod broker;
pub mod cache;
pub mod config;
pub mod database;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::Settings;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use observability::AppLogger;
