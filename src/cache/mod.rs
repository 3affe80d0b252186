//! Key-value cache subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle::startup → CacheClient::start (connect + PING)
//! handlers → get / set / delete_pattern (JSON values)
//! lifecycle::startup → CacheClient::stop
//! ```
//!
//! # Design Decisions
//! - One multiplexed connection per process, cloned per call
//! - A failed connect is logged, never fatal; operations become no-ops

pub mod client;

pub use client::{CacheClient, CacheError, DEFAULT_TTL};
