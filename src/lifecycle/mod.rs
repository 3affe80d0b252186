//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → build clients → connect cache → connect broker
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → HTTP server drains → stop broker → stop cache
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config and logging first, then clients, then listener
//! - Ordered teardown: stop accepting, drain, then release clients

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{start_services, stop_services, Services};
