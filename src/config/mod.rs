//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! environment variables (or --flags)
//!     → schema.rs (clap derive, typed fields, defaults)
//!     → loader.rs (parse, assemble derived URLs)
//!     → validation.rs (semantic checks)
//!     → Settings (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded
//! - Every variable can also be given as a command-line flag
//! - List values accept a JSON array or a comma-separated string
//! - Validation separates syntactic (clap) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use schema::{HostList, Settings};
