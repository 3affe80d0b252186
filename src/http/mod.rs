//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, CORS)
//!     → middleware/ (request span, request logging, panic catching)
//!     → handlers.rs (root, health)
//!     → error.rs (declared faults, opaque 500s, 404 fallback)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use error::AppError;
pub use server::{api_routes, build_router, AppState, HttpServer};
