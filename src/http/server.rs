//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (panic catching, request logging, spans, CORS)
//! - Bind the router to a listener and serve until shutdown

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::broker::ProducerClient;
use crate::cache::CacheClient;
use crate::config::{HostList, Settings};
use crate::database::Database;
use crate::http::error::{handle_panic, not_found};
use crate::http::handlers;
use crate::http::middleware::{log_requests, make_request_span};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub cache: Arc<CacheClient>,
    pub producer: Arc<ProducerClient>,
    /// Absent when no database URL is configured.
    pub database: Option<Arc<Database>>,
}

/// Routes served by the application.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
}

/// Wrap `routes` with the application middleware and attach state.
///
/// Layers run outermost first: request span, request logging, CORS,
/// panic catching, then the handler. Preflight requests answered by CORS
/// are still logged.
pub fn build_router(routes: Router<AppState>, state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);
    routes
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .with_state(state)
}

/// Explicit origins allow credentials; no origins (or `*`) means any
/// origin without credentials.
pub fn cors_layer(origins: &HostList) -> CorsLayer {
    let wildcard = origins.as_slice().iter().any(|o| o == "*");
    if origins.is_empty() || wildcard {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .as_slice()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// HTTP server for the application.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(api_routes(), state),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until a shutdown broadcast arrives, then drain
    /// in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
