//! HTTP surface tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use opentelemetry::trace::TracerProvider as _;
use serde_json::json;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;

use service_scaffold::http::{api_routes, build_router, AppError, AppState, HttpServer};
use service_scaffold::lifecycle::Shutdown;
use service_scaffold::AppLogger;

mod common;

use common::{get as get_request, send, test_settings, test_state, MemorySink};

fn app() -> Router {
    build_router(api_routes(), test_state(test_settings(&[])))
}

async fn failing() -> Result<&'static str, AppError> {
    Err(anyhow::anyhow!("connection reset by peer").into())
}

async fn declared() -> Result<&'static str, AppError> {
    Err(AppError::http(StatusCode::FORBIDDEN, "Not allowed"))
}

async fn panicking() -> &'static str {
    panic!("handler blew up")
}

fn app_with_faults() -> Router {
    let routes = api_routes()
        .route("/fail", get(failing))
        .route("/declared", get(declared))
        .route("/panic", get(panicking));
    build_router(routes, test_state(test_settings(&[])))
}

#[tokio::test]
async fn test_health_reports_static_status() {
    let (status, body) = send(app(), get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "healthy",
            "services": {
                "kafka": "connected",
                "database": "connected",
                "redis": "connected",
                "ollama": "ready",
            }
        })
    );
}

#[tokio::test]
async fn test_root() {
    let (status, body) = send(app(), get_request("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Hello World"}));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, body) = send(app(), get_request("/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not Found"}));
}

#[tokio::test]
async fn test_internal_error_is_opaque_500() {
    let (status, body) = send(app_with_faults(), get_request("/fail")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({
            "detail": "Internal Server Error",
            "message": "An unexpected error occurred. Please contact support.",
        })
    );
}

#[tokio::test]
async fn test_panic_is_opaque_500() {
    let (status, body) = send(app_with_faults(), get_request("/panic")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Internal Server Error");
    assert!(!body.to_string().contains("blew up"));
}

#[tokio::test]
async fn test_declared_error_passes_through() {
    let (status, body) = send(app_with_faults(), get_request("/declared")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"detail": "Not allowed"}));
}

#[tokio::test]
async fn test_cors_any_origin_by_default() {
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://somewhere.example")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app(), request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn test_cors_configured_origins_allow_credentials() {
    let state: AppState = test_state(test_settings(&[
        "--cors-origins",
        "http://localhost:3000, https://app.example.com",
    ]));
    let router = build_router(api_routes(), state);

    let request = Request::builder()
        .uri("/health")
        .header("origin", "https://app.example.com")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(router, request).await.unwrap();
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://app.example.com"
    );
    assert_eq!(
        response.headers()["access-control-allow-credentials"],
        "true"
    );
}

/// Subscriber with the OpenTelemetry bridge and an in-memory logger.
///
/// The provider must outlive the subscriber for spans to get trace ids.
fn traced_logger() -> (
    Arc<MemorySink>,
    opentelemetry_sdk::trace::TracerProvider,
    impl tracing::Subscriber + Send + Sync,
) {
    let sink = Arc::new(MemorySink::default());
    let logger = AppLogger::with_sinks("http_test", vec![sink.clone()]);
    let provider = opentelemetry_sdk::trace::TracerProvider::builder().build();
    let subscriber = tracing_subscriber::registry()
        .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("http_test")))
        .with(logger.layer());
    (sink, provider, subscriber)
}

#[tokio::test]
async fn test_request_logs_share_one_trace_id() {
    let (sink, _provider, subscriber) = traced_logger();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (status, _) = send(app(), get_request("/")).await;
    assert_eq!(status, StatusCode::OK);

    let records = sink.records();
    let ids: Vec<_> = records
        .iter()
        .filter(|r| {
            ["Request started", "Root endpoint accessed", "Request completed"]
                .contains(&r.message.as_str())
        })
        .map(|r| r.trace_id.clone())
        .collect();
    assert_eq!(ids.len(), 3, "{:?}", sink.messages());
    assert_eq!(ids[0].len(), 32);
    assert!(ids.iter().all(|id| id == &ids[0]));

    let completed = records
        .iter()
        .find(|r| r.message == "Request completed")
        .unwrap();
    assert_eq!(completed.fields["status"], 200);
    assert_eq!(completed.fields["method"], "GET");
    assert_eq!(completed.fields["path"], "/");
}

#[tokio::test]
async fn test_traceparent_joins_remote_trace() {
    let (sink, _provider, subscriber) = traced_logger();
    let _guard = tracing::subscriber::set_default(subscriber);

    let request = Request::builder()
        .uri("/health")
        .header(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        )
        .body(Body::empty())
        .unwrap();
    send(app(), request).await;

    let completed = sink
        .records()
        .into_iter()
        .find(|r| r.message == "Request completed")
        .unwrap();
    assert_eq!(completed.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
}

#[tokio::test]
async fn test_cors_preflight_is_logged() {
    let (sink, _provider, subscriber) = traced_logger();
    let _guard = tracing::subscriber::set_default(subscriber);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/health")
        .header("origin", "http://somewhere.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let completed = sink
        .records()
        .into_iter()
        .find(|r| r.message == "Request completed")
        .unwrap();
    assert_eq!(completed.fields["method"], "OPTIONS");
    assert_eq!(completed.fields["status"], 200);
    assert_eq!(completed.trace_id.len(), 32);
}

#[tokio::test]
async fn test_server_serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(test_state(test_settings(&[])));
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let body: serde_json::Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");

    shutdown.trigger();
    let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
