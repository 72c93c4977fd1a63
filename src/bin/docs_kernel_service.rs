//! Documentation Kernel Service Binary
//!
//! Runs the kernel as a REST API service over an in-memory wiki:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DOCS_SEED_FILE`: JSON wiki snapshot to load at startup (default: empty wiki)
//! - `DOCS_PREVIEW_GROUPS`: groups that see unreleased versions (default: docteam,employees)
//! - `DOCS_AUTHOR_GROUPS`: groups that may branch/inherit (default: docteam)
//! - `DOCS_*`: kernel settings, see `KernelConfig::from_env`
//! - `PORT`: Service port (default: 8001)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! DOCS_SEED_FILE=wiki.json cargo run --bin docs_kernel_service --features service
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use doc_version_kernel::service::{create_router, metrics_middleware, ServiceState};
use doc_version_kernel::{DocsKernel, GroupAccessPolicy, InMemoryWiki, KernelConfig, WikiSnapshot};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docs_kernel_service=info,doc_version_kernel=info,batch=info,tower_http=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let trace_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "docs_kernel_service::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

fn groups_from_env(name: &str, default: &[&str]) -> Vec<String> {
    match std::env::var(name) {
        Ok(list) if !list.trim().is_empty() => list
            .split(',')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect(),
        _ => default.iter().map(|g| g.to_string()).collect(),
    }
}

fn load_wiki() -> Result<InMemoryWiki, Box<dyn std::error::Error>> {
    let Ok(path) = std::env::var("DOCS_SEED_FILE") else {
        warn!("DOCS_SEED_FILE not set, starting with an empty wiki");
        return Ok(InMemoryWiki::new());
    };
    let raw = std::fs::read_to_string(&path)?;
    let snapshot: WikiSnapshot = serde_json::from_str(&raw)?;
    info!(path = %path, pages = snapshot.pages.len(), "Loaded wiki snapshot");
    Ok(InMemoryWiki::from_snapshot(snapshot))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");
    info!(version = version, build_sha = build_sha, "Starting Documentation Kernel Service");

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8001);
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    let config = KernelConfig::from_env();
    let policy = GroupAccessPolicy::new(
        groups_from_env("DOCS_PREVIEW_GROUPS", &["docteam", "employees"]),
        groups_from_env("DOCS_AUTHOR_GROUPS", &["docteam"]),
    );

    let load_start = Instant::now();
    let wiki = load_wiki()?;
    let kernel = DocsKernel::load(Arc::new(wiki), Arc::new(policy), config).await?;

    let state = ServiceState::new(kernel);
    info!(
        versions = state.kernel.registry().all().len(),
        manuals = state.kernel.manuals().manuals().len(),
        definitions_fingerprint = %state.definitions_fingerprint(),
        latency_ms = load_start.elapsed().as_millis() as u64,
        "Kernel initialized"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(address = %addr, version = version, "Documentation Kernel Service listening");

    let listener = TcpListener::bind(addr).await?;
    info!("Ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Documentation Kernel Service shutdown complete");
    Ok(())
}
