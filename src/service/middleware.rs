//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! - `request` - request count and latency by path pattern, method, status
//! - `batch` - topic rows processed per batch and how many failed
//! - `resolution` - alias resolutions by outcome kind

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "doc_version_kernel::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

fn job_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"branchinherit-[0-9a-f]{32}").expect("job id pattern is valid"))
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Job ids become `:job`; everything under `/Documentation/` collapses to
/// `/Documentation/*`.
fn normalize_path(path: &str) -> String {
    if path.starts_with("/Documentation/") {
        return "/Documentation/*".to_string();
    }
    job_id_pattern().replace_all(path, ":job").to_string()
}

/// Record batch metrics.
pub fn record_batch_metrics(total: usize, failures: usize, latency_ms: u64) {
    info!(
        target: "doc_version_kernel::metrics",
        metric_type = "batch",
        total = total,
        failures = failures,
        latency_ms = latency_ms,
        "batch_metric"
    );
}

/// Record an alias resolution outcome.
pub fn record_resolution(kind: &str) {
    info!(
        target: "doc_version_kernel::metrics",
        metric_type = "resolution",
        result = kind,
        "resolution_metric"
    );
}
