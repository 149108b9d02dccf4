//! # Request Metrics
//!
//! Per-request counters and latency histograms through the `metrics`
//! facade. Record ids in paths are collapsed to `{id}` so label
//! cardinality stays bounded.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Collapse the record-id segment of `/v1/records/{id}[/...]`.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["", "v1", "records", _id, rest @ ..] => {
            let mut out = String::from("/v1/records/{id}");
            for segment in rest {
                out.push('/');
                out.push_str(segment);
            }
            out
        }
        _ => path.to_string(),
    }
}

/// Record `sealreg_http_requests_total{method,path,status}` and
/// `sealreg_http_request_duration_seconds{method,path}`.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    metrics::counter!(
        "sealreg_http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(
        "sealreg_http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(start.elapsed().as_secs_f64());

    response
}
