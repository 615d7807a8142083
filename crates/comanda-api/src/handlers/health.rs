//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadinessChecks {
    pub database: bool,
}

/// Readiness probe - checks the storage backend
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = state.store.ping().await.is_ok();
    let ready = state.is_ready() && database;

    let response = ReadinessResponse {
        ready,
        checks: ReadinessChecks { database },
    };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus-compatible metrics endpoint
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();

    let mut output = String::new();

    output.push_str("# HELP comanda_uptime_seconds Time since server start\n");
    output.push_str("# TYPE comanda_uptime_seconds gauge\n");
    let _ = writeln!(output, "comanda_uptime_seconds {uptime}");
    output.push('\n');

    output.push_str("# HELP comanda_requests_total Total number of HTTP requests\n");
    output.push_str("# TYPE comanda_requests_total counter\n");
    let _ = writeln!(output, "comanda_requests_total {total_requests}");
    output.push('\n');

    output.push_str("# HELP comanda_build_info Build information\n");
    output.push_str("# TYPE comanda_build_info gauge\n");
    let _ = writeln!(
        output,
        "comanda_build_info{{version=\"{}\"}} 1",
        env!("CARGO_PKG_VERSION")
    );
    output.push('\n');

    let snapshot = state.metrics_snapshot().await;

    output.push_str("# HELP comanda_http_requests_total HTTP requests by endpoint\n");
    output.push_str("# TYPE comanda_http_requests_total counter\n");
    for (endpoint, metrics) in &snapshot {
        let _ = writeln!(
            output,
            "comanda_http_requests_total{{endpoint=\"{endpoint}\"}} {}",
            metrics.requests
        );
    }
    output.push('\n');

    output.push_str("# HELP comanda_http_request_errors_total Error responses by endpoint and class\n");
    output.push_str("# TYPE comanda_http_request_errors_total counter\n");
    for (endpoint, metrics) in &snapshot {
        let _ = writeln!(
            output,
            "comanda_http_request_errors_total{{endpoint=\"{endpoint}\",class=\"4xx\"}} {}",
            metrics.client_errors
        );
        let _ = writeln!(
            output,
            "comanda_http_request_errors_total{{endpoint=\"{endpoint}\",class=\"5xx\"}} {}",
            metrics.server_errors
        );
    }
    output.push('\n');

    output.push_str("# HELP comanda_http_request_duration_seconds HTTP request latency\n");
    output.push_str("# TYPE comanda_http_request_duration_seconds summary\n");
    for (endpoint, metrics) in &snapshot {
        if metrics.requests == 0 {
            continue;
        }
        let sum_s = metrics.total_latency_us as f64 / 1_000_000.0;
        let max_s = metrics.max_latency_us as f64 / 1_000_000.0;
        let _ = writeln!(
            output,
            "comanda_http_request_duration_seconds_sum{{endpoint=\"{endpoint}\"}} {sum_s:.6}"
        );
        let _ = writeln!(
            output,
            "comanda_http_request_duration_seconds_count{{endpoint=\"{endpoint}\"}} {}",
            metrics.requests
        );
        let _ = writeln!(
            output,
            "comanda_http_request_duration_seconds_max{{endpoint=\"{endpoint}\"}} {max_s:.6}"
        );
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        output,
    )
}
