//! Request metrics middleware
//!
//! Counts requests and records per-endpoint latency and status class
//! into application state for the metrics endpoint to render.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Record count, status, and latency for every request.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = normalize_endpoint(request.uri().path());
    state.increment_requests();

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    let status = response.status().as_u16();
    state.record_request(endpoint, status, latency_us).await;

    response
}

/// Collapse identifier path segments so metrics group by route shape
/// instead of by individual resource.
fn normalize_endpoint(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_identifier(segment) {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// UUIDs and bare numbers are treated as identifiers.
fn is_identifier(segment: &str) -> bool {
    if segment.is_empty() {
        return false;
    }
    Uuid::parse_str(segment).is_ok() || segment.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("/api/v1/admin/users/550e8400-e29b-41d4-a716-446655440000"),
            "/api/v1/admin/users/:id"
        );
        assert_eq!(
            normalize_endpoint("/api/v1/admin/users/42/role"),
            "/api/v1/admin/users/:id/role"
        );
        assert_eq!(normalize_endpoint("/api/v1/auth/login"), "/api/v1/auth/login");
        assert_eq!(normalize_endpoint("/health"), "/health");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_identifier("123"));
        assert!(!is_identifier("users"));
        assert!(!is_identifier("v1"));
        assert!(!is_identifier(""));
    }
}
