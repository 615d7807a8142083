//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::token::TokenCodec;
use comanda_core::config::AppConfig;
use comanda_core::UserStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Per-endpoint request statistics.
#[derive(Debug, Clone, Default)]
pub struct EndpointMetrics {
    /// Total requests observed
    pub requests: u64,
    /// Responses with a 4xx status
    pub client_errors: u64,
    /// Responses with a 5xx status
    pub server_errors: u64,
    /// Sum of per-request latency in microseconds
    pub total_latency_us: u64,
    /// Slowest observed request in microseconds
    pub max_latency_us: u64,
}

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// User and role storage backend
    pub store: Arc<dyn UserStore>,
    /// Token signer and verifier
    pub codec: TokenCodec,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Ready status
    pub is_ready: AtomicBool,
    /// Per-endpoint metrics, keyed by normalized path
    pub metrics: RwLock<HashMap<String, EndpointMetrics>>,
}

impl AppState {
    /// Create new application state with config and storage backend.
    pub fn new(config: AppConfig, store: Arc<dyn UserStore>) -> Self {
        let codec = TokenCodec::from_config(&config.auth);
        Self {
            config,
            store,
            codec,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            is_ready: AtomicBool::new(true),
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Check if service is ready
    pub fn is_ready(&self) -> bool {
        self.is_ready.load(Ordering::SeqCst)
    }

    /// Set ready status
    pub fn set_ready(&self, ready: bool) {
        self.is_ready.store(ready, Ordering::SeqCst);
    }

    /// Fold one finished request into the per-endpoint statistics.
    pub async fn record_request(&self, endpoint: String, status: u16, latency_us: u64) {
        let mut metrics = self.metrics.write().await;
        let entry = metrics.entry(endpoint).or_default();
        entry.requests += 1;
        if status >= 500 {
            entry.server_errors += 1;
        } else if status >= 400 {
            entry.client_errors += 1;
        }
        entry.total_latency_us += latency_us;
        entry.max_latency_us = entry.max_latency_us.max(latency_us);
    }

    /// Clone the current per-endpoint statistics for rendering.
    pub async fn metrics_snapshot(&self) -> HashMap<String, EndpointMetrics> {
        self.metrics.read().await.clone()
    }
}
