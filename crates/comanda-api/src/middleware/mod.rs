//! Cross-cutting HTTP middleware
//!
//! Authentication and role gates live in [`crate::auth::middleware`];
//! this module holds the plumbing that applies to every route.
//!
//! Author: hephaex@gmail.com

pub mod metrics;
pub mod security_headers;

pub use metrics::metrics_middleware;
pub use security_headers::security_headers_middleware;
