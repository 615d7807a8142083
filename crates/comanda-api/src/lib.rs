//! Comanda API - REST server
//!
//! HTTP surface for the restaurant ordering backend: signup and login,
//! token refresh, password management, and the role-gated staff
//! endpoints, plus health and metrics plumbing.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use crate::state::AppState;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::change_password_handler,
        handlers::auth::login_history_handler,
        handlers::users::hello_handler,
        handlers::users::list_users_handler,
        handlers::users::set_role_handler,
        handlers::users::delete_user_handler,
        handlers::orders::list_orders_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        handlers::auth::SignupRequest,
        handlers::auth::LoginRequest,
        handlers::auth::LoginResponse,
        handlers::auth::RefreshRequest,
        handlers::auth::RefreshResponse,
        handlers::auth::ChangePasswordRequest,
        handlers::auth::LoginHistoryEntry,
        handlers::auth::LoginHistoryResponse,
        handlers::auth::MessageResponse,
        handlers::users::UserSummary,
        handlers::users::UserListResponse,
        handlers::users::SetRoleRequest,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        error::ErrorBody,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and session endpoints"),
        (name = "users", description = "Authenticated user endpoints"),
        (name = "admin", description = "Administrator endpoints"),
        (name = "orders", description = "Waiter endpoints"),
        (name = "health", description = "Service health endpoints"),
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the full application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::prometheus_metrics))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS layer from server config. With CORS disabled the layer stays
/// inert; with no parseable origins it falls back to permissive for
/// development setups.
fn cors_layer(state: &AppState) -> CorsLayer {
    if !state.config.server.cors_enabled {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Build a router backed by a fresh in-memory store with the built-in
/// roles and default staff accounts seeded. Integration tests run the
/// whole HTTP surface against it without a database.
#[cfg(feature = "test-utils")]
pub async fn create_router_for_testing() -> Router {
    use comanda_core::config::AppConfig;
    use comanda_core::MemoryUserStore;

    let store = Arc::new(MemoryUserStore::new());
    let config = AppConfig::default();
    auth::seed::seed(store.as_ref(), config.auth.seed_default_users)
        .await
        .expect("seeding an in-memory store");
    let state = Arc::new(AppState::new(config, store));
    create_router(state)
}
