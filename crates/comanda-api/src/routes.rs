//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::auth::middleware::{auth_middleware, require_role};
use crate::handlers::{auth, orders, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh-token", post(auth::refresh_handler));

    // Routes for any authenticated user
    let user_routes = Router::new()
        .route("/auth/login-history", get(auth::login_history_handler))
        .route("/auth/change-password", put(auth::change_password_handler))
        .route("/hello", get(users::hello_handler));

    // Staff routes behind role gates
    let waiter_routes = Router::new()
        .route("/orders", get(orders::list_orders_handler))
        .layer(middleware::from_fn(require_role(state.clone(), "waiter")));

    let admin_routes = Router::new()
        .route("/admin/users", get(users::list_users_handler))
        .route("/admin/users/:id/role", put(users::set_role_handler))
        .route("/admin/users/:id", delete(users::delete_user_handler))
        .layer(middleware::from_fn(require_role(state.clone(), "admin")));

    // The authentication gate wraps every protected route; role gates
    // run inside it, so a request is authenticated before any role
    // check sees it.
    let protected_routes = user_routes
        .merge(waiter_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
