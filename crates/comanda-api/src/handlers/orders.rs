//! Order handlers
//!
//! Order management itself lives elsewhere; the API exposes a single
//! waiter-gated view so staff tooling has an endpoint to build on.
//!
//! Author: hephaex@gmail.com

use crate::error::ErrorBody;
use crate::handlers::auth::MessageResponse;
use axum::Json;

/// Orders view for waiters
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    tag = "orders",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Orders view", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Caller is not a waiter", body = ErrorBody),
    )
)]
pub async fn list_orders_handler() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Orders view".to_string(),
    })
}
