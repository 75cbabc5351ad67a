use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints reachable by anonymous and signed-in callers alike. Must stay in sync
/// with `access::classify::PUBLIC_ROUTES`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Service banner; also used by the load balancer health check.
        .route("/", get(handlers::index))
}
