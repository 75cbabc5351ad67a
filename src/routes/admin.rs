use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// User management. `/users` is the ADMIN landing area; the handlers reject every
/// other role with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users lists every account; POST /users creates one with any role.
        .route("/users", get(handlers::list_users).post(handlers::create_user))
}
