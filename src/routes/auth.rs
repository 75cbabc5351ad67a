use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Auth Router Module
///
/// Sign-in flow pages (`/auth/*`) and the session API (`/api/auth/*`).
///
/// The gate treats the two groups differently: `/auth/*` pages bounce signed-in
/// users to their landing area, while `/api/auth/*` is always let through.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/login
        // Verifies credentials and sets the `session_token` cookie.
        .route("/auth/login", post(handlers::login))
        // POST /auth/register
        // Self-service sign-up; the new account gets the CLIENT role.
        .route("/auth/register", post(handlers::register))
        // GET /auth/error?error=...
        .route("/auth/error", get(handlers::auth_error))
        // GET /api/auth/session
        // The current user, or null. Never redirected.
        .route("/api/auth/session", get(handlers::get_session))
        // POST /api/auth/signout
        .route("/api/auth/signout", post(handlers::sign_out))
}
