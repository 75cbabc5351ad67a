use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Routes for signed-in users. The gate has already redirected anonymous callers to
/// the login page, so handlers receive a resolved `AuthUser`; area-specific handlers
/// additionally check the caller's role.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Client Area ---
        // GET /client
        // The caller's own travel orders. Landing area for CLIENT.
        .route("/client", get(handlers::get_client_dashboard))
        // POST /client/travel-orders
        // Submits a travel order; the attachment is uploaded beforehand via /upload/presigned.
        .route("/client/travel-orders", post(handlers::create_travel_order))
        .route("/client/travel-orders/{id}", get(handlers::get_my_travel_order))
        // --- Signatory Area ---
        // GET /signatory
        // Orders awaiting a signature. Landing area for SIGNATORY.
        .route("/signatory", get(handlers::get_signatory_queue))
        .route("/signatory/travel-orders/{id}", get(handlers::get_travel_order))
        // PUT /signatory/travel-orders/{id}/review
        // Approve (next signature in the chain) or disapprove.
        .route(
            "/signatory/travel-orders/{id}/review",
            put(handlers::review_travel_order),
        )
        // --- Account ---
        .route("/me", get(handlers::get_me))
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route("/stations", get(handlers::get_stations))
        // --- Uploads ---
        // POST issues a 10-minute PUT URL; GET issues a download URL for an existing key.
        .route(
            "/upload/presigned",
            post(handlers::get_presigned_url).get(handlers::get_download_url),
        )
}
