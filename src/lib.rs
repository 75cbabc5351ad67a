use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request-time access control (route classes, decision table, landing areas, gate).
pub mod access;

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;
pub mod storage;

// Routers grouped by the area they serve.
pub mod routes;
use routes::{admin, auth as auth_routes, authenticated, public};

// --- Public Re-exports ---

pub use access::{AccessPolicy, Decision, Identity, RouteClass, RouteTable};
pub use config::AppConfig;
pub use repository::{PostgresRepository, RepositoryState};
pub use session::{JwtSessionResolver, SessionState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every annotated handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index, handlers::login, handlers::register, handlers::auth_error,
        handlers::get_session, handlers::sign_out, handlers::get_me, handlers::get_settings,
        handlers::update_settings, handlers::get_stations, handlers::get_client_dashboard,
        handlers::create_travel_order, handlers::get_my_travel_order,
        handlers::get_signatory_queue, handlers::get_travel_order,
        handlers::review_travel_order, handlers::list_users, handlers::create_user,
        handlers::get_presigned_url, handlers::get_download_url
    ),
    components(
        schemas(
            models::Role, models::Station, models::TravelOrder, models::TravelOrderStatus,
            models::TravelOrderView, models::ReviewAction, models::ReviewRequest,
            models::LoginRequest, models::LoginResponse, models::RegisterRequest,
            models::AddUserRequest, models::SettingsRequest, models::TravelOrderRequest,
            models::UploadKind, models::PresignedUrlRequest, models::PresignedUrlResponse,
            models::UserProfile, models::MessageResponse, models::SessionResponse,
        )
    ),
    tags(
        (name = "etravel-order", description = "Travel Order Portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for the application's services and configuration.
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production, in-memory in tests).
    pub repo: RepositoryState,
    /// S3/MinIO access and presigned URL generation.
    pub storage: StorageState,
    /// Answers "who is calling?" for the access gate.
    pub sessions: SessionState,
    /// Route classes, landing areas and the decision table.
    pub policy: Arc<AccessPolicy>,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<AccessPolicy> {
    fn from_ref(app_state: &AppState) -> Arc<AccessPolicy> {
        app_state.policy.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routers, then wraps the whole application (fallback included) in
/// the access gate, followed by the observability layers and CORS.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // The frontend is served from another origin during development.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: the generated Swagger UI. Classified as a protected route
        // like any other path, so it needs a session.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: the landing page.
        .merge(public::public_routes())
        // Auth Routes: login, registration and the session API under /api/auth.
        .merge(auth_routes::auth_routes())
        // Authenticated Routes: client, signatory, settings and uploads. Role checks
        // happen inside the handlers once the gate has let the request through.
        .merge(authenticated::authenticated_routes())
        // Admin Routes: user management. ADMIN is checked inside the handlers.
        .merge(admin::admin_routes())
        // Unmatched paths answer 404 once the gate has allowed them.
        .fallback(handlers::not_found)
        // Apply the Unified State to all routes.
        .with_state(state.clone());

    // 3. Access Gate
    // Layered after `with_state` so it also covers the fallback: unmatched paths are
    // classified and redirected like everything else.
    let gated_router =
        base_router.layer(middleware::from_fn_with_state(state, access::access_gate));

    // 4. Observability and Correlation Layers (Applied outermost/first)
    // These wrap the gate, so redirects are traced and carry a request id too.
    gated_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: one span per request, with the generated request ID
                // attached by `trace_span_logger`; latency is logged on response.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: echoes x-request-id on the response so a
                // client report can be matched to the server logs.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer (Applied last, answering preflight before anything else runs)
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` of the request,
/// so every log line of one request (access decisions included) can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
