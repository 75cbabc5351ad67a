use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_order_portal::{
    AccessPolicy, AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    session::{JwtSessionResolver, SessionState},
    storage::{S3StorageClient, StorageService, StorageState},
};

/// main
///
/// The asynchronous entry point. Brings up, in order: configuration, logging, the
/// Postgres pool (with migrations), S3 storage, the session resolver and access
/// policy, and finally the HTTP server. Any failure here aborts startup.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    // The .env file is read first so AppConfig sees its values.
    dotenv::dotenv().ok();
    // AppConfig::load() panics when a production secret (SESSION_SECRET, S3 keys) is missing.
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "travel_order_portal=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    // APP_ENV picks the output format; the filter above applies to both.
    match config.env {
        Env::Local => {
            // LOCAL: pretty multi-line output for reading in a terminal.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // PROD: one JSON object per line, so the log aggregator can index
            // fields such as request_id, user_id and order_id.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    // One pool shared by every request; the schema is brought up to date before serving.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Database migrations failed.");

    // The Repository is shared behind an Arc<dyn Repository>.
    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Storage Initialization (S3/MinIO)
    // Attachments, signatures and profile images live in a single bucket.
    let s3_client = S3StorageClient::new(
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_key,
        &config.s3_secret,
        &config.s3_bucket,
    )
    .await;

    // LOCAL-ONLY: the dockerized MinIO starts without a bucket.
    if config.env == Env::Local {
        s3_client.ensure_bucket_exists().await;
    }

    let storage = Arc::new(s3_client) as StorageState;

    // 6. Sessions & Access Policy
    // The resolver turns a session cookie into an Identity on every request, reading
    // the role fresh from Postgres. The policy holds the route sets and landing table.
    let sessions = Arc::new(JwtSessionResolver::new(repo.clone(), config.clone())) as SessionState;
    let policy = Arc::new(AccessPolicy::default());

    // 7. Unified State Assembly
    // Every dependency above is bundled into AppState; handlers pick parts via FromRef.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        repo,
        storage,
        sessions,
        policy,
        config,
    };

    // 8. Router and Server Startup
    let app = create_router(app_state);

    // Binds the TCP listener on BIND_ADDR.
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("HTTP server bound successfully.");
    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://{bind_addr}/swagger-ui");

    // The long-running server loop.
    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
