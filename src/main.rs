use axum::{
    routing::{get, post, put},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loan_intake_api::config::Config;
use loan_intake_api::db::Database;
use loan_intake_api::storage_client::ObjectStorageClient;
use loan_intake_api::{bank_account_handlers, handlers, storage_handlers};

/// Main entry point for the application.
///
/// Initializes logging, configuration, the database pool, the product-catalog
/// cache and the object-storage client, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_intake_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    // Loan-product catalog cache: reference data, changes rarely
    let catalog_cache = Cache::builder()
        .time_to_live(Duration::from_secs(300))
        .max_capacity(16)
        .build();
    tracing::info!("Product catalog cache initialized (5m TTL)");

    // Object-storage client for applicant document images
    let storage = ObjectStorageClient::new(
        config.storage_base_url.clone(),
        config.storage_bucket.clone(),
        config.storage_token.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize storage client: {}", e))?;
    tracing::info!("✓ Object storage client initialized: {}", config.storage_base_url);

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        db: db.pool.clone(),
        storage,
        catalog_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // OTP-gated auth flows
        .route("/api/auth/verify-signup", post(handlers::verify_signup))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", get(handlers::login))
        .route("/api/auth/refresh", get(handlers::refresh))
        .route("/api/auth/web", get(handlers::web_lookup))
        .route("/api/auth/contacts", get(handlers::contacts))
        .route(
            "/api/auth/applicants/:id",
            put(handlers::update_applicant),
        )
        // Bank accounts nested under an applicant
        .route(
            "/api/auth/applicants/:usuario_id/accounts",
            post(bank_account_handlers::add_account),
        )
        .route(
            "/api/auth/applicants/:usuario_id/accounts/:cuenta_id",
            put(bank_account_handlers::update_account)
                .delete(bank_account_handlers::remove_account),
        )
        // Object-storage passthrough
        .route("/api/files", post(storage_handlers::upload_file))
        .route(
            "/api/files/:key",
            get(storage_handlers::get_file).delete(storage_handlers::delete_file),
        )
        .route("/api/files/:key/url", get(storage_handlers::file_url))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 32MB (three document images per registration)
                .layer(RequestBodyLimitLayer::new(32 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
