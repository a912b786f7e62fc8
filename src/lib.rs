//! Folio Backend - library for app logic and testing

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod notify;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod storage;
pub mod theme;
pub mod validation;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::Layer;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    set_header::{SetResponseHeader, SetResponseHeaderLayer},
    trace::TraceLayer,
};

use crate::auth::GithubOAuth;
use crate::config::{Config, StorageConfig};
use crate::db::{DbConfig, MemoryStore, PgStore, PortfolioStore};
use crate::rate_limit::RateLimiter;
use crate::state::AppState;

/// Request bodies above this are rejected before reaching a handler.
pub const BODY_LIMIT_BYTES: usize = 16 * 1024 * 1024;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOADS_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; sandbox";

/// CORS for the configured frontend origins, with credentials so the session
/// cookie is sent.
pub fn configure_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Uploaded files, sandboxed so an SVG opened directly cannot run script on
/// this origin.
fn uploads_service(dir: &str) -> SetResponseHeader<ServeDir, HeaderValue> {
    SetResponseHeaderLayer::overriding(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(UPLOADS_CSP),
    )
    .layer(ServeDir::new(dir))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);

    let rpc = routes::rpc::router().layer(middleware::from_fn_with_state(
        Arc::new(RateLimiter::rpc().trusting_proxy(state.config.trust_proxy)),
        rate_limit::enforce,
    ));

    let auth = Router::new()
        .route("/github", get(routes::oauth::github_login))
        .route("/github/callback", get(routes::oauth::github_callback))
        .layer(middleware::from_fn_with_state(
            Arc::new(RateLimiter::auth().trusting_proxy(state.config.trust_proxy)),
            rate_limit::enforce,
        ));

    let mut app = Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/health/detailed", get(routes::health::health_detailed))
        .route("/api/theme.css", get(routes::theme::stylesheet))
        .route("/api/upload", post(routes::upload::upload_image))
        .route("/api/oauth/callback", get(routes::oauth::legacy_callback))
        .nest("/api/auth", auth)
        .nest("/api/trpc", rpc);

    if let StorageConfig::Local { dir, public_prefix } = &state.config.storage {
        app = app.nest_service(public_prefix, uploads_service(dir));
    }

    let mut app = app
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES));
    for layer in logging::middleware::security_header_layers() {
        app = app.layer(layer);
    }
    app.layer(cors)
}

/// Postgres when `DATABASE_URL` is set, the in-memory store otherwise. A
/// database that cannot be reached is fatal in production only.
async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn PortfolioStore>> {
    let Some(db_config) = DbConfig::from_config(config) else {
        tracing::warn!("DATABASE_URL not set. Using the in-memory store; content is not persisted.");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let connected = async {
        let pool = db::init_pool(&db_config).await?;
        db::run_migrations(&pool).await?;
        Ok::<_, sqlx::Error>(pool)
    }
    .await;

    match connected {
        Ok(pool) => Ok(Arc::new(PgStore::new(pool))),
        Err(e) if !config.is_production() => {
            tracing::warn!(
                "Failed to initialize database: {}. Continuing with the in-memory store.",
                e
            );
            Ok(Arc::new(MemoryStore::new()))
        }
        Err(e) => Err(anyhow::Error::new(e).context("failed to initialize database")),
    }
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init(&config)?;

    config.check()?;

    let store = build_store(&config).await?;
    let storage = storage::from_config(&config.storage).await;
    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("folio-backend/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;
    let oauth = Arc::new(GithubOAuth::new(
        http.clone(),
        config.github_client_id.clone(),
        config.github_client_secret.clone(),
    ));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid HOST/PORT configuration")?;

    let app = create_app(AppState::new(config, store, storage, oauth, http));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
