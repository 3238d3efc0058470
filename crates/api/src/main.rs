//! Shopfloor API - accounts, catalog and cart.
//!
//! This binary serves the JSON API on port 8000 by default.
//!
//! # Storage
//!
//! - `PostgreSQL` when `SHOPFLOOR_DATABASE_URL` (or `DATABASE_URL`) is a
//!   connection string
//! - An in-process store when it is `memory`; nothing survives a restart
//!
//! Migrations are NOT run on startup. Run them explicitly via:
//! `cargo run -p shopfloor-cli -- migrate`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfloor_api::config::ApiConfig;
use shopfloor_api::db::{self, MemoryStore, PgStore, Store};
use shopfloor_api::state::AppState;

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Open the configured store.
async fn open_store(config: &ApiConfig) -> Result<Arc<dyn Store>, sqlx::Error> {
    if config.uses_memory_store() {
        tracing::warn!("using in-memory store; data is lost on shutdown");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = db::create_pool(&config.database_url, config.db_timeout).await?;
    tracing::info!("Database pool created");
    Ok(Arc::new(PgStore::new(pool, config.db_timeout)))
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ApiConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfloor_api=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let store = open_store(&config)
        .await
        .expect("Failed to open store");

    let addr = config.socket_addr();
    let app = shopfloor_api::app(AppState::new(config, store));

    tracing::info!("shopfloor-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
