//! Voicelink bridge - account linking between a voice assistant and Shopify.
//!
//! This binary serves the bridge on port 3000.
//!
//! # Architecture
//!
//! - Axum web framework with Askama templates for the two linking pages
//! - Shopify OAuth (authorization code grant) towards the storefront
//! - OAuth-style `/token` and `/credential-lookup` towards the voice platform
//! - `PostgreSQL` credential store when a database URL is configured,
//!   otherwise an in-memory store that loses links on restart
//!
//! # Security
//!
//! This binary holds:
//! - The Shopify app's client secret (code exchange, callback HMAC)
//! - The voice client's secret (token endpoint authentication)
//! - Storefront access tokens for every linked shop
//!
//! Linking codes and bearer tokens are only ever stored as SHA-256 digests.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicelink_bridge::config::BridgeConfig;
use voicelink_bridge::services::spawn_sweeper;
use voicelink_bridge::state::AppState;
use voicelink_bridge::store::{CredentialStore, MemoryStore, PgStore};
use voicelink_bridge::{build_router, db};
use voicelink_core::{Clock, SystemClock};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &BridgeConfig) -> Option<sentry::ClientInitGuard> {
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

/// Pick the credential store: `PostgreSQL` if configured, memory otherwise.
async fn create_store(config: &BridgeConfig) -> Arc<dyn CredentialStore> {
    if let Some(database_url) = &config.database_url {
        let pool = db::create_pool(database_url)
            .await
            .expect("Failed to create database pool");
        tracing::info!("Using PostgreSQL credential store");
        Arc::new(PgStore::new(pool))
    } else {
        tracing::warn!(
            "No database configured; using in-memory credential store (links are lost on restart)"
        );
        Arc::new(MemoryStore::new())
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = BridgeConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Initialize tracing with EnvFilter and Sentry integration
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voicelink_bridge=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p voicelink-cli -- migrate

    let store = create_store(&config).await;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let sweeper = spawn_sweeper(Arc::clone(&store), Arc::clone(&clock), config.sweep_interval);

    let addr = config.socket_addr();
    let state =
        AppState::new(config, store, clock).expect("Failed to initialize application state");
    let app = build_router(state);

    // Start server
    tracing::info!("bridge listening on {}", addr);

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

    sweeper.abort();
    tracing::info!("Shutdown complete");
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
