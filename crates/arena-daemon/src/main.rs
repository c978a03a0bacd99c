//! arena-daemon entry point.
//!
//! Thin: sets up tracing, loads configuration, picks the store, builds the
//! shared state, starts the background tasks and serves HTTP. Handlers live
//! in `routes.rs`; shared state types live in `state.rs`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use arena_config::{resolve_database_url, ArenaConfig, StoreBackend, UnusedKeyPolicy};
use arena_daemon::{feed, routes, schedule, state, upsert};
use arena_store::{DocumentStore, MemoryStore, PgStore};
use axum::http::{HeaderValue, Method};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

const ENV_DAEMON_ADDR: &str = "ARENA_DAEMON_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let loaded = arena_config::load_from_env().context("load config")?;
    for key in loaded.unused_keys(UnusedKeyPolicy::Warn)? {
        warn!(key = %key, "unused config key");
    }
    let cfg = loaded.typed()?;
    info!(config_hash = %loaded.config_hash, "config loaded");

    let store = open_store(&cfg).await?;
    let strategy = cfg
        .challenge
        .mode
        .strategy(cfg.challenge.synth.clone())
        .context("challenge strategy")?;
    let schedule = schedule::DailySchedule::from_config(&cfg.schedule)?;

    let shared = Arc::new(
        state::AppState::new(store, Arc::from(strategy), schedule, cfg.daemon.bus_capacity)
            .with_config_hash(loaded.config_hash.clone()),
    );

    state::spawn_heartbeat(shared.bus.clone(), Duration::from_secs(1));
    feed::spawn_change_feed(Arc::clone(&shared));
    schedule::spawn_daily(Arc::clone(&shared));

    if cfg.schedule.run_on_start {
        let key = shared
            .schedule
            .date_key_for(shared.store.server_time().await?);
        upsert::run_daily(&shared, key).await?;
    }

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = match bind_addr_from_env() {
        Some(a) => a,
        None => cfg
            .daemon
            .addr
            .parse::<SocketAddr>()
            .with_context(|| format!("daemon.addr '{}'", cfg.daemon.addr))?,
    };
    info!(
        store = shared.store.backend_name(),
        mode = %cfg.challenge.mode,
        "arena-daemon listening on http://{}",
        addr
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    Ok(())
}

async fn open_store(cfg: &ArenaConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match cfg.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::with_capacity(cfg.daemon.bus_capacity))),
        StoreBackend::Postgres => {
            let url = resolve_database_url(&cfg.store)?;
            let pool = arena_store::connect(url.expose(), cfg.store.max_connections).await?;
            arena_store::migrate(&pool).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn bind_addr_from_env() -> Option<SocketAddr> {
    std::env::var(ENV_DAEMON_ADDR).ok()?.parse().ok()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("ctrl-c handler unavailable; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(tower_http::cors::Any)
}
