//! # tasknest API server
//!
//! Entry point: loads configuration, connects the database and cache,
//! runs migrations, and serves the Axum router until shutdown.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... JWT_SECRET=$(openssl rand -hex 32) \
//!     cargo run -p tasknest-api
//! ```

use redis::aio::ConnectionManager;
use tasknest_api::{
    app::{build_router, AppState},
    config::Config,
};
use tasknest_shared::{
    cache::{Cache, CacheConfig},
    db::{migrations, pool},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasknest_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "tasknest API server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    // Database: pool, then schema
    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    migrations::run_migrations(&db).await?;

    // Cache falls back to in-memory when Redis is absent
    let cache = Cache::connect(CacheConfig {
        redis_url: config.redis.url.clone(),
        default_ttl: std::time::Duration::from_secs(config.redis.cache_ttl_seconds),
    })
    .await;

    // Separate Redis connection for the rate limiter; None disables it
    let redis = match &config.redis.url {
        Some(url) => match connect_redis(url).await {
            Ok(manager) => Some(manager),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, rate limiting disabled");
                None
            }
        },
        None => None,
    };

    let bind_address = config.bind_address();
    let state = AppState::new(db, cache, redis, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn connect_redis(url: &str) -> anyhow::Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;
    Ok(manager)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
