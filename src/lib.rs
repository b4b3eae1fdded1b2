pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod redis_client;
pub mod seatmap;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::SeatCache;
use crate::config::Config;
use crate::database::Database;
use crate::redis_client::RedisClient;

/// Shared state for the whole application.
pub struct AppState {
    pub db: Database,
    /// Seat cache, absent when `ENABLE_CACHE` is off.
    pub cache: Option<SeatCache>,
    pub config: Config,
}

impl AppState {
    /// Connects to PostgreSQL and, when enabled, to Redis.
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let db = Database::new(&config.database).await?;

        let cache = if config.features.enable_cache {
            let redis = RedisClient::connect(&config.redis.url).await?;
            Some(SeatCache::new(redis, config.cache.seats_ttl_seconds))
        } else {
            info!("Seat cache disabled");
            None
        };

        Ok(Arc::new(Self { db, cache, config }))
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Bus Ticketing API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
