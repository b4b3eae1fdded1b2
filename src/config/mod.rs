use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

// Top-level configuration, one section per concern
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub cache: CacheConfig,
    pub features: FeatureFlags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expires_in_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Lifetime of a cached seat list for one trip.
    pub seats_ttl_seconds: u64,
}

// Feature flags
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    pub enable_cache: bool,
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn parsed_or<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|_| ConfigError::Invalid { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let enable_cache: bool = parsed_or("ENABLE_CACHE", "true")?;

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parsed_or("PORT", "8080")?,
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "bus_ticketing=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: parsed_or("DB_POOL_SIZE", "20")?,
                acquire_timeout_seconds: parsed_or("DB_ACQUIRE_TIMEOUT_SECONDS", "5")?,
            },
            redis: RedisConfig {
                // Only needed when the seat cache is on
                url: if enable_cache {
                    required("REDIS_URL")?
                } else {
                    env::var("REDIS_URL").unwrap_or_default()
                },
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                expires_in_hours: parsed_or("JWT_EXPIRES_IN_HOURS", "24")?,
            },
            cache: CacheConfig {
                seats_ttl_seconds: parsed_or("SEATS_CACHE_TTL_SECONDS", "300")?,
            },
            features: FeatureFlags { enable_cache },
        })
    }

    /// Configuration for tests and local tooling; nothing is read from the
    /// environment.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
                rust_log: "bus_ticketing=debug".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/bus_ticketing_test".to_string(),
                pool_size: 1,
                acquire_timeout_seconds: 1,
            },
            redis: RedisConfig { url: String::new() },
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                expires_in_hours: 1,
            },
            cache: CacheConfig { seats_ttl_seconds: 60 },
            features: FeatureFlags { enable_cache: false },
        }
    }
}
