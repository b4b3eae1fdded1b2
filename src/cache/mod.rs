use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::models::Seat;
use crate::redis_client::RedisClient;

/// Seat records per trip, kept in Redis between seat-map requests.
///
/// Entries are stored under a per-trip generation. Invalidating a trip bumps
/// its generation, so a reader that loaded the database before a booking
/// committed writes its result under a key nobody reads any more.
///
/// Every failure here is logged and reported as a miss; the database stays
/// the source of truth.
#[derive(Clone)]
pub struct SeatCache {
    redis: RedisClient,
    ttl_seconds: u64,
}

pub fn generation_key(trip_id: i64) -> String {
    format!("seats:trip:{}:gen", trip_id)
}

pub fn seats_key(trip_id: i64, generation: u64) -> String {
    format!("seats:trip:{}:v{}", trip_id, generation)
}

impl SeatCache {
    pub fn new(redis: RedisClient, ttl_seconds: u64) -> Self {
        Self { redis, ttl_seconds }
    }

    /// Current generation of a trip's entry; `0` until the first
    /// invalidation. `None` when Redis cannot be reached.
    pub async fn generation(&self, trip_id: i64) -> Option<u64> {
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<Option<u64>> = conn.get(generation_key(trip_id)).await;
        match result {
            Ok(generation) => Some(generation.unwrap_or(0)),
            Err(e) => {
                warn!("Seat cache generation read failed for trip {}: {:?}", trip_id, e);
                None
            }
        }
    }

    pub async fn get_seats(&self, trip_id: i64, generation: u64) -> Option<Vec<Seat>> {
        let key = seats_key(trip_id, generation);
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = match conn.get(&key).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Seat cache read failed for trip {}: {:?}", trip_id, e);
                return None;
            }
        };

        match serde_json::from_str(&data?) {
            Ok(seats) => {
                debug!("Seat cache hit for trip {} (generation {})", trip_id, generation);
                Some(seats)
            }
            Err(e) => {
                warn!("Discarding unreadable seat cache entry for trip {}: {:?}", trip_id, e);
                let result: Result<(), _> = conn.del(&key).await;
                if let Err(e) = result {
                    warn!("Seat cache delete failed for trip {}: {:?}", trip_id, e);
                }
                None
            }
        }
    }

    /// Stores seats loaded while `generation` was current.
    pub async fn put_seats(&self, trip_id: i64, generation: u64, seats: &[Seat]) {
        let data = match serde_json::to_string(seats) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize seats for trip {}: {:?}", trip_id, e);
                return;
            }
        };

        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn
            .set_ex(seats_key(trip_id, generation), data, self.ttl_seconds)
            .await;
        if let Err(e) = result {
            warn!("Seat cache write failed for trip {}: {:?}", trip_id, e);
        }
    }

    pub async fn invalidate(&self, trip_id: i64) {
        let mut conn = self.redis.conn.clone();
        let result: redis::RedisResult<u64> = conn.incr(generation_key(trip_id), 1).await;
        match result {
            Ok(generation) => debug!("Seat cache for trip {} moved to generation {}", trip_id, generation),
            Err(e) => warn!("Seat cache invalidation failed for trip {}: {:?}", trip_id, e),
        }
    }
}
