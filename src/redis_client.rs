use redis::{aio::ConnectionManager, Client};
use tracing::info;

/// Shared Redis handle. `ConnectionManager` reconnects on its own, so
/// clones can be handed to every request.
#[derive(Clone)]
pub struct RedisClient {
    pub conn: ConnectionManager,
}

impl RedisClient {
    pub async fn connect(redis_url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        let mut probe = conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut probe).await?;
        info!("Redis connected");

        Ok(RedisClient { conn })
    }
}
