use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

/// Per-channel presence set in Redis, keyed `channel:<id>:users`.
///
/// Gateways write on connect/disconnect; the read API enumerates. Writes
/// are best effort; callers log failures and carry on.
#[derive(Clone)]
pub struct Presence {
    conn: MultiplexedConnection,
}

impl Presence {
    pub async fn connect(addr: &str) -> Result<Presence, redis::RedisError> {
        let client = redis::Client::open(format!("redis://{addr}"))?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Presence { conn })
    }

    pub async fn join(&self, channel_id: &str, user_id: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.sadd(presence_key(channel_id), user_id).await
    }

    pub async fn leave(&self, channel_id: &str, user_id: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.srem(presence_key(channel_id), user_id).await
    }

    pub async fn members(&self, channel_id: &str) -> Result<Vec<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.smembers(presence_key(channel_id)).await
    }
}

fn presence_key(channel_id: &str) -> String {
    format!("channel:{channel_id}:users")
}
