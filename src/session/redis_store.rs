//! Redis-backed [`SessionStore`].
//!
//! One `ConnectionManager` is shared by every request. It is opened on first
//! use instead of at construction so the service can start (and report 503 on
//! `/health`) while Redis is still down; a failed attempt is retried by the
//! next caller. The manager's own reconnect loop is disabled: each connect is
//! one attempt bounded by the configured timeout.

use super::store::{SessionStore, StoreError, ValueType};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, RedisError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub struct RedisSessionStore {
    client: redis::Client,
    timeout: Duration,
    connection: OnceCell<ConnectionManager>,
}

impl RedisSessionStore {
    /// Parse the connection URL. Does not contact the server.
    ///
    /// `timeout` bounds both the connect and every command reply.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            timeout,
            connection: OnceCell::new(),
        })
    }

    /// Open the shared connection now rather than on the first request.
    pub async fn connect(&self) -> Result<(), StoreError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Opening Redis connection manager");
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(0)
                    .set_connection_timeout(self.timeout)
                    .set_response_timeout(self.timeout);
                let manager = ConnectionManager::new_with_config(self.client.clone(), config).await?;
                info!("Redis connection established");
                Ok::<_, RedisError>(manager)
            })
            .await
            .map_err(classify)?;

        // ConnectionManager is a cheap handle over one multiplexed connection
        Ok(manager.clone())
    }
}

fn classify(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

/// `MULTI` RPUSH, LTRIM to the last `max_len`, EXPIRE `EXEC`.
fn window_pipeline(key: &str, entry: &str, max_len: usize, ttl: Duration) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .rpush(key, entry)
        .ignore()
        .ltrim(key, -(max_len as isize), -1)
        .ignore()
        .expire(key, ttl.as_secs() as i64)
        .ignore();
    pipe
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn value_type(&self, key: &str) -> Result<ValueType, StoreError> {
        let mut conn = self.connection().await?;
        let name: String = redis::cmd("TYPE")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(ValueType::from_type_name(&name))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await.map_err(classify)?;
        Ok(())
    }

    async fn push_bounded(
        &self,
        key: &str,
        entry: &str,
        max_len: usize,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let _: () = window_pipeline(key, entry, max_len, ttl)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection().await?;
        let entries: Vec<String> = conn.lrange(key, 0, -1).await.map_err(classify)?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn packed(pipe: &redis::Pipeline) -> String {
        String::from_utf8(pipe.get_packed_pipeline()).unwrap()
    }

    #[test]
    fn test_rejects_malformed_url() {
        assert!(matches!(
            RedisSessionStore::new("not-a-redis-url", TIMEOUT),
            Err(StoreError::Connection(_))
        ));
    }

    #[test]
    fn test_accepts_url_without_connecting() {
        assert!(RedisSessionStore::new("redis://127.0.0.1:6379/0", TIMEOUT).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_fast() {
        // Nothing listens on port 1
        let store = RedisSessionStore::new("redis://127.0.0.1:1/0", TIMEOUT).unwrap();

        let started = Instant::now();
        let result = store.ping().await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(StoreError::Connection(_))));
        assert!(elapsed < Duration::from_secs(3), "ping took {:?}", elapsed);

        // The failed attempt is not cached; the next caller tries again
        assert!(store.connect().await.is_err());
    }

    #[test]
    fn test_window_pipeline_is_one_transaction() {
        let pipe = packed(&window_pipeline("session:s1", "hello", 20, Duration::from_secs(600)));

        assert!(pipe.starts_with("*1\r\n$5\r\nMULTI\r\n"));
        assert!(pipe.ends_with("*1\r\n$4\r\nEXEC\r\n"));

        let rpush = pipe.find("RPUSH\r\n$10\r\nsession:s1\r\n$5\r\nhello\r\n").unwrap();
        let ltrim = pipe.find("LTRIM\r\n$10\r\nsession:s1\r\n$3\r\n-20\r\n$2\r\n-1\r\n").unwrap();
        let expire = pipe.find("EXPIRE\r\n$10\r\nsession:s1\r\n$3\r\n600\r\n").unwrap();
        assert!(rpush < ltrim && ltrim < expire);
    }

    #[test]
    fn test_window_pipeline_trims_to_window_size() {
        let pipe = packed(&window_pipeline("session:s1", "x", 2, Duration::from_secs(90)));
        assert!(pipe.contains("LTRIM\r\n$10\r\nsession:s1\r\n$2\r\n-2\r\n$2\r\n-1\r\n"));
        assert!(pipe.contains("EXPIRE\r\n$10\r\nsession:s1\r\n$2\r\n90\r\n"));
    }
}
