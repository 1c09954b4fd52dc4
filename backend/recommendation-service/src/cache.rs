//! Redis-backed cache for serialized models and preference logs
//!
//! Cache keys follow the pattern:
//! - ml:content_model → encoded content similarity model (TTL: 24 hours)
//! - ml:collaborative_model → encoded factorization model (TTL: 24 hours)
//! - user_prefs:{user_id} → newest-first list of JSON preference events (TTL: 30 days)

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, Result};

pub const CONTENT_MODEL_KEY: &str = "ml:content_model";
pub const COLLABORATIVE_MODEL_KEY: &str = "ml:collaborative_model";

pub fn preference_key(user_id: &str) -> String {
    format!("user_prefs:{}", user_id)
}

/// Key-value cache with per-entry expiry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelCache: Send + Sync {
    /// Fetch a value; expired or missing keys return `None`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Prepend to a list, keep only the newest `cap` entries and reset its TTL
    /// in one atomic transaction
    async fn push_capped(&self, key: &str, value: Vec<u8>, cap: usize, ttl: Duration)
        -> Result<()>;
}

#[derive(Clone)]
pub struct RedisModelCache {
    client: ConnectionManager,
}

impl RedisModelCache {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Configuration(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            AppError::DataAccess(format!("Failed to create Redis connection: {}", e))
        })?;

        Ok(Self { client: manager })
    }

    pub async fn ping(&self) -> Result<()> {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.client.clone())
            .await
            .map_err(|e| {
                warn!("Redis PING failed: {}", e);
                AppError::DataAccess(format!("Redis health check failed: {}", e))
            })?;
        Ok(())
    }
}

#[async_trait]
impl ModelCache for RedisModelCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.client.clone())
            .await?;

        debug!(key = %key, hit = value.is_some(), "Cache lookup");
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(value)
            .query_async::<_, ()>(&mut self.client.clone())
            .await?;

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache write");
        Ok(())
    }

    async fn push_capped(
        &self,
        key: &str,
        value: Vec<u8>,
        cap: usize,
        ttl: Duration,
    ) -> Result<()> {
        let stop = cap.max(1) as isize - 1;

        redis::pipe()
            .atomic()
            .cmd("LPUSH")
            .arg(key)
            .arg(value)
            .ignore()
            .cmd("LTRIM")
            .arg(key)
            .arg(0)
            .arg(stop)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .ignore()
            .query_async::<_, ()>(&mut self.client.clone())
            .await?;

        Ok(())
    }
}
