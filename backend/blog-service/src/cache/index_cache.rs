use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};

/// Home-page cache backed by Redis.
///
/// A single slot under a fixed key holds the fully rendered global-feed
/// document for a short window. The key deliberately does not vary with the
/// `page` query parameter: while the slot is warm, every request to the
/// home page is answered with the cached bytes. Expiry is purely time-based;
/// `clear` exists for administrative and test tooling.
#[derive(Clone)]
pub struct IndexCache {
    redis: ConnectionManager,
    ttl: Duration,
}

const INDEX_KEY: &str = "index:rendered:v1";

impl IndexCache {
    pub fn new(redis: ConnectionManager, ttl_secs: u64) -> Self {
        Self {
            redis,
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn key() -> &'static str {
        INDEX_KEY
    }

    /// The cached rendered document, if the slot is warm.
    pub async fn fetch(&self) -> Result<Option<String>> {
        let mut conn = self.redis.clone();

        let body: Option<String> = conn
            .get(Self::key())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        match &body {
            Some(_) => debug!("index cache HIT"),
            None => debug!("index cache MISS"),
        }

        Ok(body)
    }

    /// Fill the slot with a rendered document for the configured TTL.
    pub async fn store(&self, body: &str) -> Result<()> {
        let mut conn = self.redis.clone();

        conn.set_ex::<_, _, ()>(Self::key(), body, self.ttl.as_secs())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        debug!(ttl = ?self.ttl, bytes = body.len(), "index cache WRITE");

        Ok(())
    }

    /// Empty the slot. Used by administrative and test tooling; production
    /// invalidation is time-based only.
    pub async fn clear(&self) -> Result<()> {
        let mut conn = self.redis.clone();

        conn.del::<_, ()>(Self::key())
            .await
            .map_err(|e| AppError::Cache(e.to_string()))?;

        debug!("index cache CLEAR");

        Ok(())
    }
}
