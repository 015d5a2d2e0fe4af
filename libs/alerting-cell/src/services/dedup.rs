// =====================================================================================
// ALERT DE-DUPLICATION STORES
// =====================================================================================

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use shared_models::AlertKey;

use crate::error::AlertingError;

/// Idempotency store for alert keys. `try_claim` is an atomic
/// compare-and-set: exactly one concurrent caller wins a given key.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// `true` when the caller now owns `key` for `ttl`.
    async fn try_claim(&self, key: &AlertKey, ttl: Duration) -> Result<bool, AlertingError>;

    /// Gives a claim back so a later cycle may emit again.
    async fn release(&self, key: &AlertKey) -> Result<(), AlertingError>;
}

#[derive(Debug, Default)]
pub struct InMemoryDedupStore {
    claims: Mutex<HashMap<AlertKey, Instant>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.claims.lock().await.len()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn try_claim(&self, key: &AlertKey, ttl: Duration) -> Result<bool, AlertingError> {
        let mut claims = self.claims.lock().await;
        let now = Instant::now();
        claims.retain(|_, expires_at| *expires_at > now);

        if claims.contains_key(key) {
            return Ok(false);
        }

        claims.insert(key.clone(), now + ttl);
        Ok(true)
    }

    async fn release(&self, key: &AlertKey) -> Result<(), AlertingError> {
        self.claims.lock().await.remove(key);
        Ok(())
    }
}

/// Shared store for multi-instance deployments, backed by `SET NX EX`.
pub struct RedisDedupStore {
    pool: Pool,
}

impl RedisDedupStore {
    pub async fn new(redis_url: &str) -> Result<Self, AlertingError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| AlertingError::DedupStore(format!("Pool creation error: {}", e)))?;

        let store = Self { pool };
        let mut conn = store.connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis alert de-dup store initialized successfully");

        Ok(store)
    }

    async fn connection(&self) -> Result<Connection, AlertingError> {
        self.pool
            .get()
            .await
            .map_err(|e| AlertingError::DedupStore(format!("Connection error: {}", e)))
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn try_claim(&self, key: &AlertKey, ttl: Duration) -> Result<bool, AlertingError> {
        let mut conn = self.connection().await?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(key.to_string())
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        let claimed = reply.is_some();
        debug!(key = %key, claimed, "alert de-dup claim");
        Ok(claimed)
    }

    async fn release(&self, key: &AlertKey) -> Result<(), AlertingError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::RiskLevel;
    use std::sync::Arc;

    fn key(bucket: i64) -> AlertKey {
        AlertKey {
            asset_id: "asset-1".to_string(),
            condition: RiskLevel::Critical,
            bucket,
        }
    }

    #[tokio::test]
    async fn second_claim_in_same_bucket_loses() {
        let store = InMemoryDedupStore::new();
        let ttl = Duration::from_secs(3600);

        assert!(store.try_claim(&key(1), ttl).await.unwrap());
        assert!(!store.try_claim(&key(1), ttl).await.unwrap());
        assert!(store.try_claim(&key(2), ttl).await.unwrap());
    }

    #[tokio::test]
    async fn released_claim_can_be_taken_again() {
        let store = InMemoryDedupStore::new();
        let ttl = Duration::from_secs(3600);

        assert!(store.try_claim(&key(1), ttl).await.unwrap());
        store.release(&key(1)).await.unwrap();
        assert!(store.try_claim(&key(1), ttl).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn claims_expire_with_ttl() {
        let store = InMemoryDedupStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.try_claim(&key(1), ttl).await.unwrap());
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.try_claim(&key(1), ttl).await.unwrap());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_claims_have_a_single_winner() {
        let store = Arc::new(InMemoryDedupStore::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.try_claim(&key(7), Duration::from_secs(60)).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
