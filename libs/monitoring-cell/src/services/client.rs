// =====================================================================================
// METRICS CLIENT
// =====================================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use shared_config::AppConfig;
use shared_models::MetricSample;

use crate::error::MetricsError;
use crate::models::{BackendItem, HostInfo};
use crate::services::backend::MonitoringBackend;
use crate::services::cache::{CacheStats, TtlCache};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, MetricsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MetricsError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "transient backend failure, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Cached, retrying front for a [`MonitoringBackend`]. Host and item listings
/// are cached; history is always fetched fresh.
pub struct MetricsClient {
    backend: Arc<dyn MonitoringBackend>,
    host_cache: TtlCache<HostInfo>,
    item_cache: TtlCache<Vec<BackendItem>>,
    retry: RetryPolicy,
}

impl MetricsClient {
    pub fn new(backend: Arc<dyn MonitoringBackend>, config: &AppConfig) -> Self {
        Self::with_policy(
            backend,
            config.host_cache_ttl,
            config.item_cache_ttl,
            RetryPolicy {
                max_attempts: config.retry_attempts,
                base_backoff: config.retry_backoff,
            },
        )
    }

    pub fn with_policy(
        backend: Arc<dyn MonitoringBackend>,
        host_ttl: Duration,
        item_ttl: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            host_cache: TtlCache::new("host_info", host_ttl),
            item_cache: TtlCache::new("item_listing", item_ttl),
            retry,
        }
    }

    #[instrument(skip(self))]
    pub async fn fetch_host_info(&self, host_ref: &str) -> Result<HostInfo, MetricsError> {
        let backend = &self.backend;
        let retry = &self.retry;

        self.host_cache
            .get_or_try_insert_with(host_ref, || async move {
                retry
                    .run("host.get", move || backend.query_host_info(host_ref))
                    .await?
                    .ok_or_else(|| MetricsError::HostNotFound(host_ref.to_string()))
            })
            .await
    }

    /// Samples of `metric_key` on `host_ref` between `from` and `to`, oldest
    /// first. An empty result means "no data", not failure.
    #[instrument(skip(self))]
    pub async fn fetch_history(
        &self,
        asset_id: &str,
        host_ref: &str,
        metric_key: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, MetricsError> {
        if from > to {
            return Err(MetricsError::InvalidTimeRange { from, to });
        }

        self.fetch_host_info(host_ref).await?;

        let Some(item) = self.resolve_item(host_ref, metric_key).await? else {
            debug!(host = host_ref, metric = metric_key, "no numeric item for metric key");
            return Ok(Vec::new());
        };

        let backend = &self.backend;
        let item = &item;
        let mut points = self
            .retry
            .run("history.get", move || backend.query_history(item, from, to))
            .await?;
        points.sort_by_key(|p| p.clock);

        Ok(points
            .into_iter()
            .map(|p| MetricSample {
                asset_id: asset_id.to_string(),
                metric_name: metric_key.to_string(),
                timestamp: p.clock,
                value: p.value,
            })
            .collect())
    }

    // Exact key match wins over a substring match; only numeric items qualify.
    async fn resolve_item(
        &self,
        host_ref: &str,
        metric_key: &str,
    ) -> Result<Option<BackendItem>, MetricsError> {
        let backend = &self.backend;
        let retry = &self.retry;
        let cache_key = format!("{}:{}", host_ref, metric_key);

        let items = self
            .item_cache
            .get_or_try_insert_with(&cache_key, || async move {
                retry
                    .run("item.get", move || backend.query_items(host_ref, metric_key))
                    .await
            })
            .await?;

        let chosen = items
            .iter()
            .find(|item| item.is_numeric() && item.key == metric_key)
            .or_else(|| items.iter().find(|item| item.is_numeric()));

        Ok(chosen.cloned())
    }

    pub async fn cache_stats(&self) -> Vec<CacheStats> {
        vec![self.host_cache.stats().await, self.item_cache.stats().await]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(10),
        };

        let result: Result<(), MetricsError> = policy
            .run("host.get", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(MetricsError::BackendUnavailable("refused".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_does_not_repeat_permanent_errors() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), MetricsError> = policy
            .run("host.get", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(MetricsError::Protocol("bad params".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }
}
