//! TTL cache in front of a [`MetricCollector`].
//!
//! Per [`CollectContext`] the cache holds at most one live entry and at most
//! one in-flight acquisition:
//!
//! ```text
//! get_metrics(ctx)
//!   ├── ttl == Bypass            → source.get_metrics(ctx)
//!   ├── live entry               → clone entry            (hit)
//!   ├── acquisition in flight    → await shared future    (coalesced)
//!   └── otherwise                → spawn acquisition      (miss)
//! ```
//!
//! Acquisitions run as detached tasks. A caller that gives up waiting does
//! not cancel the acquisition; the task stores its own result and clears the
//! in-flight marker. Failures reach every waiter and are never stored.

use crate::collector::{CacheTtl, CollectContext, MetricCollector};
use crate::errors::{GuestmonError, GuestmonResult};
use crate::metrics::MetricSet;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

type Acquisition = Shared<BoxFuture<'static, GuestmonResult<MetricSet>>>;

/// Snapshot of a cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests served from a live entry.
    pub hits: u64,
    /// Requests that started an acquisition.
    pub misses: u64,
    /// Requests that joined an acquisition already in flight.
    pub coalesced: u64,
}

#[derive(Default)]
struct StatsStorage {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

struct Entry {
    metrics: MetricSet,
    expires_at: Instant,
}

#[derive(Default)]
struct Slot {
    entry: Option<Entry>,
    inflight: Option<Acquisition>,
    /// Bumped for every acquisition; a finishing task only clears its own marker.
    generation: u64,
}

impl Slot {
    /// Nothing in flight and no live entry: safe to drop.
    fn is_idle(&self, now: Instant) -> bool {
        self.inflight.is_none() && self.entry.as_ref().is_none_or(|e| e.expires_at <= now)
    }
}

struct CacheInner {
    family: String,
    source: Arc<dyn MetricCollector>,
    slots: Mutex<HashMap<CollectContext, Slot>>,
    stats: StatsStorage,
}

/// Caching, miss-coalescing wrapper around one collector.
#[derive(Clone)]
pub struct CollectorCache {
    inner: Arc<CacheInner>,
}

impl CollectorCache {
    pub fn new(family: impl Into<String>, source: Arc<dyn MetricCollector>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                family: family.into(),
                source,
                slots: Mutex::new(HashMap::new()),
                stats: StatsStorage::default(),
            }),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let stats = &self.inner.stats;
        CacheStats {
            hits: stats.hits.load(Ordering::Relaxed),
            misses: stats.misses.load(Ordering::Relaxed),
            coalesced: stats.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Number of guests the cache currently holds state for.
    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// Start an acquisition for `ctx`. Caller holds the slot lock.
    fn start_acquisition(&self, ctx: CollectContext, slot: &mut Slot, ttl: Duration) -> Acquisition {
        slot.generation += 1;
        let generation = slot.generation;
        let inner = Arc::clone(&self.inner);

        let handle = tokio::spawn(async move {
            let _guard = InflightGuard {
                inner: Arc::clone(&inner),
                ctx,
                generation,
            };

            let started = Instant::now();
            let result = inner.source.get_metrics(&ctx).await;
            match &result {
                Ok(metrics) => {
                    inner.store(ctx, generation, metrics.clone(), ttl);
                    tracing::debug!(
                        family = %inner.family,
                        ctx = %ctx,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Acquired metrics"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        family = %inner.family,
                        ctx = %ctx,
                        error = %e,
                        "Acquisition failed, not cached"
                    );
                }
            }
            result
        });

        let acquisition = handle
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(GuestmonError::Internal(format!("acquisition task failed: {}", e)))
                })
            })
            .boxed()
            .shared();
        slot.inflight = Some(acquisition.clone());
        acquisition
    }
}

impl CacheInner {
    fn store(&self, ctx: CollectContext, generation: u64, metrics: MetricSet, ttl: Duration) {
        let mut slots = self.slots.lock();
        let slot = slots.entry(ctx).or_default();
        if slot.generation != generation {
            return;
        }
        slot.entry = Some(Entry {
            metrics,
            expires_at: Instant::now() + ttl,
        });
    }
}

/// Clears the in-flight marker when an acquisition task ends, including by
/// panic or abort.
struct InflightGuard {
    inner: Arc<CacheInner>,
    ctx: CollectContext,
    generation: u64,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let mut slots = self.inner.slots.lock();
        let Some(slot) = slots.get_mut(&self.ctx) else {
            return;
        };
        if slot.generation != self.generation {
            return;
        }
        slot.inflight = None;
        // A failed acquisition leaves nothing worth keeping.
        if slot.is_idle(Instant::now()) {
            slots.remove(&self.ctx);
        }
    }
}

#[async_trait]
impl MetricCollector for CollectorCache {
    async fn get_metrics(&self, ctx: &CollectContext) -> GuestmonResult<MetricSet> {
        let ttl = match self.inner.source.cache_ttl() {
            CacheTtl::Bypass => return self.inner.source.get_metrics(ctx).await,
            CacheTtl::For(ttl) => ttl,
        };

        let acquisition = {
            let now = Instant::now();
            let mut slots = self.inner.slots.lock();
            if let Some(entry) = slots.get(ctx).and_then(|slot| slot.entry.as_ref()) {
                if entry.expires_at > now {
                    self.inner.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry.metrics.clone());
                }
            }

            // Guests that stopped being scraped leave only idle slots behind.
            let before = slots.len();
            slots.retain(|key, slot| key == ctx || !slot.is_idle(now));
            let evicted = before - slots.len();
            if evicted > 0 {
                tracing::trace!(family = %self.inner.family, evicted, "Evicted idle cache slots");
            }

            let slot = slots.entry(*ctx).or_default();
            match slot.inflight.clone() {
                Some(inflight) => {
                    self.inner.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                    inflight
                }
                None => {
                    self.inner.stats.misses.fetch_add(1, Ordering::Relaxed);
                    self.start_acquisition(*ctx, slot, ttl)
                }
            }
        };

        acquisition.await
    }

    fn cache_ttl(&self) -> CacheTtl {
        self.inner.source.cache_ttl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingCollector, VM_A, VM_B, call_number};

    const KEY: &str = "acquisitions";

    fn ctx(vm: &str) -> CollectContext {
        CollectContext::parse(vm, Some(1)).unwrap()
    }

    fn cache_over(source: CountingCollector) -> (CollectorCache, Arc<CountingCollector>) {
        let source = Arc::new(source);
        let cache = CollectorCache::new("test", source.clone());
        (cache, source)
    }

    #[tokio::test(start_paused = true)]
    async fn test_bypass_always_reaches_source() {
        let (cache, source) = cache_over(CountingCollector::new(KEY, CacheTtl::Bypass));

        for expected in 1..=3 {
            let metrics = cache.get_metrics(&ctx(VM_A)).await.unwrap();
            assert_eq!(call_number(&metrics, KEY), expected);
        }
        assert_eq!(source.calls(), 3);
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_hit_then_refresh() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(CountingCollector::new(KEY, ttl));

        let first = cache.get_metrics(&ctx(VM_A)).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        let second = cache.get_metrics(&ctx(VM_A)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        let third = cache.get_metrics(&ctx(VM_A)).await.unwrap();

        assert_eq!(call_number(&third, KEY), 2);
        assert_eq!(source.calls(), 2);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                coalesced: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_are_per_context() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(CountingCollector::new(KEY, ttl));

        cache.get_metrics(&ctx(VM_A)).await.unwrap();
        let other = cache.get_metrics(&ctx(VM_B)).await.unwrap();

        assert_eq!(call_number(&other, KEY), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_not_cached() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(CountingCollector::new(KEY, ttl));

        source.set_failing(true);
        let err = cache.get_metrics(&ctx(VM_A)).await.unwrap_err();
        assert!(matches!(err, GuestmonError::SourceUnavailable(_)));

        source.set_failing(false);
        let metrics = cache.get_metrics(&ctx(VM_A)).await.unwrap();
        assert_eq!(call_number(&metrics, KEY), 2);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_live_entry() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(CountingCollector::new(KEY, ttl));

        let first = cache.get_metrics(&ctx(VM_A)).await.unwrap();
        source.set_failing(true);
        // Expired for VM_B only: its refresh fails while VM_A stays live.
        assert!(cache.get_metrics(&ctx(VM_B)).await.is_err());
        let again = cache.get_metrics(&ctx(VM_A)).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(source.calls(), 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(cache.get_metrics(&ctx(VM_A)).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_misses_coalesce() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(
            CountingCollector::new(KEY, ttl).with_delay(Duration::from_millis(100)),
        );

        let ctx = ctx(VM_A);
        let results = futures::future::join_all((0..8).map(|_| cache.get_metrics(&ctx))).await;

        assert_eq!(source.calls(), 1);
        for result in results {
            assert_eq!(call_number(&result.unwrap(), KEY), 1);
        }
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.coalesced, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_failure_fans_out() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(
            CountingCollector::new(KEY, ttl).with_delay(Duration::from_millis(100)),
        );
        source.set_failing(true);

        let ctx = ctx(VM_A);
        let results = futures::future::join_all((0..4).map(|_| cache.get_metrics(&ctx))).await;

        assert_eq!(source.calls(), 1);
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_acquisition_still_populates() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(
            CountingCollector::new(KEY, ttl).with_delay(Duration::from_secs(2)),
        );

        let waited =
            tokio::time::timeout(Duration::from_secs(1), cache.get_metrics(&ctx(VM_A))).await;
        assert!(waited.is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let metrics = cache.get_metrics(&ctx(VM_A)).await.unwrap();

        assert_eq!(call_number(&metrics, KEY), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_departed_guests_are_evicted() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, _source) = cache_over(CountingCollector::new(KEY, ttl));

        for n in 0..100u128 {
            let departed = CollectContext::new(uuid::Uuid::from_u128(n + 1), Some(1));
            cache.get_metrics(&departed).await.unwrap();
        }
        assert_eq!(cache.slot_count(), 100);

        tokio::time::advance(Duration::from_secs(3600)).await;
        cache.get_metrics(&ctx(VM_A)).await.unwrap();

        assert_eq!(cache.slot_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_entries_survive_eviction() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(CountingCollector::new(KEY, ttl));

        cache.get_metrics(&ctx(VM_A)).await.unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.get_metrics(&ctx(VM_B)).await.unwrap();

        assert_eq!(cache.slot_count(), 2);
        let again = cache.get_metrics(&ctx(VM_A)).await.unwrap();
        assert_eq!(call_number(&again, KEY), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_guest_leaves_no_slot() {
        let ttl = CacheTtl::For(Duration::from_secs(10));
        let (cache, source) = cache_over(CountingCollector::new(KEY, ttl));
        source.set_failing(true);

        assert!(cache.get_metrics(&ctx(VM_A)).await.is_err());

        assert_eq!(cache.slot_count(), 0);
    }
}
