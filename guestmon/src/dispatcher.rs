//! Fan-out of one scrape across every registered family.
//!
//! Families run concurrently, each bounded by the collect timeout. Results
//! are merged into one [`MetricSet`]; failures and timings are reported per
//! family in the returned [`Scrape`].

use crate::cache::{CacheStats, CollectorCache};
use crate::collector::vm::{KSTAT_FAMILIES, TIME_FAMILY, ZFS_FAMILY, ZFS_DEFAULT_TTL};
use crate::collector::{
    CollectContext, KSTAT_DEFAULT_TTL, KstatCollector, MetricCollector, TimeCollector, ZfsCollector,
};
use crate::config::AgentOptions;
use crate::errors::{GuestmonError, GuestmonResult};
use crate::kstat::KstatReader;
use crate::metrics::MetricSet;
use crate::process::ProcessExecutor;
use futures::future::join_all;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// What a scrape does when some families fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return what succeeded, with the failures listed alongside.
    #[default]
    BestEffort,
    /// Any failure fails the whole scrape.
    FailAll,
}

/// A family that produced no metrics in a scrape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyFailure {
    pub family: String,
    pub kind: &'static str,
    #[serde(serialize_with = "serialize_error")]
    pub error: GuestmonError,
}

fn serialize_error<S: Serializer>(error: &GuestmonError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyTiming {
    pub family: String,
    pub duration_ms: u64,
}

/// Result of one scrape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scrape {
    pub metrics: MetricSet,
    pub failures: Vec<FamilyFailure>,
    pub timings: Vec<FamilyTiming>,
}

impl Scrape {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn duration_ms(&self, family: &str) -> Option<u64> {
        self.timings
            .iter()
            .find(|t| t.family == family)
            .map(|t| t.duration_ms)
    }
}

struct Registration {
    family: String,
    collector: Arc<dyn MetricCollector>,
    cache: Option<CollectorCache>,
}

/// Holds every family for the life of the agent and runs scrapes over them.
pub struct MetricDispatcher {
    registrations: Vec<Registration>,
    collect_timeout: Duration,
    policy: FailurePolicy,
}

impl MetricDispatcher {
    pub fn new(collect_timeout: Duration, policy: FailurePolicy) -> Self {
        Self {
            registrations: Vec::new(),
            collect_timeout,
            policy,
        }
    }

    /// Dispatcher with the standard per-guest families.
    ///
    /// Every family except `time` sits behind a [`CollectorCache`]; TTLs come
    /// from `options.cache_ttl` or each family's default.
    pub fn for_vm(
        options: &AgentOptions,
        reader: Arc<dyn KstatReader>,
        executor: Arc<dyn ProcessExecutor>,
    ) -> GuestmonResult<Self> {
        options.sanitize()?;
        let mut dispatcher = Self::new(options.collect_timeout(), options.failure_policy);

        for family in KSTAT_FAMILIES {
            let ttl = options.ttl_override(family.name)?.unwrap_or(KSTAT_DEFAULT_TTL);
            let collector = KstatCollector::with_ttl(family, Arc::clone(&reader), ttl);
            dispatcher.register_cached(family.name, Arc::new(collector))?;
        }

        let ttl = options.ttl_override(ZFS_FAMILY)?.unwrap_or(ZFS_DEFAULT_TTL);
        let zfs = ZfsCollector::with_ttl(&options.zfs_bin, executor, ttl);
        dispatcher.register_cached(ZFS_FAMILY, Arc::new(zfs))?;

        dispatcher.register(TIME_FAMILY, Arc::new(TimeCollector::new()))?;

        tracing::debug!(
            families = dispatcher.registrations.len(),
            collect_timeout_ms = options.collect_timeout_ms,
            policy = ?options.failure_policy,
            "Dispatcher ready"
        );
        Ok(dispatcher)
    }

    /// Register a collector as-is.
    pub fn register(
        &mut self,
        family: impl Into<String>,
        collector: Arc<dyn MetricCollector>,
    ) -> GuestmonResult<()> {
        self.push(family.into(), collector, None)
    }

    /// Register a collector behind its own [`CollectorCache`].
    pub fn register_cached(
        &mut self,
        family: impl Into<String>,
        collector: Arc<dyn MetricCollector>,
    ) -> GuestmonResult<()> {
        let family = family.into();
        let cache = CollectorCache::new(family.clone(), collector);
        self.push(family, Arc::new(cache.clone()), Some(cache))
    }

    fn push(
        &mut self,
        family: String,
        collector: Arc<dyn MetricCollector>,
        cache: Option<CollectorCache>,
    ) -> GuestmonResult<()> {
        if self.registrations.iter().any(|r| r.family == family) {
            return Err(GuestmonError::Config(format!(
                "family '{}' is already registered",
                family
            )));
        }
        self.registrations.push(Registration {
            family,
            collector,
            cache,
        });
        Ok(())
    }

    /// Registered family names, in registration order.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.family.as_str())
    }

    /// Counters of every cached family.
    pub fn cache_stats(&self) -> Vec<(&str, CacheStats)> {
        self.registrations
            .iter()
            .filter_map(|r| r.cache.as_ref().map(|c| (r.family.as_str(), c.stats())))
            .collect()
    }

    /// Run every family for `ctx` and merge the results.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::FailAll`], the error of the first failed family
    /// in registration order. Never fails under `BestEffort`.
    pub async fn collect(&self, ctx: &CollectContext) -> GuestmonResult<Scrape> {
        let timeout = self.collect_timeout;
        let futures = self.registrations.iter().map(|reg| async move {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, reg.collector.get_metrics(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(GuestmonError::SourceUnavailable(format!(
                    "{} did not respond within {}ms",
                    reg.family,
                    timeout.as_millis()
                ))),
            };
            (reg, result, started.elapsed())
        });
        let outcomes = join_all(futures).await;

        let mut scrape = Scrape::default();
        for (reg, result, elapsed) in outcomes {
            scrape.timings.push(FamilyTiming {
                family: reg.family.clone(),
                duration_ms: elapsed.as_millis() as u64,
            });

            match result {
                Ok(metrics) => merge(&mut scrape.metrics, metrics, &reg.family, ctx),
                Err(error) => {
                    tracing::warn!(
                        vm_uuid = %ctx.vm_uuid(),
                        family = %reg.family,
                        kind = error.kind(),
                        error = %error,
                        "Family collection failed"
                    );
                    scrape.failures.push(FamilyFailure {
                        family: reg.family.clone(),
                        kind: error.kind(),
                        error,
                    });
                }
            }
        }

        if self.policy == FailurePolicy::FailAll {
            if let Some(first) = scrape.failures.first() {
                return Err(first.error.clone());
            }
        }

        tracing::debug!(
            vm_uuid = %ctx.vm_uuid(),
            metrics = scrape.metrics.len(),
            failures = scrape.failures.len(),
            "Scrape finished"
        );
        Ok(scrape)
    }
}

/// Merge `metrics` into `into`; on a key collision the earlier family wins.
fn merge(into: &mut MetricSet, metrics: MetricSet, family: &str, ctx: &CollectContext) {
    for record in metrics {
        if into.contains_key(record.key) {
            tracing::warn!(
                vm_uuid = %ctx.vm_uuid(),
                family = %family,
                key = record.key,
                "Duplicate metric key, keeping the earlier family's value"
            );
            continue;
        }
        into.insert(record);
    }
}
