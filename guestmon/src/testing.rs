//! Shared fixtures for unit tests.

use crate::collector::{CacheTtl, CollectContext, KstatFamily, MetricCollector};
use crate::errors::{GuestmonError, GuestmonResult};
use crate::kstat::{KstatRecord, KstatSelector};
use crate::metrics::{MetricRecord, MetricSet, MetricValue};
use crate::process::{ProcessExecutor, ProcessOutput};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub const VM_A: &str = "7b0a2c4e-0f5e-4c2a-9a7d-1a2b3c4d5e6f";
pub const VM_B: &str = "d41f6c90-8e3b-4b7a-b2c1-0e9f8a7b6c5d";

/// A record of `family` owned by `zonename`, carrying every field the family
/// reads. Field values are `base`, `base + 1`, ... in table order.
pub fn family_record(family: &KstatFamily, zonename: &str, instance: u32, base: u64) -> KstatRecord {
    let selector = KstatSelector::new(family.class, family.module).with_instance(instance);
    family
        .metrics
        .iter()
        .zip(base..)
        .fold(
            KstatRecord::new(&selector, zonename).with_field("zonename", zonename),
            |record, (def, value)| record.with_field(def.source_key, value),
        )
}

/// Canned process executor that records every argv it is asked to run.
pub struct StubExecutor {
    result: GuestmonResult<ProcessOutput>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StubExecutor {
    pub fn stdout(stdout: &str) -> Self {
        Self::exited(0, stdout, "")
    }

    pub fn exited(code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            result: Ok(ProcessOutput {
                exit_code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: GuestmonError) -> Self {
        Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProcessExecutor for StubExecutor {
    async fn run(&self, argv: &[String]) -> GuestmonResult<ProcessOutput> {
        self.calls.lock().push(argv.to_vec());
        self.result.clone()
    }
}

/// Collector that counts acquisitions.
///
/// Emits `key` with the call number as its value, after `delay`.
pub struct CountingCollector {
    key: &'static str,
    ttl: CacheTtl,
    delay: Duration,
    calls: AtomicU64,
    fail: AtomicBool,
}

impl CountingCollector {
    pub fn new(key: &'static str, ttl: CacheTtl) -> Self {
        Self {
            key,
            ttl,
            delay: Duration::ZERO,
            calls: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricCollector for CountingCollector {
    async fn get_metrics(&self, _ctx: &CollectContext) -> GuestmonResult<MetricSet> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(GuestmonError::SourceUnavailable(format!(
                "{} source down (call {})",
                self.key, call
            )));
        }
        Ok(MetricSet::from_iter([MetricRecord::gauge(
            self.key,
            "Acquisition number",
            MetricValue::Unsigned(call),
        )]))
    }

    fn cache_ttl(&self) -> CacheTtl {
        self.ttl
    }
}

/// Value of a single-record set produced by [`CountingCollector`].
pub fn call_number(metrics: &MetricSet, key: &str) -> u64 {
    metrics
        .get(key)
        .and_then(|r| r.value.as_u64())
        .unwrap_or_default()
}
