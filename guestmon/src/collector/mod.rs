//! Source collectors.
//!
//! Every statistic family is exposed through [`MetricCollector`], the only
//! seam between the instrumentation core and the serving layer:
//!
//! ```text
//! MetricCollector
//!   ├── KstatCollector   (zone_misc, memory_caps, zone_vfs, link, tcp)
//!   ├── ZfsCollector     (external `zfs list`)
//!   ├── TimeCollector    (local clock, never cached)
//!   └── CollectorCache   (wraps any of the above)
//! ```
//!
//! Per-guest state travels in [`CollectContext`]; collectors hold only their
//! static definition table and a handle to their data source.

mod context;
mod kstat;
mod time;
pub mod vm;

pub use context::CollectContext;
pub use kstat::{FamilyScope, KSTAT_DEFAULT_TTL, KstatCollector, KstatFamily};
pub use time::TimeCollector;
pub use vm::ZfsCollector;

use crate::errors::{GuestmonError, GuestmonResult};
use crate::metrics::MetricSet;
use async_trait::async_trait;
use std::time::Duration;

/// Raw TTL value meaning "never cache".
pub const TTL_BYPASS: i64 = -1;

/// How long a collector's result may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Always re-acquire.
    Bypass,
    /// Reuse a result until this much time has passed since acquisition.
    For(Duration),
}

impl CacheTtl {
    /// Build from the raw integer form: `-1` bypasses, `N >= 0` is seconds.
    pub fn from_secs(raw: i64) -> GuestmonResult<Self> {
        match raw {
            TTL_BYPASS => Ok(Self::Bypass),
            n if n >= 0 => Ok(Self::For(Duration::from_secs(n as u64))),
            n => Err(GuestmonError::Config(format!(
                "cache ttl must be -1 or a non-negative number of seconds, got {}",
                n
            ))),
        }
    }
}

/// Capability contract of a statistic family.
#[async_trait]
pub trait MetricCollector: Send + Sync {
    /// Acquire and normalize this family's metrics for one guest.
    ///
    /// Succeeds with the complete declared key set or fails entirely.
    async fn get_metrics(&self, ctx: &CollectContext) -> GuestmonResult<MetricSet>;

    /// How long results may be cached. Fixed for the collector's lifetime.
    fn cache_ttl(&self) -> CacheTtl;
}
