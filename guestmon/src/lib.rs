//! Per-guest metrics collection.
//!
//! Kernel statistics, ZFS usage and the host clock are read per guest,
//! normalized into typed [`MetricRecord`]s, cached per family and merged by
//! a [`MetricDispatcher`].
//!
//! ```text
//! MetricDispatcher::collect(ctx)
//!   └── per family, concurrently
//!         CollectorCache ──→ KstatCollector ──→ KstatReader ──→ normalize
//!                        ──→ ZfsCollector   ──→ ProcessExecutor
//!         TimeCollector
//! ```

#![forbid(unsafe_code)]

pub mod cache;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod kstat;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod process;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheStats, CollectorCache};
pub use collector::{CacheTtl, CollectContext, MetricCollector};
pub use config::AgentOptions;
pub use dispatcher::{FailurePolicy, FamilyFailure, FamilyTiming, MetricDispatcher, Scrape};
pub use errors::{GuestmonError, GuestmonResult};
pub use logging::init_logging;
pub use metrics::{MetricRecord, MetricSet, MetricType, MetricValue};
