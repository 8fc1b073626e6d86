use super::{CacheTtl, CollectContext, MetricCollector};
use crate::errors::{GuestmonError, GuestmonResult};
use crate::metrics::{MetricRecord, MetricSet, MetricValue};
use async_trait::async_trait;
use chrono::Utc;

/// Reports the host's wall clock. Never cached.
#[derive(Debug, Default)]
pub struct TimeCollector;

impl TimeCollector {
    pub const KEY: &'static str = "time_of_day";
    const HELP: &'static str = "System time in milliseconds since epoch";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetricCollector for TimeCollector {
    async fn get_metrics(&self, _ctx: &CollectContext) -> GuestmonResult<MetricSet> {
        let millis = Utc::now().timestamp_millis();
        let millis = u64::try_from(millis).map_err(|_| {
            GuestmonError::SourceUnavailable(format!("system clock is before the epoch: {}", millis))
        })?;

        Ok(MetricSet::from_iter([MetricRecord::counter(
            Self::KEY,
            Self::HELP,
            MetricValue::Unsigned(millis),
        )]))
    }

    fn cache_ttl(&self) -> CacheTtl {
        CacheTtl::Bypass
    }
}
