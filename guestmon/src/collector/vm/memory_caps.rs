//! Memory and swap usage against their caps
//! (`memory_cap:<instance>:zone_memory_cap`).

use crate::collector::{FamilyScope, KstatFamily};
use crate::metrics::{MetricDef, memory_limit};

static MEMORY_CAPS_METRICS: &[MetricDef] = &[
    MetricDef::gauge("rss", "mem_agg_usage", "Aggregate memory usage in bytes"),
    MetricDef::gauge("physcap", "mem_limit", "Memory limit in bytes").with_modifier(memory_limit),
    MetricDef::gauge("swap", "mem_swap", "Swap in bytes"),
    MetricDef::gauge("swapcap", "mem_swap_limit", "Swap limit in bytes")
        .with_modifier(memory_limit),
];

pub static MEMORY_CAPS: KstatFamily = KstatFamily {
    name: "memory_caps",
    class: "zone_memory_cap",
    module: "memory_cap",
    scope: FamilyScope::Instance,
    metrics: MEMORY_CAPS_METRICS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectContext, KstatCollector, MetricCollector};
    use crate::kstat::SnapshotKstatReader;
    use crate::metrics::{MetricType, MetricValue};
    use crate::testing::{VM_A, family_record};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_caps_metrics() {
        let record = family_record(&MEMORY_CAPS, VM_A, 9, 1)
            .with_field("physcap", 1073741824u64)
            .with_field("swapcap", u64::MAX);
        let collector = KstatCollector::new(&MEMORY_CAPS, Arc::new(SnapshotKstatReader::new(vec![record])));

        let ctx = CollectContext::parse(VM_A, Some(9)).unwrap();
        let metrics = collector.get_metrics(&ctx).await.unwrap();

        assert_eq!(metrics.len(), MEMORY_CAPS.metrics.len());
        assert!(metrics.iter().all(|m| m.metric_type == MetricType::Gauge));
        assert_eq!(metrics.get("mem_limit").unwrap().value, MetricValue::Unsigned(1073741824));
        assert_eq!(metrics.get("mem_swap_limit").unwrap().value, MetricValue::Unsigned(0));
    }
}
