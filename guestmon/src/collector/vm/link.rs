//! Network link counters (`link:*:net`).
//!
//! One read returns every link on the host; a guest's links are the ones
//! whose `zonename` is the guest, and their counters are summed.

use crate::collector::{FamilyScope, KstatFamily};
use crate::metrics::MetricDef;

static LINK_METRICS: &[MetricDef] = &[
    MetricDef::counter("ipackets64", "net_agg_packets_in", "Aggregate inbound packets"),
    MetricDef::counter("opackets64", "net_agg_packets_out", "Aggregate outbound packets"),
    MetricDef::counter("rbytes64", "net_agg_bytes_in", "Aggregate inbound bytes"),
    MetricDef::counter("obytes64", "net_agg_bytes_out", "Aggregate outbound bytes"),
];

pub static LINK: KstatFamily = KstatFamily {
    name: "link",
    class: "net",
    module: "link",
    scope: FamilyScope::Guest,
    metrics: LINK_METRICS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{CollectContext, KstatCollector, MetricCollector};
    use crate::kstat::SnapshotKstatReader;
    use crate::metrics::MetricValue;
    use crate::testing::{VM_A, VM_B, family_record};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_link_sums_guest_vnics_only() {
        let reader = Arc::new(SnapshotKstatReader::new(vec![
            family_record(&LINK, VM_A, 0, 10),
            family_record(&LINK, VM_B, 1, 5000),
            family_record(&LINK, VM_A, 2, 20),
        ]));
        let collector = KstatCollector::new(&LINK, reader);

        // Guest-scoped families ignore the instance number.
        let ctx = CollectContext::parse(VM_A, None).unwrap();
        let metrics = collector.get_metrics(&ctx).await.unwrap();

        assert_eq!(metrics.len(), 4);
        // family_record numbers fields base, base+1, ... in table order
        assert_eq!(metrics.get("net_agg_packets_in").unwrap().value, MetricValue::Unsigned(30));
        assert_eq!(metrics.get("net_agg_bytes_out").unwrap().value, MetricValue::Unsigned(36));
    }
}
