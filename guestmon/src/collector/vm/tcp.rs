//! TCP stack health counters (`tcp:*:net`).
//!
//! Like links, TCP kstats are reported for every netstack at once and
//! filtered by `zonename`.

use crate::collector::{FamilyScope, KstatFamily};
use crate::metrics::MetricDef;

static TCP_METRICS: &[MetricDef] = &[
    MetricDef::counter(
        "attemptFails",
        "failed_connection_attempt_count",
        "Failed TCP connection attempts",
    ),
    MetricDef::counter(
        "retransSegs",
        "retransmitted_segment_count",
        "Retransmitted TCP segments",
    ),
    MetricDef::counter("inDupAck", "duplicate_ack_count", "Duplicate TCP ACK count"),
    MetricDef::counter(
        "listenDrop",
        "listen_drop_count",
        "TCP listen drops. Connection refused because backlog full",
    ),
    MetricDef::counter(
        "listenDropQ0",
        "listen_drop_Q0_count",
        "TCP listen drops Q0. Connection refused from half-open queue",
    ),
    MetricDef::counter(
        "halfOpenDrop",
        "half_open_drop_count",
        "TCP connection dropped from a full half-open queue",
    ),
    MetricDef::counter(
        "timRetransDrop",
        "retransmit_timeout_drop_count",
        "TCP connection dropped due to retransmit timeout",
    ),
];

pub static TCP: KstatFamily = KstatFamily {
    name: "tcp",
    class: "net",
    module: "tcp",
    scope: FamilyScope::Guest,
    metrics: TCP_METRICS,
};
