//! CPU usage and load average (`zones:<instance>:zone_misc`).

use crate::collector::{FamilyScope, KstatFamily};
use crate::metrics::{MetricDef, load_average};

static ZONE_MISC_METRICS: &[MetricDef] = &[
    MetricDef::counter(
        "nsec_user",
        "cpu_user_usage",
        "User CPU utilization in nanoseconds",
    ),
    MetricDef::counter("nsec_sys", "cpu_sys_usage", "System CPU usage in nanoseconds"),
    MetricDef::counter("nsec_waitrq", "cpu_wait_time", "CPU wait time in nanoseconds"),
    MetricDef::gauge("avenrun_1min", "load_average", "Load average").with_modifier(load_average),
];

pub static ZONE_MISC: KstatFamily = KstatFamily {
    name: "zone_misc",
    class: "zone_misc",
    module: "zones",
    scope: FamilyScope::Instance,
    metrics: ZONE_MISC_METRICS,
};
