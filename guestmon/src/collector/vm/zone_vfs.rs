//! Filesystem (VFS) I/O counters (`zone_vfs:<instance>:zone_vfs`).

use crate::collector::{FamilyScope, KstatFamily};
use crate::metrics::MetricDef;

static ZONE_VFS_METRICS: &[MetricDef] = &[
    MetricDef::counter("nread", "vfs_bytes_read_count", "VFS number of bytes read"),
    MetricDef::counter(
        "nwritten",
        "vfs_bytes_written_count",
        "VFS number of bytes written",
    ),
    MetricDef::counter(
        "reads",
        "vfs_read_operation_count",
        "VFS number of read operations",
    ),
    MetricDef::counter(
        "writes",
        "vfs_write_operation_count",
        "VFS number of write operations",
    ),
    MetricDef::counter(
        "wtime",
        "vfs_wait_time_count",
        "VFS cumulative wait (pre-service) time",
    ),
    MetricDef::counter(
        "wlentime",
        "vfs_wait_length_time_count",
        "VFS cumulative wait length*time product",
    ),
    MetricDef::counter("rtime", "vfs_run_time_count", "VFS cumulative run (pre-service) time"),
    MetricDef::counter(
        "rlentime",
        "vfs_run_length_time_count",
        "VFS cumulative run length*time product",
    ),
    MetricDef::gauge(
        "wcnt",
        "vfs_elements_wait_state",
        "VFS number of elements in wait state",
    ),
    MetricDef::gauge(
        "rcnt",
        "vfs_elements_run_state",
        "VFS number of elements in run state",
    ),
];

pub static ZONE_VFS: KstatFamily = KstatFamily {
    name: "zone_vfs",
    class: "zone_vfs",
    module: "zone_vfs",
    scope: FamilyScope::Instance,
    metrics: ZONE_VFS_METRICS,
};
