//! ZFS capacity of the guest's dataset, via `zfs list -Hp`.

use crate::collector::{CacheTtl, CollectContext, MetricCollector};
use crate::errors::{GuestmonError, GuestmonResult};
use crate::metrics::{MetricDef, MetricSet};
use crate::process::ProcessExecutor;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default TTL; `zfs list` is the most expensive acquisition.
pub const ZFS_DEFAULT_TTL: CacheTtl = CacheTtl::For(Duration::from_secs(300));

/// Column index of each value in `zfs list -Hp` output
/// (`name used avail refer mountpoint`).
const USED_COLUMN: usize = 1;
const AVAILABLE_COLUMN: usize = 2;

static ZFS_METRICS: &[MetricDef] = &[
    MetricDef::gauge("used", "zfs_used", "zfs space used in bytes"),
    MetricDef::gauge("available", "zfs_available", "zfs space available in bytes"),
];

/// Collects dataset usage for `zones/<vm_uuid>`.
pub struct ZfsCollector {
    zfs_bin: PathBuf,
    executor: Arc<dyn ProcessExecutor>,
    ttl: CacheTtl,
}

impl ZfsCollector {
    pub fn new(zfs_bin: impl Into<PathBuf>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self::with_ttl(zfs_bin, executor, ZFS_DEFAULT_TTL)
    }

    pub fn with_ttl(
        zfs_bin: impl Into<PathBuf>,
        executor: Arc<dyn ProcessExecutor>,
        ttl: CacheTtl,
    ) -> Self {
        Self {
            zfs_bin: zfs_bin.into(),
            executor,
            ttl,
        }
    }

    /// Keys this collector emits on success.
    pub fn keys() -> impl Iterator<Item = &'static str> {
        ZFS_METRICS.iter().map(|m| m.key)
    }
}

/// Parse the first line of `zfs list -Hp` into `(used, available)`.
fn parse_zfs_list(stdout: &str) -> GuestmonResult<[(&'static str, u64); 2]> {
    let line = stdout
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| GuestmonError::MalformedOutput("zfs list printed nothing".into()))?;

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() <= AVAILABLE_COLUMN {
        return Err(GuestmonError::MalformedOutput(format!(
            "zfs list: expected at least {} tab-separated fields, got {}: {:?}",
            AVAILABLE_COLUMN + 1,
            fields.len(),
            line
        )));
    }

    let column = |index: usize, name: &'static str| -> GuestmonResult<(&'static str, u64)> {
        let raw = fields[index].trim();
        raw.parse::<u64>().map(|v| (name, v)).map_err(|_| {
            GuestmonError::MalformedOutput(format!("zfs list: {} is not a byte count: {:?}", name, raw))
        })
    };

    Ok([column(USED_COLUMN, "used")?, column(AVAILABLE_COLUMN, "available")?])
}

#[async_trait]
impl MetricCollector for ZfsCollector {
    async fn get_metrics(&self, ctx: &CollectContext) -> GuestmonResult<MetricSet> {
        let dataset = format!("zones/{}", ctx.zonename());
        let argv = vec![
            self.zfs_bin.display().to_string(),
            "list".to_string(),
            "-Hp".to_string(),
            dataset,
        ];

        let output = self.executor.execute(&argv).await?;
        let values = parse_zfs_list(&output.stdout)?;

        ZFS_METRICS
            .iter()
            .map(|def| {
                values
                    .iter()
                    .find(|(name, _)| *name == def.source_key)
                    .map(|(_, raw)| def.record(*raw))
                    .ok_or_else(|| GuestmonError::MissingField {
                        origin: "zfs list".into(),
                        field: def.source_key.to_string(),
                    })
            })
            .collect()
    }

    fn cache_ttl(&self) -> CacheTtl {
        self.ttl
    }
}
