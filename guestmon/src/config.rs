//! Agent configuration.

use crate::collector::CacheTtl;
use crate::collector::vm::{TIME_FAMILY, family_names};
use crate::dispatcher::FailurePolicy;
use crate::errors::{GuestmonError, GuestmonResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Options for a metrics agent process.
///
/// Every field has a default, so an empty JSON object is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentOptions {
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Directory for daily-rotated log files. Stderr only when unset.
    pub log_dir: Option<PathBuf>,
    pub kstat_bin: PathBuf,
    pub zfs_bin: PathBuf,
    /// Hard limit on each external command.
    pub command_timeout_ms: u64,
    /// How long one scrape waits for a single family.
    pub collect_timeout_ms: u64,
    pub failure_policy: FailurePolicy,
    /// Per-family TTL overrides in seconds; `-1` disables caching.
    pub cache_ttl: BTreeMap<String, i64>,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            kstat_bin: PathBuf::from("/usr/bin/kstat"),
            zfs_bin: PathBuf::from("/usr/sbin/zfs"),
            command_timeout_ms: 5_000,
            collect_timeout_ms: 10_000,
            failure_policy: FailurePolicy::default(),
            cache_ttl: BTreeMap::new(),
        }
    }
}

impl AgentOptions {
    /// Load and validate options from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> GuestmonResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            GuestmonError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&raw).map_err(|e| {
            GuestmonError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        options.sanitize()?;

        tracing::debug!(path = %path.display(), "Loaded agent options");
        Ok(options)
    }

    /// Reject option values the agent cannot run with.
    pub fn sanitize(&self) -> GuestmonResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(GuestmonError::Config(format!(
                "log_level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.log_level
            )));
        }
        if self.command_timeout_ms == 0 {
            return Err(GuestmonError::Config("command_timeout_ms must be > 0".into()));
        }
        if self.collect_timeout_ms == 0 {
            return Err(GuestmonError::Config("collect_timeout_ms must be > 0".into()));
        }

        for (family, secs) in &self.cache_ttl {
            if family == TIME_FAMILY {
                return Err(GuestmonError::Config(
                    "cache_ttl: the time family is never cached".into(),
                ));
            }
            if !family_names().any(|name| name == family.as_str()) {
                return Err(GuestmonError::Config(format!(
                    "cache_ttl: unknown family '{}'",
                    family
                )));
            }
            CacheTtl::from_secs(*secs).map_err(|_| {
                GuestmonError::Config(format!(
                    "cache_ttl.{}: expected -1 or a non-negative number of seconds, got {}",
                    family, secs
                ))
            })?;
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }

    /// Configured TTL for `family`, if overridden.
    pub fn ttl_override(&self, family: &str) -> GuestmonResult<Option<CacheTtl>> {
        self.cache_ttl
            .get(family)
            .map(|secs| CacheTtl::from_secs(*secs))
            .transpose()
    }
}
