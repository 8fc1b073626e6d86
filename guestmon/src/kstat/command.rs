//! Reader backed by the `kstat(8)` command.

use super::{KstatReader, KstatRecord, KstatSelector};
use crate::errors::{GuestmonError, GuestmonResult};
use crate::process::ProcessExecutor;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// `kstat` exit status when no statistic matched the selector.
const KSTAT_NO_MATCH_EXIT: i32 = 1;

/// Reads kstats by running `kstat -j` and parsing its JSON output.
pub struct CommandKstatReader {
    kstat_bin: PathBuf,
    executor: Arc<dyn ProcessExecutor>,
}

impl CommandKstatReader {
    pub fn new(kstat_bin: impl Into<PathBuf>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            kstat_bin: kstat_bin.into(),
            executor,
        }
    }

    fn argv(&self, selector: &KstatSelector) -> Vec<String> {
        let mut argv = vec![
            self.kstat_bin.display().to_string(),
            "-j".to_string(),
            "-c".to_string(),
            selector.class.to_string(),
            "-m".to_string(),
            selector.module.to_string(),
        ];
        if let Some(instance) = selector.instance {
            argv.push("-i".to_string());
            argv.push(instance.to_string());
        }
        argv
    }
}

/// Parse `kstat -j` output. Blank output means no kstat matched.
pub(crate) fn parse_kstat_json(stdout: &str) -> GuestmonResult<Vec<KstatRecord>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout)
        .map_err(|e| GuestmonError::MalformedOutput(format!("invalid kstat json: {}", e)))
}

#[async_trait]
impl KstatReader for CommandKstatReader {
    async fn read(&self, selector: &KstatSelector) -> GuestmonResult<Vec<KstatRecord>> {
        let argv = self.argv(selector);
        let output = self.executor.run(&argv).await?;
        if output.exit_code == Some(KSTAT_NO_MATCH_EXIT) && output.stdout.trim().is_empty() {
            tracing::trace!(selector = %selector, "No kstats matched");
            return Ok(Vec::new());
        }
        let output = output.check(&argv[0])?;
        let records = parse_kstat_json(&output.stdout)?;
        tracing::trace!(selector = %selector, count = records.len(), "Read kstats");
        Ok(records)
    }
}
