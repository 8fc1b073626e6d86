//! Reader serving a fixed set of kstat records.

use super::command::parse_kstat_json;
use super::{KstatReader, KstatRecord, KstatSelector};
use crate::errors::{GuestmonError, GuestmonResult};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Serves records captured earlier, e.g. with `kstat -j > snapshot.json`.
///
/// Selector filtering happens here, the same way `kstat -c -m -i` filters.
#[derive(Debug, Default)]
pub struct SnapshotKstatReader {
    records: Vec<KstatRecord>,
    reads: AtomicU64,
}

impl SnapshotKstatReader {
    pub fn new(records: Vec<KstatRecord>) -> Self {
        Self {
            records,
            reads: AtomicU64::new(0),
        }
    }

    pub fn from_json(json: &str) -> GuestmonResult<Self> {
        Ok(Self::new(parse_kstat_json(json)?))
    }

    pub fn from_file(path: &Path) -> GuestmonResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            GuestmonError::SourceUnavailable(format!(
                "failed to read kstat snapshot {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Number of `read` calls served so far.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KstatReader for SnapshotKstatReader {
    async fn read(&self, selector: &KstatSelector) -> GuestmonResult<Vec<KstatRecord>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .records
            .iter()
            .filter(|r| selector.matches(r))
            .cloned()
            .collect())
    }
}
