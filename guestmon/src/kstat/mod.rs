//! Kernel statistic (kstat) access.
//!
//! The reader is an opaque data source: given a selector it returns raw,
//! labelled records. It may return nothing, records for other guests, or
//! records missing fields; the normalizer deals with all three.
//!
//! ## Readers
//!
//! - [`CommandKstatReader`]: runs `kstat -j` through a [`ProcessExecutor`]
//! - [`SnapshotKstatReader`]: serves a fixed record set (saved `kstat -j`
//!   output, tests)
//!
//! [`ProcessExecutor`]: crate::process::ProcessExecutor

mod command;
mod snapshot;

pub use command::CommandKstatReader;
pub use snapshot::SnapshotKstatReader;

use crate::errors::GuestmonResult;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Selects a group of kstats by class, module and optional instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KstatSelector {
    pub class: &'static str,
    pub module: &'static str,
    pub instance: Option<u32>,
}

impl KstatSelector {
    pub fn new(class: &'static str, module: &'static str) -> Self {
        Self {
            class,
            module,
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: u32) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Whether `record` falls under this selector.
    pub fn matches(&self, record: &KstatRecord) -> bool {
        record.class == self.class
            && record.module == self.module
            && self.instance.is_none_or(|i| record.instance == i)
    }
}

impl fmt::Display for KstatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(i) => write!(f, "{}:{}:{}", self.module, i, self.class),
            None => write!(f, "{}:*:{}", self.module, self.class),
        }
    }
}

/// A raw field value inside a kstat record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KstatValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(String),
}

impl KstatValue {
    /// Integer view of the value; `None` for text, floats and negatives.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Unsigned(v) => Some(v),
            Self::Signed(v) => u64::try_from(v).ok(),
            Self::Float(_) | Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<u64> for KstatValue {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<&str> for KstatValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One kstat as reported by `kstat -j`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KstatRecord {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub instance: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub data: HashMap<String, KstatValue>,
}

impl KstatRecord {
    pub fn new(selector: &KstatSelector, name: impl Into<String>) -> Self {
        Self {
            module: selector.module.to_string(),
            instance: selector.instance.unwrap_or(0),
            name: name.into(),
            class: selector.class.to_string(),
            data: HashMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<KstatValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&KstatValue> {
        self.data.get(key)
    }

    /// Name of the zone that owns this record, if the source labels it.
    pub fn zonename(&self) -> Option<&str> {
        self.field("zonename").and_then(KstatValue::as_str)
    }
}

/// Source of raw kstat records.
#[async_trait]
pub trait KstatReader: Send + Sync {
    /// Read every record matching `selector`.
    ///
    /// An empty result is not an error at this level.
    async fn read(&self, selector: &KstatSelector) -> GuestmonResult<Vec<KstatRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_deserialize_variants() {
        let values: Vec<KstatValue> =
            serde_json::from_str(r#"[18446744073709551615, -4, 1.25, "global"]"#).unwrap();
        assert_eq!(values[0], KstatValue::Unsigned(u64::MAX));
        assert_eq!(values[1], KstatValue::Signed(-4));
        assert_eq!(values[2], KstatValue::Float(1.25));
        assert_eq!(values[3], KstatValue::Text("global".into()));
    }

    #[test]
    fn test_value_as_u64() {
        assert_eq!(KstatValue::Unsigned(3).as_u64(), Some(3));
        assert_eq!(KstatValue::Signed(3).as_u64(), Some(3));
        assert_eq!(KstatValue::Signed(-3).as_u64(), None);
        assert_eq!(KstatValue::Float(3.0).as_u64(), None);
        assert_eq!(KstatValue::Text("3".into()).as_u64(), None);
    }

    #[test]
    fn test_selector_matches_instance() {
        let selector = KstatSelector::new("zone_vfs", "zone_vfs").with_instance(4);
        let hit = KstatRecord::new(&selector, "z");
        let miss = KstatRecord::new(&KstatSelector::new("zone_vfs", "zone_vfs").with_instance(5), "z");

        assert!(selector.matches(&hit));
        assert!(!selector.matches(&miss));
        assert!(KstatSelector::new("zone_vfs", "zone_vfs").matches(&miss));
        assert_eq!(selector.to_string(), "zone_vfs:4:zone_vfs");
    }

    #[test]
    fn test_record_zonename() {
        let record = KstatRecord::new(&KstatSelector::new("net", "link"), "vnic0")
            .with_field("zonename", "abc")
            .with_field("rbytes64", 10u64);
        assert_eq!(record.zonename(), Some("abc"));
        assert_eq!(record.field("rbytes64"), Some(&KstatValue::Unsigned(10)));
    }
}
