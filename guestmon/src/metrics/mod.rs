//! Metric record model.
//!
//! A [`MetricRecord`] is the normalized output unit of every collector. A
//! collector returns a [`MetricSet`]: records keyed by their metric key, with
//! no ordering significance.
//!
//! ```text
//! MetricDef (static) ──normalize──→ MetricRecord ─┐
//!                                                  ├──→ MetricSet
//! clock / process output ──────────→ MetricRecord ─┘
//! ```

mod definition;

pub use definition::{MetricDef, Modifier, load_average, memory_limit};

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Cumulative, monotonically non-decreasing value.
    Counter,
    /// Instantaneous value.
    Gauge,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => f.write_str("counter"),
            Self::Gauge => f.write_str("gauge"),
        }
    }
}

/// Numeric value of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Unsigned(u64),
    Float(f64),
}

impl MetricValue {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Unsigned(v) => Some(v),
            Self::Float(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

/// A normalized, typed, documented metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub key: &'static str,
    pub help: &'static str,
    #[serde(rename = "type")]
    pub metric_type: MetricType,
    pub value: MetricValue,
}

impl MetricRecord {
    pub fn counter(key: &'static str, help: &'static str, value: MetricValue) -> Self {
        Self {
            key,
            help,
            metric_type: MetricType::Counter,
            value,
        }
    }

    pub fn gauge(key: &'static str, help: &'static str, value: MetricValue) -> Self {
        Self {
            key,
            help,
            metric_type: MetricType::Gauge,
            value,
        }
    }
}

/// Set of metric records keyed by metric key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricSet {
    records: BTreeMap<&'static str, MetricRecord>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, returning the record it replaced (if any).
    pub fn insert(&mut self, record: MetricRecord) -> Option<MetricRecord> {
        self.records.insert(record.key, record)
    }

    pub fn get(&self, key: &str) -> Option<&MetricRecord> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.records.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<MetricRecord> for MetricSet {
    fn from_iter<I: IntoIterator<Item = MetricRecord>>(iter: I) -> Self {
        let mut set = Self::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl IntoIterator for MetricSet {
    type Item = MetricRecord;
    type IntoIter = std::collections::btree_map::IntoValues<&'static str, MetricRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_values()
    }
}
