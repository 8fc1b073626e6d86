//! Static metric definition tables and value modifiers.

use super::{MetricRecord, MetricType, MetricValue};

/// Pure transform applied to a raw value before it is emitted.
pub type Modifier = fn(u64) -> MetricValue;

/// One entry of a metric definition table.
///
/// Tables are `'static` slices: built once, shared read-only by every
/// collector instance.
#[derive(Debug, Clone, Copy)]
pub struct MetricDef {
    /// Field name in the raw source record (kstat field, `zfs list` column).
    pub source_key: &'static str,
    /// Output metric key.
    pub key: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub modifier: Option<Modifier>,
}

impl MetricDef {
    pub const fn counter(source_key: &'static str, key: &'static str, help: &'static str) -> Self {
        Self {
            source_key,
            key,
            metric_type: MetricType::Counter,
            help,
            modifier: None,
        }
    }

    pub const fn gauge(source_key: &'static str, key: &'static str, help: &'static str) -> Self {
        Self {
            source_key,
            key,
            metric_type: MetricType::Gauge,
            help,
            modifier: None,
        }
    }

    pub const fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    /// Build the output record for a raw value.
    pub fn record(&self, raw: u64) -> MetricRecord {
        let value = match self.modifier {
            Some(modifier) => modifier(raw),
            None => MetricValue::Unsigned(raw),
        };
        MetricRecord {
            key: self.key,
            help: self.help,
            metric_type: self.metric_type,
            value,
        }
    }
}

/// Fractional bits of the kernel's fixed-point load average (`FSHIFT`).
const FSHIFT: u32 = 8;

/// Decode a fixed-point `avenrun` value into a load average.
pub fn load_average(raw: u64) -> MetricValue {
    MetricValue::Float(raw as f64 / (1u64 << FSHIFT) as f64)
}

/// Map the "no cap" sentinel to 0 (unlimited); pass real caps through.
pub fn memory_limit(raw: u64) -> MetricValue {
    if raw == u64::MAX {
        MetricValue::Unsigned(0)
    } else {
        MetricValue::Unsigned(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_average_fixed_point() {
        assert_eq!(load_average(256), MetricValue::Float(1.0));
        assert_eq!(load_average(384), MetricValue::Float(1.5));
        assert_eq!(load_average(0), MetricValue::Float(0.0));
    }

    #[test]
    fn test_memory_limit_sentinel() {
        assert_eq!(memory_limit(u64::MAX), MetricValue::Unsigned(0));
        assert_eq!(memory_limit(536870912), MetricValue::Unsigned(536870912));
    }

    #[test]
    fn test_record_applies_modifier() {
        let def = MetricDef::gauge("avenrun_1min", "load_average", "Load average")
            .with_modifier(load_average);
        let record = def.record(512);
        assert_eq!(record.key, "load_average");
        assert_eq!(record.metric_type, MetricType::Gauge);
        assert_eq!(record.value, MetricValue::Float(2.0));

        let plain = MetricDef::counter("nsec_user", "cpu_user_usage", "User CPU");
        assert_eq!(plain.record(7).value, MetricValue::Unsigned(7));
    }
}
