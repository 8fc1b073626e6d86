//! Normalization of raw kstat records into metric records.
//!
//! ```text
//! records ──select (scope)──→ guest records ──table lookup──→ MetricSet
//!                                  │                 │
//!                             NotFound          MissingField / MalformedOutput
//! ```
//!
//! Normalization is all-or-nothing: any missing or malformed field fails the
//! whole call and nothing is emitted.

use crate::errors::{GuestmonError, GuestmonResult};
use crate::kstat::{KstatRecord, KstatSelector};
use crate::metrics::{MetricDef, MetricSet};

/// How the records returned for a selector map onto one guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope<'a> {
    /// The selector names exactly one record (class, module, instance).
    /// If that record is labelled with a `zonename`, it must be this one.
    Instance(&'a str),
    /// The source reports every guest at once; keep records whose
    /// `zonename` equals this value and sum them.
    Guest(&'a str),
}

/// Apply `table` to `records`, producing one record per table entry.
pub fn normalize(
    selector: &KstatSelector,
    table: &[MetricDef],
    records: &[KstatRecord],
    scope: RecordScope<'_>,
) -> GuestmonResult<MetricSet> {
    let selected = select_records(selector, records, scope)?;

    let mut metrics = MetricSet::new();
    for def in table {
        let mut total: u64 = 0;
        for record in &selected {
            let raw = record
                .field(def.source_key)
                .ok_or_else(|| GuestmonError::MissingField {
                    origin: selector.to_string(),
                    field: def.source_key.to_string(),
                })?;
            let value = raw.as_u64().ok_or_else(|| {
                GuestmonError::MalformedOutput(format!(
                    "{} field '{}' is not an unsigned integer: {:?}",
                    selector, def.source_key, raw
                ))
            })?;
            total = total.saturating_add(value);
        }
        metrics.insert(def.record(total));
    }

    Ok(metrics)
}

fn select_records<'r>(
    selector: &KstatSelector,
    records: &'r [KstatRecord],
    scope: RecordScope<'_>,
) -> GuestmonResult<Vec<&'r KstatRecord>> {
    match scope {
        RecordScope::Instance(zonename) => match records {
            [] => Err(GuestmonError::NotFound(format!("no kstat for {}", selector))),
            [record] => match record.zonename() {
                Some(owner) if owner != zonename => Err(GuestmonError::InvalidContext(format!(
                    "{} belongs to zone {}, not {}",
                    selector, owner, zonename
                ))),
                _ => Ok(vec![record]),
            },
            many => Err(GuestmonError::MalformedOutput(format!(
                "expected a single kstat for {}, got {}",
                selector,
                many.len()
            ))),
        },
        RecordScope::Guest(zonename) => {
            let selected: Vec<&KstatRecord> = records
                .iter()
                .filter(|r| r.zonename() == Some(zonename))
                .collect();
            if selected.is_empty() {
                return Err(GuestmonError::NotFound(format!(
                    "no {} kstats for zone {}",
                    selector, zonename
                )));
            }
            Ok(selected)
        }
    }
}
