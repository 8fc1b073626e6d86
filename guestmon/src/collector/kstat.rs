//! Generic kstat-backed collector, driven by a static family descriptor.

use super::{CacheTtl, CollectContext, MetricCollector};
use crate::errors::GuestmonResult;
use crate::kstat::{KstatReader, KstatSelector};
use crate::metrics::{MetricDef, MetricSet};
use crate::normalize::{RecordScope, normalize};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Default TTL of kstat-backed families.
pub const KSTAT_DEFAULT_TTL: CacheTtl = CacheTtl::For(Duration::from_secs(10));

/// How a family's kstats are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyScope {
    /// One kstat per guest, selected by the guest's instance number.
    Instance,
    /// One read returns kstats for every guest; filter by `zonename`.
    Guest,
}

/// Static description of one kstat family.
#[derive(Debug)]
pub struct KstatFamily {
    pub name: &'static str,
    pub class: &'static str,
    pub module: &'static str,
    pub scope: FamilyScope,
    pub metrics: &'static [MetricDef],
}

impl KstatFamily {
    /// Keys this family emits on success.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> {
        self.metrics.iter().map(|m| m.key)
    }
}

/// Collects one kstat family for any guest.
pub struct KstatCollector {
    family: &'static KstatFamily,
    reader: Arc<dyn KstatReader>,
    ttl: CacheTtl,
}

impl KstatCollector {
    pub fn new(family: &'static KstatFamily, reader: Arc<dyn KstatReader>) -> Self {
        Self::with_ttl(family, reader, KSTAT_DEFAULT_TTL)
    }

    pub fn with_ttl(family: &'static KstatFamily, reader: Arc<dyn KstatReader>, ttl: CacheTtl) -> Self {
        Self { family, reader, ttl }
    }
}

#[async_trait]
impl MetricCollector for KstatCollector {
    async fn get_metrics(&self, ctx: &CollectContext) -> GuestmonResult<MetricSet> {
        let family = self.family;
        let selector = match family.scope {
            FamilyScope::Instance => {
                KstatSelector::new(family.class, family.module).with_instance(ctx.require_instance()?)
            }
            FamilyScope::Guest => KstatSelector::new(family.class, family.module),
        };

        let records = self.reader.read(&selector).await?;

        let zonename = ctx.zonename();
        let scope = match family.scope {
            FamilyScope::Instance => RecordScope::Instance(&zonename),
            FamilyScope::Guest => RecordScope::Guest(&zonename),
        };
        normalize(&selector, family.metrics, &records, scope)
    }

    fn cache_ttl(&self) -> CacheTtl {
        self.ttl
    }
}
