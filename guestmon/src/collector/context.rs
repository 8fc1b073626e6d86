use crate::errors::{GuestmonError, GuestmonResult};
use std::fmt;
use uuid::Uuid;

/// Identity of the guest a collection is for.
///
/// Also the cache key: two requests with equal contexts share cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectContext {
    vm_uuid: Uuid,
    instance: Option<u32>,
}

impl CollectContext {
    pub fn new(vm_uuid: Uuid, instance: Option<u32>) -> Self {
        Self { vm_uuid, instance }
    }

    /// Validate caller-supplied identifiers.
    ///
    /// # Errors
    ///
    /// `InvalidContext` if `vm_uuid` is not a UUID or `instance` is negative
    /// or out of range.
    pub fn parse(vm_uuid: &str, instance: Option<i64>) -> GuestmonResult<Self> {
        let vm_uuid = Uuid::parse_str(vm_uuid).map_err(|e| {
            GuestmonError::InvalidContext(format!("vm_uuid '{}' is not a uuid: {}", vm_uuid, e))
        })?;
        let instance = instance
            .map(|i| {
                u32::try_from(i).map_err(|_| {
                    GuestmonError::InvalidContext(format!("instance {} is out of range", i))
                })
            })
            .transpose()?;
        Ok(Self::new(vm_uuid, instance))
    }

    pub fn vm_uuid(&self) -> Uuid {
        self.vm_uuid
    }

    /// Kstat instance number, required by instance-scoped families.
    pub fn require_instance(&self) -> GuestmonResult<u32> {
        self.instance.ok_or_else(|| {
            GuestmonError::InvalidContext(format!("vm {} has no kstat instance", self.vm_uuid))
        })
    }

    /// Zone name used to label kstats of this guest.
    pub fn zonename(&self) -> String {
        self.vm_uuid.hyphenated().to_string()
    }
}

impl fmt::Display for CollectContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(i) => write!(f, "{}#{}", self.vm_uuid, i),
            None => write!(f, "{}", self.vm_uuid),
        }
    }
}
