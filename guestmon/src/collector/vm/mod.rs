//! Per-guest statistic families.

mod link;
mod memory_caps;
mod tcp;
mod zfs;
mod zone_misc;
mod zone_vfs;

pub use link::LINK;
pub use memory_caps::MEMORY_CAPS;
pub use tcp::TCP;
pub use zfs::{ZFS_DEFAULT_TTL, ZfsCollector};
pub use zone_misc::ZONE_MISC;
pub use zone_vfs::ZONE_VFS;

use super::KstatFamily;

/// Family name of the `zfs list` collector.
pub const ZFS_FAMILY: &str = "zfs";

/// Family name of the clock collector.
pub const TIME_FAMILY: &str = "time";

/// Every kstat-backed family, in registration order.
pub static KSTAT_FAMILIES: [&KstatFamily; 5] = [&ZONE_MISC, &MEMORY_CAPS, &ZONE_VFS, &LINK, &TCP];

/// Names of every family, in registration order.
pub fn family_names() -> impl Iterator<Item = &'static str> {
    KSTAT_FAMILIES
        .iter()
        .map(|f| f.name)
        .chain([ZFS_FAMILY, TIME_FAMILY])
}
