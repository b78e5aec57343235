//! Device tags: small out-of-band values attached to live devices.
//!
//! External subsystems use tags to hang bookkeeping off a device without
//! the core knowing its shape. Tags are dropped when their device is
//! unbound and counted by the memory statistics.

use alloc::vec::Vec;

use crate::device::DeviceId;
use crate::model::DeviceModel;
use crate::stats::MemoryStats;

/// Identifier of a tag kind, assigned by the tagging subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceTag(pub u32);

struct TagEntry {
    dev: DeviceId,
    tag: DeviceTag,
    val: u64,
}

/// Registry of `(device, tag) -> value` associations.
pub(crate) struct TagRegistry {
    entries: Vec<TagEntry>,
}

impl TagRegistry {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, dev: DeviceId, tag: DeviceTag) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.dev == dev && e.tag == tag)
    }

    pub(crate) fn set(&mut self, dev: DeviceId, tag: DeviceTag, val: u64) {
        match self.position(dev, tag) {
            Some(i) => self.entries[i].val = val,
            None => self.entries.push(TagEntry { dev, tag, val }),
        }
    }

    pub(crate) fn get(&self, dev: DeviceId, tag: DeviceTag) -> Option<u64> {
        self.position(dev, tag).map(|i| self.entries[i].val)
    }

    pub(crate) fn del(&mut self, dev: DeviceId, tag: DeviceTag) -> bool {
        match self.position(dev, tag) {
            Some(i) => {
                self.entries.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn del_all(&mut self, dev: DeviceId) {
        self.entries.retain(|e| e.dev != dev);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn collect_stats(&self, stats: &mut MemoryStats) {
        stats.tag_count = self.entries.len();
        stats.tag_size = self.entries.len() * core::mem::size_of::<TagEntry>();
    }
}

impl DeviceModel<'_> {
    /// Attaches (or overwrites) a tag value on a device.
    pub fn tag_set(&mut self, dev: DeviceId, tag: DeviceTag, val: u64) {
        self.tags.set(dev, tag, val);
    }

    /// Reads a tag value from a device.
    pub fn tag_get(&self, dev: DeviceId, tag: DeviceTag) -> Option<u64> {
        self.tags.get(dev, tag)
    }

    /// Removes a tag from a device. Returns whether it was present.
    pub fn tag_del(&mut self, dev: DeviceId, tag: DeviceTag) -> bool {
        self.tags.del(dev, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_overwrite_delete() {
        let mut tags = TagRegistry::new();
        let dev = DeviceId(3);
        let tag = DeviceTag(1);

        assert_eq!(tags.get(dev, tag), None);
        tags.set(dev, tag, 42);
        assert_eq!(tags.get(dev, tag), Some(42));
        tags.set(dev, tag, 43);
        assert_eq!(tags.get(dev, tag), Some(43));
        assert!(tags.del(dev, tag));
        assert!(!tags.del(dev, tag));
    }

    #[test]
    fn del_all_only_touches_one_device() {
        let mut tags = TagRegistry::new();
        tags.set(DeviceId(1), DeviceTag(0), 1);
        tags.set(DeviceId(1), DeviceTag(1), 2);
        tags.set(DeviceId(2), DeviceTag(0), 3);
        tags.del_all(DeviceId(1));
        assert_eq!(tags.get(DeviceId(1), DeviceTag(0)), None);
        assert_eq!(tags.get(DeviceId(2), DeviceTag(0)), Some(3));
    }
}
