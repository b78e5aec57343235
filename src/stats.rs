//! Raw statistics collection over the live device tree.
//!
//! Formatting is left to external diagnostic commands; the core only
//! counts records and the heap held by each attachment kind.

use crate::device::{Attachment, Device, DeviceId};
use crate::model::DeviceModel;
use crate::uclass::Uclass;

/// Headline counts of the live model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmStats {
    /// Devices reachable from the root, root included.
    pub devices: usize,
    /// Live uclasses.
    pub uclasses: usize,
}

/// Memory footprint of the live model, by attachment kind.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    /// Number of device records.
    pub dev_count: usize,
    /// Bytes of device records.
    pub dev_size: usize,
    /// Bytes of owned device names (including terminators).
    pub dev_name_size: usize,
    /// Per-kind attachment record counts, indexed by [`Attachment::index`].
    pub attach_count: [usize; Attachment::COUNT],
    /// Per-kind attachment byte counts, indexed by [`Attachment::index`].
    pub attach_size: [usize; Attachment::COUNT],
    /// Total attachment records across all kinds.
    pub attach_count_total: usize,
    /// Total attachment bytes across all kinds.
    pub attach_size_total: usize,
    /// Number of live uclasses.
    pub uclass_count: usize,
    /// Bytes of uclass records.
    pub uclass_size: usize,
    /// Uclasses holding a uclass-wide private block.
    pub uclass_attach_count: usize,
    /// Bytes of uclass-wide private blocks.
    pub uclass_attach_size: usize,
    /// Number of device tags.
    pub tag_count: usize,
    /// Bytes of tag entries.
    pub tag_size: usize,
    /// Grand total of record and attachment bytes.
    pub total_size: usize,
}

impl DeviceModel<'_> {
    /// Device and uclass counts for diagnostic commands.
    pub fn stats(&self) -> DmStats {
        DmStats {
            devices: self.root().map_or(0, |r| self.descendant_count(r)),
            uclasses: self.uclasses().len(),
        }
    }

    /// Devices in the subtree rooted at `id`, `id` included.
    pub fn descendant_count(&self, id: DeviceId) -> usize {
        1 + self
            .device(id)
            .children()
            .iter()
            .map(|&child| self.descendant_count(child))
            .sum::<usize>()
    }

    /// Collects the memory footprint of the whole model.
    pub fn memory_stats(&self) -> MemoryStats {
        let mut stats = MemoryStats::default();
        if let Some(root) = self.root() {
            self.collect_device_stats(&mut stats, root);
        }
        for uc in self.uclasses() {
            stats.uclass_count += 1;
            stats.uclass_size += core::mem::size_of::<Uclass>();
            let size = uc.priv_bytes().map_or(0, <[u8]>::len);
            if size > 0 {
                stats.uclass_attach_count += 1;
                stats.uclass_attach_size += size;
            }
        }
        self.tags.collect_stats(&mut stats);
        stats.total_size = stats.dev_size
            + stats.uclass_size
            + stats.attach_size_total
            + stats.uclass_attach_size
            + stats.tag_size;
        stats
    }

    fn collect_device_stats(&self, stats: &mut MemoryStats, id: DeviceId) {
        let dev = self.device(id);
        stats.dev_count += 1;
        stats.dev_size += core::mem::size_of::<Device>();
        stats.dev_name_size += dev.name().len() + 1;
        for kind in Attachment::ALL {
            let size = dev.attach_size(kind);
            if size > 0 {
                stats.attach_count[kind.index()] += 1;
                stats.attach_size[kind.index()] += size;
                stats.attach_count_total += 1;
                stats.attach_size_total += size;
            }
        }
        for &child in dev.children() {
            self.collect_device_stats(stats, child);
        }
    }
}
