//! Device records: one instance per bound piece of hardware.
//!
//! Records live in the model's arena and are addressed by [`DeviceId`].
//! They expose accessors only; structural mutation (linking, flag
//! transitions, data-block allocation) goes through the binder, the probe
//! engine, and the teardown path.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use bitflags::bitflags;
use core::any::Any;

use crate::driver::Driver;
use crate::hdt::HdtNode;
use crate::uclass::UclassId;

/// Handle to a device record in the model's arena.
///
/// Ids stay valid until the device is unbound; parents outlive children by
/// construction, so stored parent ids never dangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub(crate) usize);

impl DeviceId {
    /// Arena index of the record.
    pub fn index(self) -> usize {
        self.0
    }
}

bitflags! {
    /// Device lifecycle flags.
    ///
    /// Transitions are monotonic within a phase: bind adds `BOUND`, probe
    /// adds `ACTIVATED`, remove clears `ACTIVATED`, unbind clears `BOUND`.
    /// The seed flags are copied from the driver at bind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceFlags: u32 {
        /// Usable before the bootloader relocates itself.
        const PRE_RELOC = 1 << 0;
        /// Other devices depend on this one; skipped by non-vital sweeps.
        const VITAL = 1 << 1;
        /// Probe this device right after the bind phase completes.
        const PROBE_AFTER_BIND = 1 << 2;
        /// The device is bound to a driver and linked into the tree.
        const BOUND = 1 << 8;
        /// Platform data is attached and valid.
        const PLATDATA_VALID = 1 << 9;
        /// The device has been probed and is live.
        const ACTIVATED = 1 << 10;

        /// Flags a device inherits from its driver at bind.
        const SEED = Self::PRE_RELOC.bits() | Self::VITAL.bits() | Self::PROBE_AFTER_BIND.bits();
    }
}

bitflags! {
    /// Selects which devices a remove sweep may deactivate.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RemoveFlags: u32 {
        /// Remove every active device.
        const NORMAL = 1 << 0;
        /// Remove only devices not marked [`DeviceFlags::VITAL`].
        const NON_VITAL = 1 << 1;
    }
}

/// The kinds of data attached to a device, as reported by memory statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Auto-allocated platform data.
    Plat,
    /// Parent-owned per-child platform data.
    ParentPlat,
    /// Uclass-owned per-member platform data.
    UclassPlat,
    /// Auto-allocated private data.
    Priv,
    /// Parent-owned per-child private data.
    ParentPriv,
    /// Uclass-owned per-member private data.
    UclassPriv,
    /// Match data recorded by compatible-string selection.
    DriverData,
}

impl Attachment {
    /// Number of attachment kinds.
    pub const COUNT: usize = 7;

    /// Every attachment kind, in statistics order.
    pub const ALL: [Attachment; Self::COUNT] = [
        Attachment::Plat,
        Attachment::ParentPlat,
        Attachment::UclassPlat,
        Attachment::Priv,
        Attachment::ParentPriv,
        Attachment::UclassPriv,
        Attachment::DriverData,
    ];

    /// Stable index of this kind into statistics arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A device instance.
pub struct Device {
    pub(crate) name: String,
    pub(crate) driver: &'static Driver,
    pub(crate) uclass: UclassId,
    pub(crate) parent: Option<DeviceId>,
    pub(crate) children: Vec<DeviceId>,
    pub(crate) node: Option<HdtNode>,
    pub(crate) driver_data: usize,
    pub(crate) flags: DeviceFlags,
    pub(crate) plat_ref: Option<&'static (dyn Any + Sync)>,
    pub(crate) plat: Option<Box<[u8]>>,
    pub(crate) parent_plat: Option<Box<[u8]>>,
    pub(crate) uclass_plat: Option<Box<[u8]>>,
    pub(crate) priv_data: Option<Box<[u8]>>,
    pub(crate) parent_priv: Option<Box<[u8]>>,
    pub(crate) uclass_priv: Option<Box<[u8]>>,
}

impl Device {
    pub(crate) fn new(name: &str, driver: &'static Driver, node: Option<HdtNode>) -> Self {
        Self {
            name: String::from(name),
            driver,
            uclass: driver.uclass,
            parent: None,
            children: Vec::new(),
            node,
            driver_data: 0,
            flags: driver.flags.intersection(DeviceFlags::SEED),
            plat_ref: None,
            plat: None,
            parent_plat: None,
            uclass_plat: None,
            priv_data: None,
            parent_priv: None,
            uclass_priv: None,
        }
    }

    /// The device name (owned copy of the descriptor or node name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound driver.
    pub fn driver(&self) -> &'static Driver {
        self.driver
    }

    /// The uclass this device is a member of.
    pub fn uclass(&self) -> UclassId {
        self.uclass
    }

    /// Parent device, `None` only for the virtual root.
    pub fn parent(&self) -> Option<DeviceId> {
        self.parent
    }

    /// Children in bind order.
    pub fn children(&self) -> &[DeviceId] {
        &self.children
    }

    /// The HDT node this device was bound from, if any.
    pub fn node(&self) -> Option<HdtNode> {
        self.node
    }

    /// Match data recorded by compatible-string selection.
    pub fn driver_data(&self) -> usize {
        self.driver_data
    }

    /// Current lifecycle flags.
    pub fn flags(&self) -> DeviceFlags {
        self.flags
    }

    /// Whether the device has been probed.
    pub fn is_active(&self) -> bool {
        self.flags.contains(DeviceFlags::ACTIVATED)
    }

    /// Whether the device is bound.
    pub fn is_bound(&self) -> bool {
        self.flags.contains(DeviceFlags::BOUND)
    }

    /// Descriptor-supplied platform data, downcast to its concrete type.
    pub fn plat<T: Any>(&self) -> Option<&T> {
        self.plat_ref.and_then(|p| {
            let any: &dyn Any = p;
            any.downcast_ref()
        })
    }

    /// Auto-allocated platform data block.
    pub fn plat_bytes(&self) -> Option<&[u8]> {
        self.plat.as_deref()
    }

    /// Mutable auto-allocated platform data block.
    pub fn plat_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.plat.as_deref_mut()
    }

    /// Private data block, valid between probe and remove.
    pub fn priv_bytes(&self) -> Option<&[u8]> {
        self.priv_data.as_deref()
    }

    /// Mutable private data block.
    pub fn priv_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.priv_data.as_deref_mut()
    }

    /// Uclass-owned per-member private data block.
    pub fn uclass_priv_bytes(&self) -> Option<&[u8]> {
        self.uclass_priv.as_deref()
    }

    /// Mutable uclass-owned per-member private data block.
    pub fn uclass_priv_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.uclass_priv.as_deref_mut()
    }

    /// Parent-owned per-child private data block.
    pub fn parent_priv_bytes(&self) -> Option<&[u8]> {
        self.parent_priv.as_deref()
    }

    /// Mutable parent-owned per-child private data block.
    pub fn parent_priv_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.parent_priv.as_deref_mut()
    }

    /// Parent-owned per-child platform data block.
    pub fn parent_plat_bytes(&self) -> Option<&[u8]> {
        self.parent_plat.as_deref()
    }

    /// Mutable parent-owned per-child platform data block.
    pub fn parent_plat_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.parent_plat.as_deref_mut()
    }

    /// Uclass-owned per-member platform data block.
    pub fn uclass_plat_bytes(&self) -> Option<&[u8]> {
        self.uclass_plat.as_deref()
    }

    /// Mutable uclass-owned per-member platform data block.
    pub fn uclass_plat_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.uclass_plat.as_deref_mut()
    }

    /// Heap bytes currently held for one attachment kind.
    pub fn attach_size(&self, kind: Attachment) -> usize {
        let block = match kind {
            Attachment::Plat => &self.plat,
            Attachment::ParentPlat => &self.parent_plat,
            Attachment::UclassPlat => &self.uclass_plat,
            Attachment::Priv => &self.priv_data,
            Attachment::ParentPriv => &self.parent_priv,
            Attachment::UclassPriv => &self.uclass_priv,
            Attachment::DriverData => {
                return if self.driver_data != 0 {
                    core::mem::size_of::<usize>()
                } else {
                    0
                };
            }
        };
        block.as_ref().map_or(0, |b| b.len())
    }
}

/// Allocates a zero-filled data block.
pub(crate) fn zeroed_block(len: usize) -> Box<[u8]> {
    alloc::vec![0u8; len].into_boxed_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uclass::UclassId;

    static DRV: Driver = Driver {
        flags: DeviceFlags::PRE_RELOC.union(DeviceFlags::BOUND),
        ..Driver::new("test", UclassId(1))
    };

    #[test]
    fn seed_flags_exclude_lifecycle_bits() {
        let dev = Device::new("dev", &DRV, None);
        assert!(dev.flags().contains(DeviceFlags::PRE_RELOC));
        assert!(!dev.is_bound());
        assert!(!dev.is_active());
    }

    #[test]
    fn attach_sizes_track_blocks() {
        let mut dev = Device::new("dev", &DRV, None);
        assert_eq!(dev.attach_size(Attachment::Priv), 0);
        dev.priv_data = Some(zeroed_block(16));
        assert_eq!(dev.attach_size(Attachment::Priv), 16);
        assert_eq!(dev.attach_size(Attachment::DriverData), 0);
        dev.driver_data = 0xdead;
        assert_eq!(
            dev.attach_size(Attachment::DriverData),
            core::mem::size_of::<usize>()
        );
    }
}
