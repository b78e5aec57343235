//! The device model: arena of device records plus root lifecycle.
//!
//! Bring-up is strictly single-threaded and synchronous; every operation
//! runs to completion on the caller's stack, which makes bind and probe
//! ordering deterministic.

use alloc::vec::Vec;

use log::{debug, warn};

use crate::device::{Device, DeviceId, RemoveFlags};
use crate::driver::{DeviceDecl, Driver, UclassDriver};
use crate::error::DmError;
use crate::hdt::Hdt;
use crate::registry::{EventNotifyHook, Platform, Registry, ScanOtherHook};
use crate::tags::TagRegistry;
use crate::uclass::{Uclass, UclassId};

/// Built-in driver anchoring the device hierarchy; all other devices are
/// its descendants.
pub(crate) static ROOT_DRIVER: Driver = Driver::new("root_driver", UclassId::ROOT);

/// Built-in uclass driver for [`UclassId::ROOT`].
pub(crate) static ROOT_UCLASS_DRIVER: UclassDriver = UclassDriver::new("root", UclassId::ROOT);

/// Built-in descriptor the root device is bound from.
static ROOT_DECL: DeviceDecl = DeviceDecl::new("root_driver");

/// Event tags reported to the platform notifier after `init_and_scan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmEvent {
    /// Bring-up completed before the bootloader relocated itself.
    PostInitPreReloc,
    /// Bring-up completed after relocation.
    PostInitPostReloc,
}

/// The runtime device model.
///
/// Owns every device record and uclass; all structural mutation goes
/// through its binder, probe-engine, and teardown methods.
pub struct DeviceModel<'hdt> {
    pub(crate) registry: Registry,
    pub(crate) hdt: Option<&'hdt dyn Hdt>,
    scan_other: Option<ScanOtherHook>,
    event_notify: Option<EventNotifyHook>,
    pub(crate) devices: Vec<Option<Device>>,
    pub(crate) uclasses: Vec<Uclass>,
    pub(crate) root: Option<DeviceId>,
    pub(crate) slots: Vec<Option<DeviceId>>,
    pub(crate) tags: TagRegistry,
    relocated: bool,
}

impl<'hdt> DeviceModel<'hdt> {
    /// Creates an empty model over the platform's declaration tables.
    pub fn new(platform: Platform) -> Self {
        Self {
            registry: Registry::new(platform),
            hdt: None,
            scan_other: platform.scan_other,
            event_notify: platform.event_notify,
            devices: Vec::new(),
            uclasses: Vec::new(),
            root: None,
            slots: Vec::new(),
            tags: TagRegistry::new(),
            relocated: false,
        }
    }

    /// Connects the hardware description tree.
    pub fn with_hdt(mut self, hdt: &'hdt dyn Hdt) -> Self {
        self.hdt = Some(hdt);
        self
    }

    /// The connected hardware description tree, if any.
    pub fn hdt(&self) -> Option<&'hdt dyn Hdt> {
        self.hdt
    }

    /// Records that the bootloader has relocated itself. Affects the
    /// pre-reloc gating of later subtree scans and the post-init event tag.
    pub fn mark_relocated(&mut self) {
        self.relocated = true;
    }

    /// Whether the bootloader has relocated itself.
    pub fn relocated(&self) -> bool {
        self.relocated
    }

    /// The virtual root device, present between `init` and `uninit`.
    pub fn root(&self) -> Option<DeviceId> {
        self.root
    }

    /// Borrows a device record.
    ///
    /// # Panics
    ///
    /// Panics if `id` refers to a device that has been unbound.
    pub fn device(&self, id: DeviceId) -> &Device {
        self.devices[id.index()]
            .as_ref()
            .expect("stale device id")
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> &mut Device {
        self.devices[id.index()]
            .as_mut()
            .expect("stale device id")
    }

    /// Finds a bound device by name.
    pub fn device_by_name(&self, name: &str) -> Option<DeviceId> {
        self.devices
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|dev| dev.name() == name))
            .map(DeviceId)
    }

    /// The device bound for static descriptor `index`, once the static
    /// scan has filled that slot.
    pub fn descriptor_device(&self, index: usize) -> Option<DeviceId> {
        self.slots.get(index).copied().flatten()
    }

    pub(crate) fn insert_device(&mut self, dev: Device) -> DeviceId {
        match self.devices.iter().position(Option::is_none) {
            Some(index) => {
                self.devices[index] = Some(dev);
                DeviceId(index)
            }
            None => {
                self.devices.push(Some(dev));
                DeviceId(self.devices.len() - 1)
            }
        }
    }

    /// Creates the virtual root device.
    ///
    /// Binds the built-in root descriptor, attaches the HDT root node when
    /// a tree is connected, probes the root, and resets the tag registry.
    /// A second `init` without an intervening `uninit` is a programmer
    /// error and fails with [`DmError::AlreadyInitialized`].
    pub fn init(&mut self) -> Result<(), DmError> {
        if self.root.is_some() {
            warn!("virtual root device already exists");
            return Err(DmError::AlreadyInitialized);
        }
        debug!("binding root device");
        let root = self.bind_by_descriptor(None, &ROOT_DECL, false)?;
        self.root = Some(root);
        if let Some(node) = self.hdt.and_then(|hdt| hdt.root()) {
            self.device_mut(root).node = Some(node);
        }
        self.probe(root)?;
        self.tags.clear();
        Ok(())
    }

    /// Tears the whole tree down. A no-op when no root exists.
    ///
    /// Removes non-vital devices first, then all remaining devices, both
    /// post-order; unbinds every record post-order; destroys the uclasses.
    pub fn uninit(&mut self) -> Result<(), DmError> {
        let Some(root) = self.root else {
            return Ok(());
        };
        self.remove_device(root, RemoveFlags::NON_VITAL)?;
        self.remove_device(root, RemoveFlags::NORMAL)?;
        self.unbind_device(root)?;
        for uc in self.uclasses.iter_mut().rev() {
            if let Some(destroy) = uc.driver().ops.destroy {
                destroy(uc);
            }
        }
        self.uclasses.clear();
        self.tags.clear();
        self.slots.clear();
        self.root = None;
        Ok(())
    }

    /// Full bring-up: init, scan every source, probe, then notify.
    ///
    /// With `pre_reloc_only` set, only descriptors/nodes eligible before
    /// relocation are bound.
    pub fn init_and_scan(&mut self, pre_reloc_only: bool) -> Result<(), DmError> {
        self.init().inspect_err(|e| warn!("dm init failed: {e}"))?;
        self.scan(pre_reloc_only)
            .inspect_err(|e| warn!("dm scan failed: {e}"))?;
        if let Some(notify) = self.event_notify {
            let event = if self.relocated {
                DmEvent::PostInitPostReloc
            } else {
                DmEvent::PostInitPreReloc
            };
            notify(event)?;
        }
        Ok(())
    }

    /// Binds devices from every source, then runs the probe pass.
    fn scan(&mut self, pre_reloc_only: bool) -> Result<(), DmError> {
        debug!("scanning static device descriptors");
        match self.scan_static(pre_reloc_only) {
            Err(DmError::NoDriver) => warn!("some drivers were not found"),
            other => other?,
        }
        if self.hdt.is_some() {
            debug!("scanning hardware description tree");
            self.extended_scan(pre_reloc_only)?;
        }
        if let Some(scan_other) = self.scan_other {
            debug!("scanning other devices");
            scan_other(self, pre_reloc_only)?;
        }
        debug!("probing devices");
        self.probe_tree(pre_reloc_only)
    }
}
