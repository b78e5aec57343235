//! Static driver, uclass-driver, and device-descriptor tables.
//!
//! Platforms declare these as `static` tables and hand them to the model
//! through [`Platform`](crate::registry::Platform). The tables are
//! immutable; declaration order is table order and is observable (name
//! lookups and compatible matching take the first hit).

use core::any::Any;

use crate::device::{Device, DeviceFlags, RemoveFlags};
use crate::error::DmError;
use crate::uclass::{Uclass, UclassId};

/// A lifecycle hook invoked with the affected device.
///
/// An absent hook is a no-op success.
pub type DeviceHook = fn(&mut Device) -> Result<(), DmError>;

/// A compatible-string match entry.
///
/// `data` is opaque driver-defined match data, recorded on the device when
/// this entry selects the driver for an HDT node.
#[derive(Debug, Clone, Copy)]
pub struct OfMatch {
    /// Compatible string this driver accepts (e.g. `"acme,uart-v2"`).
    pub compatible: &'static str,
    /// Opaque per-match data handed to the bound device.
    pub data: usize,
}

/// Driver hook table.
///
/// `child_pre_probe` and `child_post_bind` are structural hooks invoked on
/// the *parent's* driver with the child device.
#[derive(Clone, Copy)]
pub struct DriverOps {
    /// Called once after structural linkage; may return
    /// [`DmError::Refused`] to back out benignly.
    pub bind: Option<DeviceHook>,
    /// Called during activation; private data is valid after it returns.
    pub probe: Option<DeviceHook>,
    /// Called during teardown; the flags identify the sweep.
    pub remove: Option<fn(&mut Device, RemoveFlags) -> Result<(), DmError>>,
    /// Last call before the device record is destroyed.
    pub unbind: Option<DeviceHook>,
    /// Invoked on the parent's driver before a child probes.
    pub child_pre_probe: Option<DeviceHook>,
    /// Invoked on the parent's driver after a child binds.
    pub child_post_bind: Option<DeviceHook>,
}

impl DriverOps {
    /// A hook table with every hook absent.
    pub const NONE: DriverOps = DriverOps {
        bind: None,
        probe: None,
        remove: None,
        unbind: None,
        child_pre_probe: None,
        child_post_bind: None,
    };
}

/// Static metadata and behavior of a driver.
pub struct Driver {
    /// Driver name, also the key for descriptor lookups.
    pub name: &'static str,
    /// The uclass its devices belong to.
    pub uclass: UclassId,
    /// Compatible strings this driver matches, if it binds HDT nodes.
    pub of_match: Option<&'static [OfMatch]>,
    /// Seed flags copied onto each bound device (`PRE_RELOC`, `VITAL`,
    /// `PROBE_AFTER_BIND`).
    pub flags: DeviceFlags,
    /// Lifecycle hooks.
    pub ops: DriverOps,
    /// Bytes of platform data to allocate per device at bind.
    pub plat_auto: usize,
    /// Bytes of private data to allocate per device at probe.
    pub priv_auto: usize,
    /// Bytes of parent-owned private data to allocate per child at probe.
    pub per_child_auto: usize,
    /// Bytes of parent-owned platform data to allocate per child at bind.
    pub per_child_plat_auto: usize,
}

impl Driver {
    /// A driver with the given identity and everything else defaulted.
    ///
    /// Statics fill in the rest with struct-update syntax:
    /// `Driver { of_match: Some(&IDS), ..Driver::new("uart", SERIAL) }`.
    pub const fn new(name: &'static str, uclass: UclassId) -> Self {
        Self {
            name,
            uclass,
            of_match: None,
            flags: DeviceFlags::empty(),
            ops: DriverOps::NONE,
            plat_auto: 0,
            priv_auto: 0,
            per_child_auto: 0,
            per_child_plat_auto: 0,
        }
    }
}

/// Uclass-driver hook table.
#[derive(Clone, Copy)]
pub struct UclassOps {
    /// Runs once when the uclass is created.
    pub init: Option<fn(&mut Uclass) -> Result<(), DmError>>,
    /// Runs when the uclass is destroyed at teardown.
    pub destroy: Option<fn(&mut Uclass)>,
    /// Runs on each member after it binds.
    pub post_bind: Option<DeviceHook>,
    /// Runs on each member before it is unbound.
    pub pre_unbind: Option<DeviceHook>,
    /// Runs on each member before its driver probes.
    pub pre_probe: Option<DeviceHook>,
    /// Runs on each member after a successful probe.
    pub post_probe: Option<DeviceHook>,
    /// Runs on each member before its driver's remove hook.
    pub pre_remove: Option<DeviceHook>,
}

impl UclassOps {
    /// A hook table with every hook absent.
    pub const NONE: UclassOps = UclassOps {
        init: None,
        destroy: None,
        post_bind: None,
        pre_unbind: None,
        pre_probe: None,
        post_probe: None,
        pre_remove: None,
    };
}

/// Static metadata and behavior of a uclass.
pub struct UclassDriver {
    /// Uclass name (for logging).
    pub name: &'static str,
    /// The id this uclass driver serves.
    pub id: UclassId,
    /// Per-class hooks.
    pub ops: UclassOps,
    /// Bytes of uclass-wide private data allocated at creation.
    pub priv_auto: usize,
    /// Bytes of per-member private data allocated at probe.
    pub per_device_auto: usize,
    /// Bytes of per-member platform data allocated at bind.
    pub per_device_plat_auto: usize,
}

impl UclassDriver {
    /// A uclass driver with the given identity and everything else defaulted.
    pub const fn new(name: &'static str, id: UclassId) -> Self {
        Self {
            name,
            id,
            ops: UclassOps::NONE,
            priv_auto: 0,
            per_device_auto: 0,
            per_device_plat_auto: 0,
        }
    }
}

/// A static device descriptor: a device to bind before any HDT scan.
///
/// `parent` indexes the descriptor table itself, letting generators emit
/// parent/child order without dynamic discovery; `None` binds under the
/// scan root.
pub struct DeviceDecl {
    /// Name of the driver to bind, looked up in the driver table.
    pub driver: &'static str,
    /// Platform data attached to the bound device.
    pub plat: Option<&'static (dyn Any + Sync)>,
    /// Index of the parent descriptor in the same table.
    pub parent: Option<usize>,
}

impl DeviceDecl {
    /// A descriptor for `driver` with no platform data under the scan root.
    pub const fn new(driver: &'static str) -> Self {
        Self {
            driver,
            plat: None,
            parent: None,
        }
    }
}
