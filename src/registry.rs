//! Read-only lookups over the platform's static declaration tables.
//!
//! The tables are small and queried only during bring-up, so every lookup
//! is a linear scan in declaration order. The core's built-in root driver
//! and root uclass driver are chained after the platform tables, so
//! platform declarations win name lookups.

use crate::driver::{DeviceDecl, Driver, UclassDriver};
use crate::error::DmError;
use crate::model::{DeviceModel, DmEvent, ROOT_DRIVER, ROOT_UCLASS_DRIVER};
use crate::uclass::UclassId;

/// Extension hook run after the static and HDT scans, before the probe
/// pass, for platforms that synthesize extra devices.
pub type ScanOtherHook = fn(&mut DeviceModel<'_>, bool) -> Result<(), DmError>;

/// Notifier invoked after `init_and_scan` completes.
pub type EventNotifyHook = fn(DmEvent) -> Result<(), DmError>;

/// The platform's build-time declaration surface.
///
/// Every table is a `&'static` slice; declaration order is table order.
#[derive(Clone, Copy)]
pub struct Platform {
    /// Driver table.
    pub drivers: &'static [Driver],
    /// Uclass driver table.
    pub uclass_drivers: &'static [UclassDriver],
    /// Static device descriptors, bound before any HDT scan.
    pub devices: &'static [DeviceDecl],
    /// Optional custom scan extension.
    pub scan_other: Option<ScanOtherHook>,
    /// Optional post-scan event notifier.
    pub event_notify: Option<EventNotifyHook>,
}

impl Platform {
    /// A platform with the given tables and no extension hooks.
    pub const fn new(
        drivers: &'static [Driver],
        uclass_drivers: &'static [UclassDriver],
        devices: &'static [DeviceDecl],
    ) -> Self {
        Self {
            drivers,
            uclass_drivers,
            devices,
            scan_other: None,
            event_notify: None,
        }
    }
}

/// Lookup view over the platform tables plus the core's built-in entries.
pub(crate) struct Registry {
    platform: Platform,
}

impl Registry {
    pub(crate) fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Drivers in declaration order, built-ins last.
    pub(crate) fn drivers(&self) -> impl Iterator<Item = &'static Driver> + use<> {
        let drivers: &'static [Driver] = self.platform.drivers;
        drivers.iter().chain(core::iter::once(&ROOT_DRIVER))
    }

    /// First driver with an exactly matching name.
    pub(crate) fn driver_by_name(&self, name: &str) -> Option<&'static Driver> {
        self.drivers().find(|drv| drv.name == name)
    }

    /// First uclass driver serving `id`.
    pub(crate) fn uclass_driver(&self, id: UclassId) -> Option<&'static UclassDriver> {
        self.platform
            .uclass_drivers
            .iter()
            .chain(core::iter::once(&ROOT_UCLASS_DRIVER))
            .find(|uc| uc.id == id)
    }

    /// The static device descriptor table, index-addressable.
    pub(crate) fn device_decls(&self) -> &'static [DeviceDecl] {
        self.platform.devices
    }

    /// Finds the first driver whose match table contains `compat`.
    ///
    /// With `restrict` set, only that driver is considered; a restricted
    /// driver without a match table can never match, so the scan stops.
    /// Returns the driver and its recorded match data.
    pub(crate) fn match_compatible(
        &self,
        compat: &str,
        restrict: Option<&'static Driver>,
    ) -> Option<(&'static Driver, usize)> {
        for drv in self.drivers() {
            if let Some(only) = restrict {
                if !core::ptr::eq(only, drv) {
                    continue;
                }
                if only.of_match.is_none() {
                    return None;
                }
            }
            if let Some(table) = drv.of_match {
                if let Some(entry) = table.iter().find(|m| m.compatible == compat) {
                    return Some((drv, entry.data));
                }
            }
        }
        None
    }
}
