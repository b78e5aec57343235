//! The binder: turns a descriptor or HDT node plus a driver into a bound
//! device linked into the tree and its uclass.
//!
//! Failures during the bind hooks tear the half-linked device down before
//! the error is reported, so a refused or failed bind leaves no trace.

use alloc::string::String;

use core::any::Any;

use log::{debug, warn};

use crate::device::{Device, DeviceFlags, DeviceId, zeroed_block};
use crate::driver::{DeviceDecl, Driver};
use crate::error::DmError;
use crate::hdt::{HdtNode, compatible_strings};
use crate::model::DeviceModel;

impl DeviceModel<'_> {
    /// Binds `driver` to a new device under `parent`.
    ///
    /// `parent` may be `None` only for the root. `driver_data` is the
    /// opaque match data recorded on the device; `node` attaches the HDT
    /// node the device was described by.
    ///
    /// A [`DmError::Refused`] from the driver's bind hook rolls the device
    /// back and is reported as-is; any other hook failure also rolls back
    /// and propagates.
    pub fn bind_with_driver(
        &mut self,
        parent: Option<DeviceId>,
        driver: &'static Driver,
        name: &str,
        driver_data: usize,
        node: Option<HdtNode>,
    ) -> Result<DeviceId, DmError> {
        self.bind_common(parent, driver, name, driver_data, None, node)
    }

    /// Binds a device from a static descriptor.
    ///
    /// The driver is looked up by the descriptor's name (miss is
    /// [`DmError::NoDriver`]). With `pre_reloc_only` set, a driver without
    /// the `PRE_RELOC` flag is skipped via [`DmError::Refused`].
    pub fn bind_by_descriptor(
        &mut self,
        parent: Option<DeviceId>,
        decl: &'static DeviceDecl,
        pre_reloc_only: bool,
    ) -> Result<DeviceId, DmError> {
        let Some(driver) = self.registry.driver_by_name(decl.driver) else {
            warn!("cannot find driver '{}'", decl.driver);
            return Err(DmError::NoDriver);
        };
        if pre_reloc_only && !driver.flags.contains(DeviceFlags::PRE_RELOC) {
            return Err(DmError::Refused);
        }
        self.bind_common(parent, driver, decl.driver, 0, decl.plat, None)
    }

    /// Binds a named driver to a named device; convenience for drivers
    /// that create children outside any descriptor table.
    pub fn bind_by_name(
        &mut self,
        parent: Option<DeviceId>,
        drv_name: &str,
        dev_name: &str,
        node: Option<HdtNode>,
    ) -> Result<DeviceId, DmError> {
        let Some(driver) = self.registry.driver_by_name(drv_name) else {
            warn!("cannot find driver '{drv_name}'");
            return Err(DmError::NoDriver);
        };
        self.bind_common(parent, driver, dev_name, 0, None, node)
    }

    /// Matches an HDT node against the driver table and binds the winner.
    ///
    /// Compatible strings are tried highest-priority first; within one
    /// string, drivers match in table order. With `restrict` set only that
    /// driver is considered. Returns `Ok(None)` when nothing matches, the
    /// node is gated out by `pre_reloc_only`, or every matching driver
    /// refuses; none of these is an error.
    pub fn bind_hdt_node(
        &mut self,
        parent: DeviceId,
        node: HdtNode,
        restrict: Option<&'static Driver>,
        pre_reloc_only: bool,
    ) -> Result<Option<DeviceId>, DmError> {
        let Some(hdt) = self.hdt else {
            return Ok(None);
        };
        let name = String::from(hdt.name(node));
        let compat = match hdt.property(node, "compatible") {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!("device '{name}' has no compatible string");
                return Ok(None);
            }
            Err(_) => {
                warn!("hardware tree error at node '{name}'");
                return Err(DmError::BadHdt);
            }
        };

        for entry in compatible_strings(compat) {
            let compat_str = entry.map_err(|_| {
                warn!("hardware tree error at node '{name}'");
                DmError::BadHdt
            })?;
            debug!("   - attempting to match compatible string '{compat_str}'");
            let Some((driver, data)) = self.registry.match_compatible(compat_str, restrict)
            else {
                continue;
            };
            if pre_reloc_only
                && !hdt.pre_reloc(node)
                && !driver.flags.contains(DeviceFlags::PRE_RELOC)
            {
                debug!("skipping device '{name}' pre-relocation");
                return Ok(None);
            }
            debug!("   - found match at driver '{}' for '{compat_str}'", driver.name);
            match self.bind_common(Some(parent), driver, &name, data, None, Some(node)) {
                Ok(dev) => return Ok(Some(dev)),
                Err(DmError::Refused) => {
                    debug!("driver '{}' refuses to bind", driver.name);
                    continue;
                }
                Err(e) => {
                    warn!("error binding driver '{}': {e}", driver.name);
                    return Err(e);
                }
            }
        }
        debug!("no match for node '{name}'");
        Ok(None)
    }

    fn bind_common(
        &mut self,
        parent: Option<DeviceId>,
        driver: &'static Driver,
        name: &str,
        driver_data: usize,
        plat_ref: Option<&'static (dyn Any + Sync)>,
        node: Option<HdtNode>,
    ) -> Result<DeviceId, DmError> {
        let uc_index = self.uclass_get_or_create(driver.uclass)?;
        let uc_drv = self.uclasses[uc_index].driver();

        let mut dev = Device::new(name, driver, node);
        dev.parent = parent;
        dev.driver_data = driver_data;
        if let Some(plat) = plat_ref {
            dev.plat_ref = Some(plat);
            dev.flags.insert(DeviceFlags::PLATDATA_VALID);
        } else if driver.plat_auto > 0 {
            dev.plat = Some(zeroed_block(driver.plat_auto));
            dev.flags.insert(DeviceFlags::PLATDATA_VALID);
        }
        if uc_drv.per_device_plat_auto > 0 {
            dev.uclass_plat = Some(zeroed_block(uc_drv.per_device_plat_auto));
        }
        if let Some(pid) = parent {
            let parent_drv = self.device(pid).driver();
            if parent_drv.per_child_plat_auto > 0 {
                dev.parent_plat = Some(zeroed_block(parent_drv.per_child_plat_auto));
            }
        }

        let id = self.insert_device(dev);
        if let Some(pid) = parent {
            self.device_mut(pid).children.push(id);
        }
        self.uclasses[uc_index].devices.push(id);

        if let Some(bind) = driver.ops.bind {
            if let Err(e) = bind(self.device_mut(id)) {
                if e == DmError::Refused {
                    debug!("driver '{}' refuses to bind '{name}'", driver.name);
                } else {
                    warn!("error binding driver '{}': {e}", driver.name);
                }
                self.unwind_bind(id, uc_index);
                return Err(e);
            }
        }
        if let Some(pid) = parent {
            if let Some(child_post_bind) = self.device(pid).driver().ops.child_post_bind {
                if let Err(e) = child_post_bind(self.device_mut(id)) {
                    self.unwind_bind(id, uc_index);
                    return Err(e);
                }
            }
        }
        if let Some(post_bind) = uc_drv.ops.post_bind {
            if let Err(e) = post_bind(self.device_mut(id)) {
                self.unwind_bind(id, uc_index);
                return Err(e);
            }
        }

        self.device_mut(id).flags.insert(DeviceFlags::BOUND);
        debug!("bound device '{name}' to driver '{}'", driver.name);
        Ok(id)
    }

    /// Undoes the structural linkage of a device whose bind hooks failed.
    fn unwind_bind(&mut self, id: DeviceId, uc_index: usize) {
        let parent = self.device(id).parent;
        self.uclasses[uc_index].devices.retain(|&d| d != id);
        if let Some(pid) = parent {
            self.device_mut(pid).children.retain(|&d| d != id);
        }
        self.devices[id.index()] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverOps, UclassDriver};
    use crate::registry::Platform;
    use crate::uclass::UclassId;

    const GPIO: UclassId = UclassId(4);

    fn refuse_bind(_dev: &mut Device) -> Result<(), DmError> {
        Err(DmError::Refused)
    }

    fn fail_bind(_dev: &mut Device) -> Result<(), DmError> {
        Err(DmError::DriverFailure)
    }

    static DRIVERS: [Driver; 3] = [
        Driver::new("gpio", GPIO),
        Driver {
            ops: DriverOps {
                bind: Some(refuse_bind),
                ..DriverOps::NONE
            },
            ..Driver::new("gpio_shy", GPIO)
        },
        Driver {
            ops: DriverOps {
                bind: Some(fail_bind),
                ..DriverOps::NONE
            },
            ..Driver::new("gpio_broken", GPIO)
        },
    ];
    static UCLASSES: [UclassDriver; 1] = [UclassDriver::new("gpio", GPIO)];

    fn model() -> DeviceModel<'static> {
        let mut dm = DeviceModel::new(Platform::new(&DRIVERS, &UCLASSES, &[]));
        dm.init().unwrap();
        dm
    }

    #[test]
    fn bind_links_parent_and_uclass() {
        let mut dm = model();
        let root = dm.root().unwrap();
        let dev = dm
            .bind_with_driver(Some(root), &DRIVERS[0], "gpio0", 0, None)
            .unwrap();
        assert_eq!(dm.device(dev).parent(), Some(root));
        assert_eq!(dm.device(root).children(), &[dev]);
        assert_eq!(dm.uclass_by_id(GPIO).unwrap().devices(), &[dev]);
        assert!(dm.device(dev).is_bound());
    }

    #[test]
    fn refused_bind_leaves_no_trace() {
        let mut dm = model();
        let root = dm.root().unwrap();
        let gpio0 = dm
            .bind_with_driver(Some(root), &DRIVERS[0], "gpio0", 0, None)
            .unwrap();
        let before = dm.memory_stats();
        let err = dm
            .bind_with_driver(Some(root), &DRIVERS[1], "shy0", 0, None)
            .unwrap_err();
        assert_eq!(err, DmError::Refused);
        assert_eq!(dm.device(root).children(), &[gpio0]);
        assert_eq!(dm.uclass_by_id(GPIO).unwrap().devices(), &[gpio0]);
        assert_eq!(dm.memory_stats().total_size, before.total_size);
    }

    #[test]
    fn failed_bind_propagates_and_rolls_back() {
        let mut dm = model();
        let root = dm.root().unwrap();
        let err = dm
            .bind_with_driver(Some(root), &DRIVERS[2], "broken0", 0, None)
            .unwrap_err();
        assert_eq!(err, DmError::DriverFailure);
        assert!(dm.device(root).children().is_empty());
    }

    #[test]
    fn bind_by_name_reports_missing_driver() {
        let mut dm = model();
        let root = dm.root().unwrap();
        assert_eq!(
            dm.bind_by_name(Some(root), "absent", "dev0", None),
            Err(DmError::NoDriver)
        );
    }
}
