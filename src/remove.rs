//! Teardown: remove sweeps and unbind, both post-order.
//!
//! A device is never unbound while a child remains bound, and a parent is
//! only deactivated after its whole subtree has been swept.

use log::{debug, warn};

use crate::device::{DeviceFlags, DeviceId, RemoveFlags};
use crate::error::DmError;
use crate::model::DeviceModel;

impl DeviceModel<'_> {
    /// Deactivates the subtree rooted at `id`, leaves first.
    ///
    /// The sweep flags select eligible devices: a `NON_VITAL` sweep skips
    /// devices marked [`DeviceFlags::VITAL`] (their children are still
    /// swept). Inactive devices are skipped. The first error among the
    /// children is propagated and the device itself is then left active.
    pub fn remove_device(&mut self, id: DeviceId, flags: RemoveFlags) -> Result<(), DmError> {
        let children = self.device(id).children.clone();
        let mut result = Ok(());
        for child in children {
            if let Err(e) = self.remove_device(child, flags) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result?;

        {
            let dev = self.device(id);
            if !dev.is_active() {
                return Ok(());
            }
            if flags.contains(RemoveFlags::NON_VITAL) && dev.flags().contains(DeviceFlags::VITAL)
            {
                return Ok(());
            }
        }

        let driver = self.device(id).driver();
        let uc_drv = self.uclass_driver_of(driver.uclass);
        if let Some(pre_remove) = uc_drv.ops.pre_remove {
            pre_remove(self.device_mut(id))?;
        }
        if let Some(remove) = driver.ops.remove {
            if let Err(e) = remove(self.device_mut(id), flags) {
                warn!("removal of '{}' failed: {e}", self.device(id).name());
                return Err(e);
            }
        }
        self.free_probe_data(id);
        self.device_mut(id).flags.remove(DeviceFlags::ACTIVATED);
        debug!("removed device '{}'", self.device(id).name());
        Ok(())
    }

    /// Unbinds the subtree rooted at `id`, leaves first, destroying every
    /// record.
    ///
    /// Devices must be removed first; unbinding an active device fails
    /// with [`DmError::InvalidState`].
    pub fn unbind_device(&mut self, id: DeviceId) -> Result<(), DmError> {
        {
            let dev = self.device(id);
            if dev.is_active() {
                return Err(DmError::InvalidState);
            }
            if !dev.is_bound() {
                return Err(DmError::InvalidState);
            }
        }
        let children = self.device(id).children.clone();
        for child in children {
            self.unbind_device(child)?;
        }

        let driver = self.device(id).driver();
        if let Some(unbind) = driver.ops.unbind {
            unbind(self.device_mut(id))?;
        }

        let uclass = self.device(id).uclass();
        let uc_index = self
            .uclasses
            .iter()
            .position(|uc| uc.id() == uclass)
            .expect("bound device references a uclass that is not live");
        if let Some(pre_unbind) = self.uclasses[uc_index].driver().ops.pre_unbind {
            pre_unbind(self.device_mut(id))?;
        }
        self.uclasses[uc_index].devices.retain(|&d| d != id);

        if let Some(parent) = self.device(id).parent() {
            self.device_mut(parent).children.retain(|&d| d != id);
        }
        self.tags.del_all(id);
        debug!("unbound device '{}'", self.device(id).name());
        self.devices[id.index()] = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Driver, UclassDriver};
    use crate::registry::Platform;
    use crate::uclass::UclassId;

    const CLK: UclassId = UclassId(6);

    static DRIVERS: [Driver; 2] = [
        Driver::new("clk", CLK),
        Driver {
            flags: DeviceFlags::VITAL,
            ..Driver::new("clk_vital", CLK)
        },
    ];
    static UCLASSES: [UclassDriver; 1] = [UclassDriver::new("clk", CLK)];

    fn model() -> DeviceModel<'static> {
        let mut dm = DeviceModel::new(Platform::new(&DRIVERS, &UCLASSES, &[]));
        dm.init().unwrap();
        dm
    }

    fn bind_and_probe(dm: &mut DeviceModel<'static>, driver: &'static Driver, name: &str) -> DeviceId {
        let root = dm.root().unwrap();
        let dev = dm.bind_with_driver(Some(root), driver, name, 0, None).unwrap();
        dm.probe(dev).unwrap();
        dev
    }

    #[test]
    fn non_vital_sweep_skips_vital_devices() {
        let mut dm = model();
        let plain = bind_and_probe(&mut dm, &DRIVERS[0], "clk0");
        let vital = bind_and_probe(&mut dm, &DRIVERS[1], "clk_sys");

        let root = dm.root().unwrap();
        dm.remove_device(root, RemoveFlags::NON_VITAL).unwrap();
        assert!(!dm.device(plain).is_active());
        assert!(dm.device(vital).is_active());

        dm.remove_device(root, RemoveFlags::NORMAL).unwrap();
        assert!(!dm.device(vital).is_active());
    }

    #[test]
    fn unbind_of_active_device_is_rejected() {
        let mut dm = model();
        let dev = bind_and_probe(&mut dm, &DRIVERS[0], "clk0");
        assert_eq!(dm.unbind_device(dev), Err(DmError::InvalidState));
    }

    #[test]
    fn unbind_detaches_from_parent_and_uclass() {
        let mut dm = model();
        let root = dm.root().unwrap();
        let dev = dm
            .bind_with_driver(Some(root), &DRIVERS[0], "clk0", 0, None)
            .unwrap();
        dm.unbind_device(dev).unwrap();
        assert!(dm.device(root).children().is_empty());
        assert!(dm.uclass_by_id(CLK).unwrap().devices().is_empty());
        assert!(dm.device_by_name("clk0").is_none());
    }
}
