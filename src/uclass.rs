//! Uclass registry: runtime grouping of bound devices by capability.
//!
//! A uclass is created at most once per id, lazily, when the first member
//! of that id is bound. Members are kept in bind order.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::device::{DeviceId, zeroed_block};
use crate::driver::UclassDriver;
use crate::error::DmError;
use crate::model::DeviceModel;

/// Identifier of a driver class (a family of drivers exposing a common
/// capability). The platform assigns ids; [`UclassId::ROOT`] is reserved
/// for the virtual root device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UclassId(pub u16);

impl UclassId {
    /// Uclass of the virtual root device.
    pub const ROOT: UclassId = UclassId(0);
}

/// A live uclass: the ordered set of bound devices sharing one capability.
pub struct Uclass {
    pub(crate) driver: &'static UclassDriver,
    pub(crate) devices: Vec<DeviceId>,
    pub(crate) priv_data: Option<Box<[u8]>>,
}

impl Uclass {
    pub(crate) fn new(driver: &'static UclassDriver) -> Self {
        Self {
            driver,
            devices: Vec::new(),
            priv_data: (driver.priv_auto > 0).then(|| zeroed_block(driver.priv_auto)),
        }
    }

    /// The uclass id.
    pub fn id(&self) -> UclassId {
        self.driver.id
    }

    /// The static uclass driver backing this uclass.
    pub fn driver(&self) -> &'static UclassDriver {
        self.driver
    }

    /// Member devices, in bind order.
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Uclass-wide private data block, when the uclass driver declares one.
    pub fn priv_bytes(&self) -> Option<&[u8]> {
        self.priv_data.as_deref()
    }

    /// Mutable view of the uclass-wide private data block.
    pub fn priv_bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.priv_data.as_deref_mut()
    }
}

impl DeviceModel<'_> {
    /// All live uclasses, in creation order.
    pub fn uclasses(&self) -> &[Uclass] {
        &self.uclasses
    }

    /// Looks up a live uclass by id.
    pub fn uclass_by_id(&self, id: UclassId) -> Option<&Uclass> {
        self.uclasses.iter().find(|uc| uc.id() == id)
    }

    /// Returns the index of the uclass for `id`, creating it on first use.
    ///
    /// Creation locates the static uclass driver (miss is `NotFound`),
    /// allocates the uclass, and runs its `init` hook before insertion.
    pub(crate) fn uclass_get_or_create(&mut self, id: UclassId) -> Result<usize, DmError> {
        if let Some(index) = self.uclasses.iter().position(|uc| uc.id() == id) {
            return Ok(index);
        }
        let Some(driver) = self.registry.uclass_driver(id) else {
            log::warn!("no uclass driver for id {}", id.0);
            return Err(DmError::NotFound);
        };
        let mut uclass = Uclass::new(driver);
        if let Some(init) = driver.ops.init {
            init(&mut uclass)?;
        }
        log::debug!("created uclass '{}'", driver.name);
        self.uclasses.push(uclass);
        Ok(self.uclasses.len() - 1)
    }

    /// Static uclass driver of a uclass known to be live.
    pub(crate) fn uclass_driver_of(&self, id: UclassId) -> &'static UclassDriver {
        self.uclass_by_id(id)
            .map(|uc| uc.driver)
            .expect("bound device references a uclass that is not live")
    }
}
