//! The probe engine: drives bound devices to the active state.
//!
//! Parents are always activated before their children; the bring-up pass
//! walks the tree depth-first and probes the devices flagged for
//! activation right after bind.

use log::{debug, warn};

use crate::device::{DeviceFlags, DeviceId, zeroed_block};
use crate::error::DmError;
use crate::model::DeviceModel;

impl DeviceModel<'_> {
    /// Activates a bound device, probing its parents first.
    ///
    /// Idempotent: probing an active device is a no-op. Allocates the
    /// private data blocks declared by the driver, its uclass, and the
    /// parent driver, then runs the pre-probe and probe hooks. A failure
    /// frees the blocks and leaves the device bound but not activated.
    pub fn probe(&mut self, id: DeviceId) -> Result<(), DmError> {
        {
            let dev = self.device(id);
            if dev.is_active() {
                return Ok(());
            }
            if !dev.is_bound() {
                return Err(DmError::InvalidState);
            }
        }
        if let Some(parent) = self.device(id).parent() {
            self.probe(parent)?;
            // The parent's probe may have activated this device already.
            if self.device(id).is_active() {
                return Ok(());
            }
        }

        let driver = self.device(id).driver();
        let uc_drv = self.uclass_driver_of(driver.uclass);
        let parent_drv = self.device(id).parent().map(|p| self.device(p).driver());

        {
            let dev = self.device_mut(id);
            if driver.priv_auto > 0 {
                dev.priv_data = Some(zeroed_block(driver.priv_auto));
            }
            if uc_drv.per_device_auto > 0 {
                dev.uclass_priv = Some(zeroed_block(uc_drv.per_device_auto));
            }
            if let Some(parent_drv) = parent_drv {
                if parent_drv.per_child_auto > 0 {
                    dev.parent_priv = Some(zeroed_block(parent_drv.per_child_auto));
                }
            }
        }

        let result = (|| -> Result<(), DmError> {
            if let Some(pre_probe) = uc_drv.ops.pre_probe {
                pre_probe(self.device_mut(id))?;
            }
            if let Some(parent_drv) = parent_drv {
                if let Some(child_pre_probe) = parent_drv.ops.child_pre_probe {
                    child_pre_probe(self.device_mut(id))?;
                }
            }
            if let Some(probe) = driver.ops.probe {
                probe(self.device_mut(id))?;
            }
            Ok(())
        })();
        if let Err(e) = result {
            warn!("probe of '{}' failed: {e}", self.device(id).name());
            self.free_probe_data(id);
            return Err(e);
        }

        self.device_mut(id).flags.insert(DeviceFlags::ACTIVATED);
        if let Some(post_probe) = uc_drv.ops.post_probe {
            if let Err(e) = post_probe(self.device_mut(id)) {
                warn!("post-probe of '{}' failed: {e}", self.device(id).name());
                self.device_mut(id).flags.remove(DeviceFlags::ACTIVATED);
                self.free_probe_data(id);
                return Err(e);
            }
        }
        debug!("probed device '{}'", self.device(id).name());
        Ok(())
    }

    pub(crate) fn free_probe_data(&mut self, id: DeviceId) {
        let dev = self.device_mut(id);
        dev.priv_data = None;
        dev.uclass_priv = None;
        dev.parent_priv = None;
    }

    /// Depth-first probe pass over the whole tree.
    ///
    /// Probes devices flagged `PROBE_AFTER_BIND`; with `pre_reloc_only`
    /// set, devices whose node and driver both lack the pre-reloc mark are
    /// skipped but their children are still visited. A device's own probe
    /// error is returned after its subtree has been walked; children
    /// errors are logged without aborting siblings.
    pub fn probe_tree(&mut self, pre_reloc_only: bool) -> Result<(), DmError> {
        let root = self.root().ok_or(DmError::NotFound)?;
        self.probe_tree_node(root, pre_reloc_only)
    }

    fn probe_tree_node(&mut self, id: DeviceId, pre_reloc_only: bool) -> Result<(), DmError> {
        let mut result = Ok(());
        let gated = pre_reloc_only && {
            let dev = self.device(id);
            let node_marked = dev
                .node()
                .zip(self.hdt)
                .is_some_and(|(node, hdt)| hdt.pre_reloc(node));
            !node_marked && !dev.flags().contains(DeviceFlags::PRE_RELOC)
        };
        if !gated && self.device(id).flags().contains(DeviceFlags::PROBE_AFTER_BIND) {
            result = self.probe(id);
        }
        let children = self.device(id).children.clone();
        for child in children {
            if let Err(e) = self.probe_tree_node(child, pre_reloc_only) {
                warn!("probe of '{}' subtree failed: {e}", self.device(child).name());
            }
        }
        result
    }
}
