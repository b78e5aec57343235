//! The scanner: multi-pass static descriptor binding plus HDT walks.
//!
//! Descriptor tables are not topologically sorted by their generators, so
//! the static scan iterates to a fixed point: each pass binds every
//! descriptor whose parent is already bound and retries while progress is
//! still possible.

use alloc::vec;

use log::{debug, warn};

use crate::device::DeviceId;
use crate::error::DmError;
use crate::hdt::HdtNode;
use crate::model::DeviceModel;

/// Pass cap for the static scan; one pass per supported level of parent
/// nesting in the hardware tree.
const MAX_BIND_PASSES: usize = 10;

/// Keeps the first error of a pass, upgrading a pending `NoDriver` to the
/// first non-`NoDriver` error.
fn record_scan_error(result: &mut Option<DmError>, err: DmError) {
    match result {
        None => *result = Some(err),
        Some(DmError::NoDriver) if err != DmError::NoDriver => *result = Some(err),
        _ => {}
    }
}

impl DeviceModel<'_> {
    /// Binds the static descriptor table, resolving parent dependencies
    /// across up to [`MAX_BIND_PASSES`] passes.
    ///
    /// Returns the first meaningful error of the scan (a non-`NoDriver`
    /// error wins over `NoDriver`); descriptors still pending after the
    /// pass cap mean a parent cycle and fail with
    /// [`DmError::DependencyCycle`].
    pub fn scan_static(&mut self, pre_reloc_only: bool) -> Result<(), DmError> {
        let root = self.root.ok_or(DmError::NotFound)?;
        self.slots = vec![None; self.registry.device_decls().len()];

        let mut result: Option<DmError> = None;
        for _ in 0..MAX_BIND_PASSES {
            let (err, missing_parent) = self.bind_decls_pass(root, pre_reloc_only);
            if let Some(e) = err {
                record_scan_error(&mut result, e);
            }
            if !missing_parent {
                return match result {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
            }
        }
        warn!("static descriptors have unresolvable parent dependencies");
        Err(DmError::DependencyCycle)
    }

    /// One pass over the descriptor table.
    ///
    /// Skips slots already bound; descriptors whose parent slot is still
    /// empty set the `missing_parent` retry signal. Refusals are ignored,
    /// other bind errors are recorded and the pass continues.
    fn bind_decls_pass(
        &mut self,
        root: DeviceId,
        pre_reloc_only: bool,
    ) -> (Option<DmError>, bool) {
        let decls = self.registry.device_decls();
        let mut result: Option<DmError> = None;
        let mut missing_parent = false;

        for (index, decl) in decls.iter().enumerate() {
            if self.slots[index].is_some() {
                continue;
            }
            let parent = match decl.parent {
                None => root,
                Some(p) if p >= decls.len() => {
                    warn!("descriptor '{}' has parent index {p} out of range", decl.driver);
                    record_scan_error(&mut result, DmError::BadDescriptor);
                    continue;
                }
                Some(p) => match self.slots[p] {
                    Some(parent) => parent,
                    None => {
                        missing_parent = true;
                        continue;
                    }
                },
            };
            debug!("binding '{}' from descriptor", decl.driver);
            match self.bind_by_descriptor(Some(parent), decl, pre_reloc_only) {
                Ok(dev) => self.slots[index] = Some(dev),
                Err(DmError::Refused) => {}
                Err(e) => {
                    warn!("no match for driver '{}'", decl.driver);
                    record_scan_error(&mut result, e);
                }
            }
        }
        (result, missing_parent)
    }

    /// Binds one device per enabled subnode of the HDT root.
    pub fn scan_hdt(&mut self, pre_reloc_only: bool) -> Result<(), DmError> {
        let Some(node) = self.hdt.and_then(|hdt| hdt.root()) else {
            return Ok(());
        };
        let root = self.root.ok_or(DmError::NotFound)?;
        self.scan_hdt_node(root, node, pre_reloc_only)
    }

    /// Binds one device per enabled subnode of the device's own HDT node.
    ///
    /// For drivers that declare a dynamic child domain; pre-reloc gating
    /// follows the model's relocation state.
    pub fn scan_subtree_of(&mut self, dev: DeviceId) -> Result<(), DmError> {
        let Some(node) = self.device(dev).node() else {
            return Ok(());
        };
        let pre_reloc_only = !self.relocated();
        self.scan_hdt_node(dev, node, pre_reloc_only)
    }

    /// Scans the HDT root level, then the well-known auxiliary paths that
    /// contain devices without being devices themselves.
    ///
    /// The first error wins, but every root is still attempted.
    pub fn extended_scan(&mut self, pre_reloc_only: bool) -> Result<(), DmError> {
        const EXTRA_ROOTS: [&str; 3] = ["/chosen", "/clocks", "/firmware"];

        debug!("scanning hardware tree root");
        let mut result = self.scan_hdt(pre_reloc_only);
        if let Err(e) = result {
            warn!("hardware tree scan failed: {e}");
        }
        let Some(hdt) = self.hdt else {
            return result;
        };
        let root = self.root.ok_or(DmError::NotFound)?;
        for path in EXTRA_ROOTS {
            let Some(node) = hdt.lookup_path(path) else {
                continue;
            };
            if let Err(e) = self.scan_hdt_node(root, node, pre_reloc_only) {
                warn!("scan of '{path}' failed: {e}");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Walks the direct subnodes of `parent_node`, binding a device per
    /// enabled node under `parent`. Remembers the first error but keeps
    /// walking siblings.
    fn scan_hdt_node(
        &mut self,
        parent: DeviceId,
        parent_node: HdtNode,
        pre_reloc_only: bool,
    ) -> Result<(), DmError> {
        let Some(hdt) = self.hdt else {
            return Ok(());
        };
        let mut result = Ok(());
        let mut cursor = hdt.first_subnode(parent_node);
        while let Some(node) = cursor {
            cursor = hdt.next_subnode(node);
            if !hdt.is_enabled(node) {
                debug!("   - ignoring disabled device '{}'", hdt.name(node));
                continue;
            }
            if let Err(e) = self.bind_hdt_node(parent, node, None, pre_reloc_only) {
                if result.is_ok() {
                    warn!("binding node '{}' failed: {e}", hdt.name(node));
                    result = Err(e);
                }
            }
        }
        if result.is_err() {
            warn!("some drivers failed to bind");
        }
        result
    }
}
