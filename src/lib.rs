//! Driver-model core for embedded bootloader bring-up.
//!
//! The model constructs and maintains a runtime device tree: a parent/child
//! hierarchy of device instances, each bound to a [`Driver`], grouped into a
//! [`Uclass`] by capability, and activated in a controlled, staged fashion.
//! Devices come from two sources: a static descriptor table bound by a
//! multi-pass scan, and a hardware description tree walked through the
//! [`Hdt`] cursor trait with compatible-string matching.
//!
//! Bring-up is synchronous and single-threaded:
//!
//! ```
//! use bootdm::{DeviceModel, Platform};
//!
//! let mut dm = DeviceModel::new(Platform::new(&[], &[], &[]));
//! dm.init_and_scan(false).unwrap();
//! assert_eq!(dm.stats().devices, 1); // the virtual root
//! dm.uninit().unwrap();
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod device;
pub mod driver;
pub mod error;
pub mod hdt;
pub mod model;
pub mod registry;
pub mod stats;
pub mod tags;
pub mod uclass;

mod bind;
mod probe;
mod remove;
mod scan;

pub use device::{Attachment, Device, DeviceFlags, DeviceId, RemoveFlags};
pub use driver::{DeviceDecl, DeviceHook, Driver, DriverOps, OfMatch, UclassDriver, UclassOps};
pub use error::DmError;
pub use hdt::{CompatibleStrings, Hdt, HdtNode, MalformedProperty, compatible_strings};
pub use model::{DeviceModel, DmEvent};
pub use registry::{EventNotifyHook, Platform, ScanOtherHook};
pub use stats::{DmStats, MemoryStats};
pub use tags::DeviceTag;
pub use uclass::{Uclass, UclassId};
