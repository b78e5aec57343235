//! Driver-model error types.

use core::fmt;

/// Errors that can occur during device binding, probing, and teardown.
///
/// Benign kinds (`NotFound`, `NoDriver`, `Refused`) are downgraded to
/// warnings by the scan orchestration; the rest propagate to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmError {
    /// A registry or hardware-tree lookup missed.
    NotFound,
    /// A device descriptor names a driver that is not in the driver table.
    NoDriver,
    /// A driver's bind hook declined the device; the device was rolled back.
    Refused,
    /// An allocation the core sized itself could not be satisfied.
    OutOfMemory,
    /// A hardware-description-tree property is malformed.
    BadHdt,
    /// A device descriptor is self-inconsistent (e.g. parent index out of range).
    BadDescriptor,
    /// The virtual root device already exists.
    AlreadyInitialized,
    /// Descriptor parent dependencies did not resolve within the pass limit.
    DependencyCycle,
    /// The device is not in a valid lifecycle state for this operation.
    InvalidState,
    /// A driver hook failed in a non-benign way.
    DriverFailure,
}

impl fmt::Display for DmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("not found"),
            Self::NoDriver => f.write_str("no driver for descriptor"),
            Self::Refused => f.write_str("driver refused to bind"),
            Self::OutOfMemory => f.write_str("out of memory"),
            Self::BadHdt => f.write_str("malformed hardware tree data"),
            Self::BadDescriptor => f.write_str("bad device descriptor"),
            Self::AlreadyInitialized => f.write_str("root device already exists"),
            Self::DependencyCycle => f.write_str("descriptor parent dependency cycle"),
            Self::InvalidState => f.write_str("invalid device state"),
            Self::DriverFailure => f.write_str("driver hook failed"),
        }
    }
}
