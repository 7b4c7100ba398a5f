//! TopoMapError: Unified error type for mesh-topomap public APIs
//!
//! Every fallible operation in the crate reports through this enum. Errors
//! raised while an operation is bound to a backend carry the backend and the
//! element count so a failure can be diagnosed without re-running it.

use thiserror::Error;

use crate::data::array::{Location, Residency};
use crate::device::DeviceFault;

/// Unified error type for mesh-topomap operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopoMapError {
    /// Device execution was requested but the device backend is not compiled in.
    #[error("device backend requested for {nitems} items, but the `device` feature is not enabled")]
    DeviceUnavailable { nitems: usize },

    /// The device runtime reported a non-success status after a launch.
    #[error("device kernel `{kernel}` failed over {nitems} items: {fault}")]
    DeviceFault {
        kernel: &'static str,
        nitems: usize,
        fault: DeviceFault,
    },

    /// An array touched by a backend does not hold valid data there.
    #[error("{what} must be resident on {required:?} (currently {residency:?})")]
    NotResident {
        what: &'static str,
        required: Location,
        residency: Residency,
    },

    /// A sparse element id produced by the index mapping is not an element
    /// of the bound cell set.
    #[error("dense index {dense} maps to element {sparse}, but the cell set has {elements} elements")]
    SparseIndexOutOfRange {
        dense: usize,
        sparse: usize,
        elements: usize,
    },

    /// The indexer addressed a position outside the sparse-id array.
    #[error("dense index {dense} maps to position {position} of an id array of length {len}")]
    IndexerOutOfRange {
        dense: usize,
        position: usize,
        len: usize,
    },

    /// An `ArrayIndexer` with a zero divisor or modulus.
    #[error("invalid indexer: {0}")]
    InvalidIndexer(String),

    /// Two arrays that must agree in tuple count do not.
    #[error("{what}: expected {expected} tuples, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Explicit connectivity tables are malformed.
    #[error("invalid connectivity: {0}")]
    InvalidConnectivity(String),

    /// Structured dimensions are malformed.
    #[error("invalid regular structure: {0}")]
    InvalidStructure(String),

    /// A stored shape code has no `ShapeType`.
    #[error("unknown shape code {0}")]
    UnknownShapeCode(u8),
}

impl TopoMapError {
    /// True for configuration and device-runtime failures, which are never
    /// worth retrying with the same inputs.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TopoMapError::DeviceUnavailable { .. } | TopoMapError::DeviceFault { .. }
        )
    }
}
