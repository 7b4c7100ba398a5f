//! Data-parallel operations over mesh elements.
//!
//! An operation is built with every array, cell set and functor it needs,
//! then consumed by [`Operation::execute`] on one backend. Arrays are never
//! moved implicitly: everything an operation reads or writes must already
//! be resident where it runs (see [`Array::ensure_resident`]).
//!
//! [`Array::ensure_resident`]: crate::data::array::Array::ensure_resident

pub mod bundle;
pub(crate) mod dispatch;
pub(crate) mod executor;
pub mod info_topology_map;
pub mod topology_map;

use serde::{Deserialize, Serialize};

use crate::data::array::Location;
use crate::topomap_error::TopoMapError;

pub use bundle::{InputBundle, OutputBundle};
pub use info_topology_map::InfoTopologyPackedMapOp;
pub use topology_map::TopologyPackedMapOp;

/// A configured unit of work that can run on the host or the device.
pub trait Operation: Sized {
    /// Run on host threads.
    fn go_host(self) -> Result<(), TopoMapError>;

    /// Run on the device. Fails with
    /// [`TopoMapError::DeviceUnavailable`] when the backend is not built.
    fn go_device(self) -> Result<(), TopoMapError>;

    /// Run on `loc`.
    fn execute(self, loc: Location) -> Result<(), TopoMapError> {
        match loc {
            Location::Host => self.go_host(),
            Location::Device => self.go_device(),
        }
    }
}

/// Knobs shared by all operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    /// Check every sparse id against the cell set before running. With this
    /// off, an out-of-range id is caller error: the run may panic, fault, or
    /// hand the functor a meaningless shape.
    pub validate_indices: bool,
    /// Smallest chunk of dense positions handed to one host worker.
    pub host_min_len: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            validate_indices: true,
            host_min_len: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let o = ExecOptions::default();
        assert!(o.validate_indices);
        assert_eq!(o.host_min_len, 1024);
    }

    #[test]
    fn options_serde() {
        let o = ExecOptions {
            validate_indices: false,
            host_min_len: 16,
        };
        let json = serde_json::to_string(&o).unwrap();
        assert_eq!(json, r#"{"validate_indices":false,"host_min_len":16}"#);
        assert_eq!(serde_json::from_str::<ExecOptions>(&json).unwrap(), o);
    }
}
