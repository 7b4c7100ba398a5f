#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-topomap
//!
//! mesh-topomap runs data-parallel maps over the elements of a mesh, on host
//! threads or on a device backend, over explicit (stored connectivity) or
//! structured (implicit connectivity) cell sets.
//!
//! ## Features
//! - [`Array`](data::array::Array): typed buffers with explicit host/device residency
//! - Explicit and structured cell sets behind one [`Connectivity`](topology::Connectivity) interface
//! - Packed maps with optional dense-to-sparse index mappings
//! - A grid-stride device backend with sticky fault status (`device` feature)
//! - Host execution on Rayon (`rayon` feature)
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! mesh-topomap = "0.3"
//! # Optional features:
//! # default-features = false, features = ["rayon"]
//! ```
//!
//! ```
//! use mesh_topomap::prelude::*;
//!
//! let mut b = ExplicitConnectivityBuilder::new();
//! b.add_cell(ShapeType::Triangle, &[0, 1, 3])
//!     .add_cell(ShapeType::Quad, &[1, 2, 5, 4])
//!     .add_cell(ShapeType::Triangle, &[1, 4, 3]);
//! let mut cells: CellSet = CellSetExplicit::new(6, b.build(6)?)?.into();
//!
//! let mut nverts = Array::<u32>::zeros(3);
//! InfoTopologyPackedMapOp::new(
//!     &mut cells,
//!     Topology::NodesOfCells,
//!     (),
//!     &mut nverts,
//!     IndexMap::Identity,
//!     |shape: ShapeType, ()| shape.vertex_count().unwrap_or(0) as u32,
//! )
//! .execute(Location::Host)?;
//! assert_eq!(nverts.host()?, &[3, 4, 3]);
//! # Ok::<(), TopoMapError>(())
//! ```

pub mod data;
pub mod debug_invariants;
pub mod device;
pub mod ops;
pub mod topology;
pub mod topomap_error;

pub use debug_invariants::DebugInvariants;
pub use topomap_error::TopoMapError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::data::array::{Array, Location, Residency};
    pub use crate::data::index::{ArrayIndexer, IndexMap};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::ops::{ExecOptions, InfoTopologyPackedMapOp, Operation, TopologyPackedMapOp};
    pub use crate::topology::{
        CellSet, CellSetExplicit, CellSetStructured, Connectivity, ExplicitConnectivity,
        ExplicitConnectivityBuilder, RegularStructure, ShapeType, Topology,
    };
    pub use crate::topomap_error::TopoMapError;
}
