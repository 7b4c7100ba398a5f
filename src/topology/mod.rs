//! Top-level module for mesh topology abstractions.
//!
//! This module provides the types that describe *which elements are connected
//! to which* for the two cell-set representations:
//! - Shape types and topology handles
//! - Explicit (stored CSR) connectivity and its derived relations
//! - Regular (computed) connectivity over structured grids
//! - The `Connectivity` trait both implement, and the `CellSet` sum type
//!
//! Executors only ever see a `Connectivity`; the cell set decides which one.

pub mod cell_set;
pub mod connectivity;
pub mod explicit;
pub mod regular;
pub mod relation;
pub mod shape_type;

pub use cell_set::{CellSet, CellSetExplicit, CellSetKind, CellSetStructured};
pub use connectivity::{Components, Connectivity, InlineIds, MAX_REGULAR_COMPONENTS};
pub use explicit::{ExplicitConnectivity, ExplicitConnectivityBuilder, ExplicitView};
pub use regular::{RegularConnectivity, RegularStructure};
pub use relation::Topology;
pub use shape_type::ShapeType;
