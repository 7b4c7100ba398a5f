//! Cell sets: the element layer of a mesh, explicit or structured.
//!
//! [`CellSet`] is a closed sum type. Dispatch matches it exhaustively, so
//! there is no "unrecognised representation" path at run time.

use std::fmt;

use once_cell::sync::OnceCell;

use super::connectivity::Connectivity;
use super::explicit::ExplicitConnectivity;
use super::regular::{RegularConnectivity, RegularStructure};
use super::relation::Topology;
use crate::data::array::Location;
use crate::debug_invariants::DebugInvariants;
use crate::topomap_error::TopoMapError;

/// Which representation a cell set uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellSetKind {
    Explicit,
    Structured,
}

impl fmt::Display for CellSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellSetKind::Explicit => f.write_str("explicit"),
            CellSetKind::Structured => f.write_str("structured"),
        }
    }
}

/// Unstructured cells with stored connectivity.
///
/// Only `NodesOfCells` is supplied at construction; the other relations are
/// derived from it on first request and cached for the life of the cell set.
#[derive(Debug)]
pub struct CellSetExplicit {
    num_nodes: usize,
    nodes_of_cells: ExplicitConnectivity,
    cells_of_nodes: OnceCell<ExplicitConnectivity>,
    cells_of_cells: OnceCell<ExplicitConnectivity>,
}

impl CellSetExplicit {
    /// Cell set over `num_nodes` nodes with the given cell-to-node table.
    pub fn new(
        num_nodes: usize,
        nodes_of_cells: ExplicitConnectivity,
    ) -> Result<Self, TopoMapError> {
        if nodes_of_cells.target_count() != num_nodes {
            return Err(TopoMapError::InvalidConnectivity(format!(
                "connectivity addresses {} nodes, cell set has {}",
                nodes_of_cells.target_count(),
                num_nodes
            )));
        }
        let cells = Self {
            num_nodes,
            nodes_of_cells,
            cells_of_nodes: OnceCell::new(),
            cells_of_cells: OnceCell::new(),
        };
        cells.validate_invariants()?;
        Ok(cells)
    }

    pub fn num_cells(&self) -> usize {
        self.nodes_of_cells.num_elements()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Connectivity for `topology`, deriving and caching it if needed.
    pub fn connectivity(&self, topology: Topology) -> Result<&ExplicitConnectivity, TopoMapError> {
        match topology {
            Topology::NodesOfCells => Ok(&self.nodes_of_cells),
            Topology::CellsOfNodes => self
                .cells_of_nodes
                .get_or_try_init(|| self.nodes_of_cells.reverse()),
            Topology::CellsOfCells => {
                let reverse = self.connectivity(Topology::CellsOfNodes)?;
                self.cells_of_cells
                    .get_or_try_init(|| self.nodes_of_cells.facet_neighbours(reverse))
            }
        }
    }

    /// Mutable connectivity for `topology`, e.g. to change its residency.
    pub fn connectivity_mut(
        &mut self,
        topology: Topology,
    ) -> Result<&mut ExplicitConnectivity, TopoMapError> {
        self.connectivity(topology)?;
        let cached = match topology {
            Topology::NodesOfCells => return Ok(&mut self.nodes_of_cells),
            Topology::CellsOfNodes => &mut self.cells_of_nodes,
            Topology::CellsOfCells => &mut self.cells_of_cells,
        };
        Ok(cached
            .get_mut()
            .expect("derived connectivity initialised just above"))
    }
}

impl DebugInvariants for CellSetExplicit {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "CellSetExplicit invalid");
    }

    fn validate_invariants(&self) -> Result<(), TopoMapError> {
        self.nodes_of_cells.validate_invariants()?;
        let view = self.nodes_of_cells.view(Location::Host)?;
        for cell in 0..view.element_count() {
            let shape = view.shape_type(cell);
            let found = view.components(cell).len();
            if let Some(expected) = shape.vertex_count() {
                if found != expected {
                    return Err(TopoMapError::InvalidConnectivity(format!(
                        "cell {cell} is a {shape:?} with {found} nodes (expected {expected})"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Structured cells; nothing is stored per element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSetStructured {
    structure: RegularStructure,
}

impl CellSetStructured {
    pub fn new(structure: RegularStructure) -> Self {
        Self { structure }
    }

    pub fn regular_structure(&self) -> &RegularStructure {
        &self.structure
    }

    pub fn connectivity(&self, topology: Topology) -> RegularConnectivity {
        RegularConnectivity::new(&self.structure, topology)
    }
}

/// One topological layer of a mesh.
#[derive(Debug)]
pub enum CellSet {
    Explicit(CellSetExplicit),
    Structured(CellSetStructured),
}

impl CellSet {
    pub fn kind(&self) -> CellSetKind {
        match self {
            CellSet::Explicit(_) => CellSetKind::Explicit,
            CellSet::Structured(_) => CellSetKind::Structured,
        }
    }

    pub fn num_cells(&self) -> usize {
        match self {
            CellSet::Explicit(c) => c.num_cells(),
            CellSet::Structured(c) => c.structure.num_cells(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            CellSet::Explicit(c) => c.num_nodes(),
            CellSet::Structured(c) => c.structure.num_nodes(),
        }
    }

    /// Number of elements iterated by `topology`.
    pub fn element_count(&self, topology: Topology) -> usize {
        if topology.source_is_cells() {
            self.num_cells()
        } else {
            self.num_nodes()
        }
    }
}

impl From<CellSetExplicit> for CellSet {
    fn from(c: CellSetExplicit) -> Self {
        CellSet::Explicit(c)
    }
}

impl From<CellSetStructured> for CellSet {
    fn from(c: CellSetStructured) -> Self {
        CellSet::Structured(c)
    }
}

impl From<RegularStructure> for CellSet {
    fn from(s: RegularStructure) -> Self {
        CellSet::Structured(CellSetStructured::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::explicit::ExplicitConnectivityBuilder;
    use crate::topology::shape_type::ShapeType;

    fn strip() -> CellSetExplicit {
        let mut b = ExplicitConnectivityBuilder::new();
        b.add_cell(ShapeType::Triangle, &[0, 1, 3])
            .add_cell(ShapeType::Quad, &[1, 2, 5, 4])
            .add_cell(ShapeType::Triangle, &[1, 4, 3]);
        CellSetExplicit::new(6, b.build(6).unwrap()).unwrap()
    }

    #[test]
    fn derived_relations_are_cached() {
        let cells = strip();
        let a = cells.connectivity(Topology::CellsOfNodes).unwrap() as *const _;
        let b = cells.connectivity(Topology::CellsOfNodes).unwrap() as *const _;
        assert_eq!(a, b);
        let nbrs = cells.connectivity(Topology::CellsOfCells).unwrap();
        assert_eq!(nbrs.num_elements(), 3);
    }

    #[test]
    fn vertex_count_mismatch_rejected() {
        let mut b = ExplicitConnectivityBuilder::new();
        b.add_cell(ShapeType::Quad, &[0, 1, 2]);
        let err = CellSetExplicit::new(3, b.build(3).unwrap()).unwrap_err();
        assert!(matches!(err, TopoMapError::InvalidConnectivity(_)));
    }

    #[test]
    fn node_count_must_match_table() {
        let mut b = ExplicitConnectivityBuilder::new();
        b.add_cell(ShapeType::Line, &[0, 1]);
        assert!(CellSetExplicit::new(5, b.build(2).unwrap()).is_err());
    }

    #[test]
    fn polygon_accepts_any_vertex_count() {
        let mut b = ExplicitConnectivityBuilder::new();
        b.add_cell(ShapeType::Polygon, &[0, 1, 2, 3, 4]);
        assert!(CellSetExplicit::new(5, b.build(5).unwrap()).is_ok());
    }

    #[test]
    fn element_counts_per_relation() {
        let s: CellSet = RegularStructure::new(&[2, 2]).unwrap().into();
        assert_eq!(s.kind(), CellSetKind::Structured);
        assert_eq!(s.element_count(Topology::NodesOfCells), 4);
        assert_eq!(s.element_count(Topology::CellsOfNodes), 9);
        let e: CellSet = strip().into();
        assert_eq!(e.kind().to_string(), "explicit");
        assert_eq!(e.element_count(Topology::CellsOfNodes), 6);
    }
}
