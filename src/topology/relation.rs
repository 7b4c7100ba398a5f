//! Topology handles: which adjacency relation an operation queries.

use serde::{Deserialize, Serialize};

/// Adjacency relation over a cell set.
///
/// The first half of each name is the adjacency, the second half the
/// element being iterated: `NodesOfCells` iterates cells and yields the
/// nodes of each one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topology {
    /// Element = cell; adjacency = the cell's nodes in local order.
    NodesOfCells,
    /// Element = node; adjacency = incident cells, ascending.
    CellsOfNodes,
    /// Element = cell; adjacency = facet neighbours, ascending.
    CellsOfCells,
}

impl Topology {
    /// True when the iterated elements are cells.
    pub fn source_is_cells(self) -> bool {
        !matches!(self, Topology::CellsOfNodes)
    }

    /// True when the adjacency lists name cells.
    pub fn target_is_cells(self) -> bool {
        !matches!(self, Topology::NodesOfCells)
    }
}
