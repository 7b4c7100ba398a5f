//! Structured (all-regular) grids: connectivity by index arithmetic.
//!
//! A [`RegularStructure`] is just the cell extent along each axis. Cell and
//! node ids are flat with x varying fastest. Nothing is stored per element;
//! [`RegularConnectivity`] answers shape and adjacency queries from the ids.

use serde::{Deserialize, Serialize};

use super::connectivity::{Components, Connectivity, InlineIds};
use super::relation::Topology;
use super::shape_type::ShapeType;
use crate::topomap_error::TopoMapError;

/// Cell extents of a 1D, 2D or 3D structured grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRegularStructure")]
pub struct RegularStructure {
    dimension: usize,
    /// Unused axes hold 1.
    cells: [usize; 3],
}

impl RegularStructure {
    /// Grid with `cell_dims[a]` cells along axis `a`.
    pub fn new(cell_dims: &[usize]) -> Result<Self, TopoMapError> {
        if cell_dims.is_empty() || cell_dims.len() > 3 {
            return Err(TopoMapError::InvalidStructure(format!(
                "dimension must be 1, 2 or 3, got {}",
                cell_dims.len()
            )));
        }
        if let Some(axis) = cell_dims.iter().position(|&n| n == 0) {
            return Err(TopoMapError::InvalidStructure(format!(
                "axis {axis} has zero cells"
            )));
        }
        let mut cells = [1usize; 3];
        cells[..cell_dims.len()].copy_from_slice(cell_dims);
        let total = cells.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n + 1));
        if total.is_none_or(|n| n > u32::MAX as usize) {
            return Err(TopoMapError::InvalidStructure(
                "node count exceeds the u32 id range".into(),
            ));
        }
        Ok(Self {
            dimension: cell_dims.len(),
            cells,
        })
    }

    /// Grid with `node_dims[a]` nodes (so `node_dims[a] - 1` cells) per axis.
    pub fn from_node_dims(node_dims: &[usize]) -> Result<Self, TopoMapError> {
        let cells: Vec<usize> = node_dims.iter().map(|&n| n.saturating_sub(1)).collect();
        Self::new(&cells)
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn cell_dims(&self) -> &[usize] {
        &self.cells[..self.dimension]
    }

    pub fn node_dims(&self) -> Vec<usize> {
        self.cell_dims().iter().map(|n| n + 1).collect()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.iter().product()
    }

    pub fn num_nodes(&self) -> usize {
        (0..3).map(|a| self.node_extent(a)).product()
    }

    /// Node count along axis `a`; 1 for unused axes.
    #[inline]
    fn node_extent(&self, axis: usize) -> usize {
        if axis < self.dimension {
            self.cells[axis] + 1
        } else {
            1
        }
    }

    /// Logical (i, j, k) of a flat cell id.
    #[inline]
    pub fn cell_logical(&self, id: usize) -> [usize; 3] {
        let [nx, ny, _] = self.cells;
        [id % nx, (id / nx) % ny, id / (nx * ny)]
    }

    #[inline]
    pub fn cell_id(&self, ijk: [usize; 3]) -> usize {
        let [nx, ny, _] = self.cells;
        ijk[0] + nx * (ijk[1] + ny * ijk[2])
    }

    #[inline]
    pub fn node_logical(&self, id: usize) -> [usize; 3] {
        let nx = self.node_extent(0);
        let ny = self.node_extent(1);
        [id % nx, (id / nx) % ny, id / (nx * ny)]
    }

    #[inline]
    pub fn node_id(&self, ijk: [usize; 3]) -> usize {
        let nx = self.node_extent(0);
        let ny = self.node_extent(1);
        ijk[0] + nx * (ijk[1] + ny * ijk[2])
    }
}

/// Serialized form, checked by [`RegularStructure::new`] on the way in.
#[derive(Deserialize)]
struct RawRegularStructure {
    dimension: usize,
    cells: [usize; 3],
}

impl TryFrom<RawRegularStructure> for RegularStructure {
    type Error = TopoMapError;

    fn try_from(raw: RawRegularStructure) -> Result<Self, Self::Error> {
        let RawRegularStructure { dimension, cells } = raw;
        if dimension == 0 || dimension > 3 {
            return Err(TopoMapError::InvalidStructure(format!(
                "dimension must be 1, 2 or 3, got {dimension}"
            )));
        }
        if cells[dimension..].iter().any(|&n| n != 1) {
            return Err(TopoMapError::InvalidStructure(
                "unused axes must hold 1".into(),
            ));
        }
        Self::new(&cells[..dimension])
    }
}

/// Connectivity of a structured grid for one relation. `Copy` and O(1) in
/// space, so it is passed to kernels by value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegularConnectivity {
    structure: RegularStructure,
    topology: Topology,
}

impl RegularConnectivity {
    pub fn new(structure: &RegularStructure, topology: Topology) -> Self {
        Self {
            structure: *structure,
            topology,
        }
    }

    pub fn structure(&self) -> &RegularStructure {
        &self.structure
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Nodes of a cell: segment order, counter-clockwise quads, and hexes as
    /// the bottom face then the top face.
    fn nodes_of_cell(&self, cell: usize) -> InlineIds {
        let s = &self.structure;
        let [i, j, k] = s.cell_logical(cell);
        let corners: &[[usize; 3]] = match s.dimension {
            1 => &[[0, 0, 0], [1, 0, 0]],
            2 => &[[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
            _ => &[
                [0, 0, 0],
                [1, 0, 0],
                [1, 1, 0],
                [0, 1, 0],
                [0, 0, 1],
                [1, 0, 1],
                [1, 1, 1],
                [0, 1, 1],
            ],
        };
        let mut out = InlineIds::default();
        for c in corners {
            out.push(s.node_id([i + c[0], j + c[1], k + c[2]]) as u32);
        }
        out
    }

    /// Cells touching a node, ascending.
    fn cells_of_node(&self, node: usize) -> InlineIds {
        let s = &self.structure;
        let ijk = s.node_logical(node);
        // Per axis, the candidate cell indices are ijk-1 and ijk.
        let range = |axis: usize| -> std::ops::RangeInclusive<usize> {
            if axis >= s.dimension {
                0..=0
            } else {
                let lo = ijk[axis].saturating_sub(1);
                let hi = ijk[axis].min(s.cells[axis] - 1);
                lo..=hi
            }
        };
        let mut out = InlineIds::default();
        for ck in range(2) {
            for cj in range(1) {
                for ci in range(0) {
                    out.push(s.cell_id([ci, cj, ck]) as u32);
                }
            }
        }
        out
    }

    /// Face neighbours of a cell, ascending.
    fn cells_of_cell(&self, cell: usize) -> InlineIds {
        let s = &self.structure;
        let ijk = s.cell_logical(cell);
        let mut out = InlineIds::default();
        for axis in (0..s.dimension).rev() {
            if ijk[axis] > 0 {
                let mut n = ijk;
                n[axis] -= 1;
                out.push(s.cell_id(n) as u32);
            }
        }
        for axis in 0..s.dimension {
            if ijk[axis] + 1 < s.cells[axis] {
                let mut n = ijk;
                n[axis] += 1;
                out.push(s.cell_id(n) as u32);
            }
        }
        out
    }
}

impl Connectivity for RegularConnectivity {
    fn element_count(&self) -> usize {
        match self.topology {
            Topology::NodesOfCells | Topology::CellsOfCells => self.structure.num_cells(),
            Topology::CellsOfNodes => self.structure.num_nodes(),
        }
    }

    #[inline]
    fn shape_type(&self, _id: usize) -> ShapeType {
        if self.topology.source_is_cells() {
            ShapeType::regular_cell(self.structure.dimension)
        } else {
            ShapeType::Point
        }
    }

    fn components(&self, id: usize) -> Components<'_> {
        Components::Inline(match self.topology {
            Topology::NodesOfCells => self.nodes_of_cell(id),
            Topology::CellsOfNodes => self.cells_of_node(id),
            Topology::CellsOfCells => self.cells_of_cell(id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(dims: &[usize]) -> RegularStructure {
        RegularStructure::new(dims).unwrap()
    }

    #[test]
    fn counts() {
        let s = grid(&[2, 2]);
        assert_eq!(s.num_cells(), 4);
        assert_eq!(s.num_nodes(), 9);
        assert_eq!(s.node_dims(), vec![3, 3]);
        let s3 = grid(&[2, 3, 4]);
        assert_eq!(s3.num_cells(), 24);
        assert_eq!(s3.num_nodes(), 3 * 4 * 5);
    }

    #[test]
    fn rejects_bad_dims() {
        assert!(RegularStructure::new(&[]).is_err());
        assert!(RegularStructure::new(&[1, 1, 1, 1]).is_err());
        assert!(matches!(
            RegularStructure::new(&[3, 0]),
            Err(TopoMapError::InvalidStructure(_))
        ));
        assert!(RegularStructure::from_node_dims(&[1, 4]).is_err());
    }

    #[test]
    fn logical_round_trip() {
        let s = grid(&[3, 2, 2]);
        for id in 0..s.num_cells() {
            assert_eq!(s.cell_id(s.cell_logical(id)), id);
        }
        for id in 0..s.num_nodes() {
            assert_eq!(s.node_id(s.node_logical(id)), id);
        }
    }

    #[test]
    fn quad_nodes_counter_clockwise() {
        let conn = RegularConnectivity::new(&grid(&[2, 2]), Topology::NodesOfCells);
        // node grid is 3x3; cell 3 is (1,1)
        assert_eq!(&*conn.components(3), &[4, 5, 8, 7]);
        assert_eq!(conn.shape_type(3), ShapeType::Quad);
    }

    #[test]
    fn hex_nodes() {
        let conn = RegularConnectivity::new(&grid(&[1, 1, 1]), Topology::NodesOfCells);
        assert_eq!(&*conn.components(0), &[0, 1, 3, 2, 4, 5, 7, 6]);
        assert_eq!(conn.shape_type(0), ShapeType::Hex);
    }

    #[test]
    fn line_nodes() {
        let conn = RegularConnectivity::new(&grid(&[4]), Topology::NodesOfCells);
        assert_eq!(&*conn.components(2), &[2, 3]);
        assert_eq!(conn.shape_type(0), ShapeType::Line);
    }

    #[test]
    fn cells_of_nodes_corner_and_center() {
        let conn = RegularConnectivity::new(&grid(&[2, 2]), Topology::CellsOfNodes);
        assert_eq!(conn.element_count(), 9);
        assert_eq!(&*conn.components(0), &[0]);
        assert_eq!(&*conn.components(4), &[0, 1, 2, 3]);
        assert_eq!(&*conn.components(5), &[1, 3]);
        assert_eq!(conn.shape_type(4), ShapeType::Point);
    }

    #[test]
    fn cells_of_cells_face_neighbours() {
        let conn = RegularConnectivity::new(&grid(&[3, 3]), Topology::CellsOfCells);
        assert_eq!(&*conn.components(4), &[1, 3, 5, 7]);
        assert_eq!(&*conn.components(0), &[1, 3]);
        let conn3 = RegularConnectivity::new(&grid(&[3, 3, 3]), Topology::CellsOfCells);
        assert_eq!(&*conn3.components(13), &[4, 10, 12, 14, 16, 22]);
    }
}
