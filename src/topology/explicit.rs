//! Explicit connectivity: per-element shape codes plus a CSR adjacency table.
//!
//! Layout for `n` elements:
//! - `shape_codes[e]`: [`ShapeType::code`] of element `e`,
//! - `offsets[e]..offsets[e + 1]`: range of `e`'s ids in `connectivity`,
//! - `offsets.len() == n + 1`, `offsets[0] == 0`, non-decreasing,
//!   `offsets[n] == connectivity.len()`.
//!
//! The three tables are [`Array`]s so they can be made resident on the
//! device alongside an operation's own arrays.

use hashbrown::HashMap;
use itertools::Itertools;

use super::connectivity::{Components, Connectivity};
use super::shape_type::ShapeType;
use crate::data::array::{Array, Location, Residency};
use crate::debug_invariants::DebugInvariants;
use crate::topomap_error::TopoMapError;

/// CSR adjacency with shape codes, for one relation of an explicit cell set.
#[derive(Debug)]
pub struct ExplicitConnectivity {
    shape_codes: Array<u8>,
    offsets: Array<u32>,
    connectivity: Array<u32>,
    /// Ids in `connectivity` are `< target_count`.
    target_count: usize,
}

fn invalid(message: impl Into<String>) -> TopoMapError {
    TopoMapError::InvalidConnectivity(message.into())
}

impl ExplicitConnectivity {
    /// Assemble from raw tables, validating the CSR invariants.
    pub fn from_parts(
        shape_codes: Vec<u8>,
        offsets: Vec<u32>,
        connectivity: Vec<u32>,
        target_count: usize,
    ) -> Result<Self, TopoMapError> {
        let conn = Self {
            shape_codes: Array::from_vec(shape_codes),
            offsets: Array::from_vec(offsets),
            connectivity: Array::from_vec(connectivity),
            target_count,
        };
        conn.validate_invariants()?;
        Ok(conn)
    }

    /// Number of elements (rows).
    pub fn num_elements(&self) -> usize {
        self.shape_codes.len()
    }

    /// Exclusive upper bound of the ids stored in the table.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Total number of stored ids.
    pub fn num_entries(&self) -> usize {
        self.connectivity.len()
    }

    /// Residency of the tables; they always move together.
    pub fn residency(&self) -> Residency {
        self.connectivity.residency()
    }

    /// Make all three tables resident on `loc`.
    pub fn ensure_resident(&mut self, loc: Location) -> Result<(), TopoMapError> {
        self.shape_codes.ensure_resident(loc)?;
        self.offsets.ensure_resident(loc)?;
        self.connectivity.ensure_resident(loc)
    }

    /// Borrow the tables resident on `loc`.
    pub fn view(&self, loc: Location) -> Result<ExplicitView<'_>, TopoMapError> {
        Ok(ExplicitView {
            shape_codes: self.shape_codes.resident_slice(loc, "connectivity shape codes")?,
            offsets: self.offsets.resident_slice(loc, "connectivity offsets")?,
            connectivity: self.connectivity.resident_slice(loc, "connectivity table")?,
        })
    }

    /// Invert the relation: for every target id, the ascending list of
    /// elements that reference it. Reverse elements are points.
    pub fn reverse(&self) -> Result<ExplicitConnectivity, TopoMapError> {
        let fwd = self.view(Location::Host)?;
        let n = self.target_count;
        let mut degree = vec![0u32; n];
        for &id in fwd.connectivity {
            degree[id as usize] += 1;
        }
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0u32);
        for d in &degree {
            let last = *offsets.last().unwrap_or(&0);
            offsets.push(last + d);
        }
        let mut cursor: Vec<u32> = offsets[..n].to_vec();
        let mut connectivity = vec![0u32; fwd.connectivity.len()];
        // Elements visited in ascending order keep every reverse list sorted.
        for element in 0..fwd.element_count() {
            for &id in fwd.row(element) {
                let slot = &mut cursor[id as usize];
                connectivity[*slot as usize] = element as u32;
                *slot += 1;
            }
        }
        log::debug!(
            "built reverse connectivity: {} rows, {} entries",
            n,
            connectivity.len()
        );
        Self::from_parts(
            vec![ShapeType::Point.code(); n],
            offsets,
            connectivity,
            fwd.element_count(),
        )
    }

    /// Facet neighbours of every element: elements sharing at least
    /// `max(dim, 1)` ids with it, where `dim` is the element's topological
    /// dimension (`Other` counts as 2). `reverse` must be this relation's
    /// [`reverse`](Self::reverse).
    pub fn facet_neighbours(
        &self,
        reverse: &ExplicitConnectivity,
    ) -> Result<ExplicitConnectivity, TopoMapError> {
        let fwd = self.view(Location::Host)?;
        let rev = reverse.view(Location::Host)?;
        let n = fwd.element_count();
        let mut offsets = Vec::with_capacity(n + 1);
        offsets.push(0u32);
        let mut connectivity = Vec::new();
        let mut shared: HashMap<u32, usize> = HashMap::new();
        for element in 0..n {
            shared.clear();
            for &node in fwd.row(element) {
                for &other in rev.row(node as usize) {
                    if other as usize != element {
                        *shared.entry(other).or_insert(0) += 1;
                    }
                }
            }
            let need = fwd
                .shape_type(element)
                .dimension()
                .map_or(2, |d| d.max(1) as usize);
            connectivity.extend(
                shared
                    .iter()
                    .filter(|&(_, &count)| count >= need)
                    .map(|(&other, _)| other)
                    .sorted_unstable(),
            );
            offsets.push(connectivity.len() as u32);
        }
        log::debug!(
            "built facet neighbours: {} cells, {} links",
            n,
            connectivity.len()
        );
        Self::from_parts(fwd.shape_codes.to_vec(), offsets, connectivity, n)
    }
}

impl DebugInvariants for ExplicitConnectivity {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "ExplicitConnectivity invalid");
    }

    fn validate_invariants(&self) -> Result<(), TopoMapError> {
        let v = self.view(Location::Host)?;
        let n = v.shape_codes.len();
        if v.offsets.len() != n + 1 {
            return Err(invalid(format!(
                "{} offsets for {} elements (expected {})",
                v.offsets.len(),
                n,
                n + 1
            )));
        }
        if v.offsets[0] != 0 {
            return Err(invalid("offsets must start at 0"));
        }
        if let Some((e, _)) = v
            .offsets
            .iter()
            .tuple_windows()
            .find_position(|(a, b)| b < a)
        {
            return Err(invalid(format!("offsets decrease at element {e}")));
        }
        if v.offsets[n] as usize != v.connectivity.len() {
            return Err(invalid(format!(
                "last offset {} does not match {} connectivity entries",
                v.offsets[n],
                v.connectivity.len()
            )));
        }
        if let Some(&code) = v
            .shape_codes
            .iter()
            .find(|&&c| ShapeType::from_code(c).is_err())
        {
            return Err(TopoMapError::UnknownShapeCode(code));
        }
        if let Some(&id) = v
            .connectivity
            .iter()
            .find(|&&id| id as usize >= self.target_count)
        {
            return Err(invalid(format!(
                "id {id} out of range (target count {})",
                self.target_count
            )));
        }
        Ok(())
    }
}

/// Borrowed tables of an [`ExplicitConnectivity`] on one memory space.
#[derive(Clone, Copy, Debug)]
pub struct ExplicitView<'a> {
    shape_codes: &'a [u8],
    offsets: &'a [u32],
    connectivity: &'a [u32],
}

impl<'a> ExplicitView<'a> {
    #[inline]
    fn row(&self, element: usize) -> &'a [u32] {
        let start = self.offsets[element] as usize;
        let end = self.offsets[element + 1] as usize;
        &self.connectivity[start..end]
    }
}

impl Connectivity for ExplicitView<'_> {
    #[inline]
    fn element_count(&self) -> usize {
        self.shape_codes.len()
    }

    #[inline]
    fn shape_type(&self, id: usize) -> ShapeType {
        // Codes are validated when the tables are assembled.
        ShapeType::from_code(self.shape_codes[id]).unwrap_or(ShapeType::Other)
    }

    #[inline]
    fn components(&self, id: usize) -> Components<'_> {
        Components::Borrowed(self.row(id))
    }
}

/// Incremental assembly of an [`ExplicitConnectivity`], one element at a time.
#[derive(Debug)]
pub struct ExplicitConnectivityBuilder {
    shape_codes: Vec<u8>,
    offsets: Vec<u32>,
    connectivity: Vec<u32>,
}

impl Default for ExplicitConnectivityBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplicitConnectivityBuilder {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    pub fn with_capacity(elements: usize, entries: usize) -> Self {
        let mut offsets = Vec::with_capacity(elements + 1);
        offsets.push(0);
        Self {
            shape_codes: Vec::with_capacity(elements),
            offsets,
            connectivity: Vec::with_capacity(entries),
        }
    }

    /// Append one element with its shape and adjacency ids.
    pub fn add_cell(&mut self, shape: ShapeType, ids: &[u32]) -> &mut Self {
        self.shape_codes.push(shape.code());
        self.connectivity.extend_from_slice(ids);
        self.offsets.push(self.connectivity.len() as u32);
        self
    }

    pub fn num_cells(&self) -> usize {
        self.shape_codes.len()
    }

    /// Finish; `target_count` bounds the ids (number of nodes for cells).
    pub fn build(self, target_count: usize) -> Result<ExplicitConnectivity, TopoMapError> {
        ExplicitConnectivity::from_parts(
            self.shape_codes,
            self.offsets,
            self.connectivity,
            target_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles and a quad over 6 nodes:
    ///
    /// ```text
    /// 3---4---5
    /// | \ | c2|
    /// 0---1---2      c0 = (0,1,3)  c1 = (1,4,3)  c2 = (1,2,5,4)
    /// ```
    fn mixed() -> ExplicitConnectivity {
        let mut b = ExplicitConnectivityBuilder::new();
        b.add_cell(ShapeType::Triangle, &[0, 1, 3])
            .add_cell(ShapeType::Triangle, &[1, 4, 3])
            .add_cell(ShapeType::Quad, &[1, 2, 5, 4]);
        b.build(6).unwrap()
    }

    #[test]
    fn builder_layout() {
        let c = mixed();
        assert_eq!(c.num_elements(), 3);
        assert_eq!(c.num_entries(), 10);
        let v = c.view(Location::Host).unwrap();
        assert_eq!(v.shape_type(0), ShapeType::Triangle);
        assert_eq!(v.shape_type(2), ShapeType::Quad);
        assert_eq!(&*v.components(2), &[1, 2, 5, 4]);
    }

    #[test]
    fn reverse_lists_are_ascending() {
        let c = mixed();
        let r = c.reverse().unwrap();
        let v = r.view(Location::Host).unwrap();
        assert_eq!(v.element_count(), 6);
        assert_eq!(&*v.components(1), &[0, 1, 2]);
        assert_eq!(&*v.components(3), &[0, 1]);
        assert_eq!(&*v.components(2), &[2]);
        assert_eq!(v.shape_type(0), ShapeType::Point);
    }

    #[test]
    fn facet_neighbours_share_an_edge() {
        let c = mixed();
        let r = c.reverse().unwrap();
        let n = c.facet_neighbours(&r).unwrap();
        let v = n.view(Location::Host).unwrap();
        assert_eq!(&*v.components(0), &[1]);
        assert_eq!(&*v.components(1), &[0, 2]);
        assert_eq!(&*v.components(2), &[1]);
        assert_eq!(v.shape_type(2), ShapeType::Quad);
    }

    #[test]
    fn rejects_bad_offsets() {
        let err = ExplicitConnectivity::from_parts(vec![3], vec![0, 2], vec![0, 1, 2], 3);
        assert!(matches!(err, Err(TopoMapError::InvalidConnectivity(_))));
        let err = ExplicitConnectivity::from_parts(vec![3, 3], vec![0, 3, 2], vec![0, 1, 2], 3);
        assert!(matches!(err, Err(TopoMapError::InvalidConnectivity(_))));
        let err = ExplicitConnectivity::from_parts(vec![3], vec![1, 3], vec![0, 1, 2], 3);
        assert!(matches!(err, Err(TopoMapError::InvalidConnectivity(_))));
    }

    #[test]
    fn rejects_out_of_range_ids_and_codes() {
        let err = ExplicitConnectivity::from_parts(vec![3], vec![0, 3], vec![0, 1, 9], 3);
        assert!(matches!(err, Err(TopoMapError::InvalidConnectivity(_))));
        let err = ExplicitConnectivity::from_parts(vec![42], vec![0, 1], vec![0], 3);
        assert_eq!(err.unwrap_err(), TopoMapError::UnknownShapeCode(42));
    }

    #[test]
    fn empty_connectivity_is_valid() {
        let c = ExplicitConnectivityBuilder::new().build(0).unwrap();
        assert_eq!(c.num_elements(), 0);
        assert_eq!(c.reverse().unwrap().num_elements(), 0);
    }
}
