//! The `Connectivity` interface shared by explicit and regular cell sets.
//!
//! Executors are written once against this trait and instantiated per
//! representation, so no mesh-kind branching happens inside the hot loop.

use core::ops::Deref;

use super::shape_type::ShapeType;

/// Maximum adjacency length of any regular relation (nodes of a hexahedron).
pub const MAX_REGULAR_COMPONENTS: usize = 8;

/// Adjacency list of one element.
#[derive(Clone, Copy, Debug)]
pub enum Components<'a> {
    /// Slice of a stored connectivity table.
    Borrowed(&'a [u32]),
    /// Ids computed on the fly.
    Inline(InlineIds),
}

impl Deref for Components<'_> {
    type Target = [u32];

    fn deref(&self) -> &[u32] {
        match self {
            Components::Borrowed(ids) => ids,
            Components::Inline(ids) => ids.as_slice(),
        }
    }
}

/// Fixed-capacity id list.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineIds {
    ids: [u32; MAX_REGULAR_COMPONENTS],
    len: u8,
}

impl InlineIds {
    /// # Panics
    /// Panics when more than [`MAX_REGULAR_COMPONENTS`] ids are pushed.
    #[inline]
    pub fn push(&mut self, id: u32) {
        self.ids[self.len as usize] = id;
        self.len += 1;
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.ids[..self.len as usize]
    }
}

/// Per-element shape and adjacency lookup, O(1) per query.
pub trait Connectivity: Sync {
    /// Number of elements iterated by this relation.
    fn element_count(&self) -> usize;

    /// Shape of element `id`.
    fn shape_type(&self, id: usize) -> ShapeType;

    /// Elements adjacent to element `id`.
    fn components(&self, id: usize) -> Components<'_>;
}
