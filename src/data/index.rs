//! Index mappings from dense compute positions to sparse element ids.
//!
//! A packed operation iterates `d` in `[0, nitems)` and acts on element
//! `s = map(d)` of the cell set while reading and writing its own arrays at
//! `d`. [`IndexMap::Identity`] acts on the first `nitems` elements;
//! [`IndexMap::Gather`] reads `s` out of an id array through an
//! [`ArrayIndexer`].
//!
//! The mapping is expected to be injective. That is not checked: repeated
//! ids are harmless to the engine because outputs are addressed by `d`.

use serde::{Deserialize, Serialize};

use super::array::{Array, Location};
use crate::topomap_error::TopoMapError;

/// Affine position transform `((i / div) % modulus) * mul + add`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayIndexer {
    div: usize,
    modulus: usize,
    mul: usize,
    add: usize,
}

impl Default for ArrayIndexer {
    fn default() -> Self {
        Self::identity()
    }
}

impl ArrayIndexer {
    pub const fn identity() -> Self {
        Self {
            div: 1,
            modulus: usize::MAX,
            mul: 1,
            add: 0,
        }
    }

    pub fn new(div: usize, modulus: usize, mul: usize, add: usize) -> Result<Self, TopoMapError> {
        if div == 0 || modulus == 0 {
            return Err(TopoMapError::InvalidIndexer(format!(
                "div ({div}) and modulus ({modulus}) must be non-zero"
            )));
        }
        Ok(Self {
            div,
            modulus,
            mul,
            add,
        })
    }

    /// `i * stride + offset`: picks one component out of interleaved tuples.
    pub const fn strided(stride: usize, offset: usize) -> Self {
        Self {
            div: 1,
            modulus: usize::MAX,
            mul: stride,
            add: offset,
        }
    }

    /// `i + offset`.
    pub const fn offset(offset: usize) -> Self {
        Self::strided(1, offset)
    }

    /// Position for dense index `i`. Only meaningful for positions that
    /// passed [`checked_index`](Self::checked_index).
    #[inline]
    pub fn index(&self, i: usize) -> usize {
        ((i / self.div) % self.modulus) * self.mul + self.add
    }

    /// Like [`index`](Self::index), `None` on overflow.
    pub fn checked_index(&self, i: usize) -> Option<usize> {
        ((i / self.div) % self.modulus)
            .checked_mul(self.mul)?
            .checked_add(self.add)
    }
}

/// Dense-to-sparse element mapping bound to an operation.
#[derive(Clone, Copy, Debug)]
pub enum IndexMap<'a> {
    /// `s = d`.
    Identity,
    /// `s = ids[indexer.index(d)]`.
    Gather {
        ids: &'a Array<u32>,
        indexer: ArrayIndexer,
    },
}

impl<'a> IndexMap<'a> {
    pub fn gather(ids: &'a Array<u32>) -> Self {
        IndexMap::Gather {
            ids,
            indexer: ArrayIndexer::identity(),
        }
    }

    pub fn gather_with(ids: &'a Array<u32>, indexer: ArrayIndexer) -> Self {
        IndexMap::Gather { ids, indexer }
    }

    /// Resolve against the copy resident on `loc`.
    pub(crate) fn view(&self, loc: Location) -> Result<IndexView<'a>, TopoMapError> {
        match *self {
            IndexMap::Identity => Ok(IndexView::Identity),
            IndexMap::Gather { ids, indexer } => Ok(IndexView::Gather {
                ids: ids.resident_slice(loc, "sparse index array")?,
                indexer,
            }),
        }
    }

    /// Check every position and sparse id the operation will touch, on the
    /// same copy the backend will read. Runs before any output is written.
    pub fn validate(
        &self,
        loc: Location,
        nitems: usize,
        elements: usize,
    ) -> Result<(), TopoMapError> {
        self.view(loc)?.validate(nitems, elements)
    }
}

/// Resolved mapping handed to executors.
#[derive(Clone, Copy, Debug)]
pub(crate) enum IndexView<'a> {
    Identity,
    Gather {
        ids: &'a [u32],
        indexer: ArrayIndexer,
    },
}

impl IndexView<'_> {
    /// Sparse element id for dense position `d`. Assumes a prior
    /// [`validate`](Self::validate).
    #[inline]
    pub(crate) fn sparse(&self, d: usize) -> usize {
        match self {
            IndexView::Identity => d,
            IndexView::Gather { ids, indexer } => ids[indexer.index(d)] as usize,
        }
    }

    pub(crate) fn validate(&self, nitems: usize, elements: usize) -> Result<(), TopoMapError> {
        match self {
            IndexView::Identity => {
                if nitems > elements {
                    return Err(TopoMapError::SparseIndexOutOfRange {
                        dense: elements,
                        sparse: elements,
                        elements,
                    });
                }
            }
            IndexView::Gather { ids, indexer } => {
                for dense in 0..nitems {
                    // an overflowing position is past any id array
                    let position = indexer.checked_index(dense).unwrap_or(usize::MAX);
                    let sparse = *ids.get(position).ok_or(TopoMapError::IndexerOutOfRange {
                        dense,
                        position,
                        len: ids.len(),
                    })? as usize;
                    if sparse >= elements {
                        return Err(TopoMapError::SparseIndexOutOfRange {
                            dense,
                            sparse,
                            elements,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexer_affine_transform() {
        let ix = ArrayIndexer::new(2, 3, 4, 1).unwrap();
        let got: Vec<usize> = (0..8).map(|i| ix.index(i)).collect();
        // (i/2)%3 = 0,0,1,1,2,2,0,0
        assert_eq!(got, vec![1, 1, 5, 5, 9, 9, 1, 1]);
        assert_eq!(ArrayIndexer::strided(3, 2).index(4), 14);
        assert_eq!(ArrayIndexer::identity().index(17), 17);
    }

    #[test]
    fn zero_divisor_rejected() {
        assert!(matches!(
            ArrayIndexer::new(0, 1, 1, 0),
            Err(TopoMapError::InvalidIndexer(_))
        ));
        assert!(ArrayIndexer::new(1, 0, 1, 0).is_err());
    }

    #[test]
    fn identity_validation_bounds_nitems() {
        let map = IndexMap::Identity;
        assert!(map.validate(Location::Host, 4, 4).is_ok());
        assert!(matches!(
            map.validate(Location::Host, 5, 4),
            Err(TopoMapError::SparseIndexOutOfRange { elements: 4, .. })
        ));
    }

    #[test]
    fn gather_reports_first_bad_id() {
        let ids = Array::from_vec(vec![0u32, 3, 7, 1]);
        let map = IndexMap::gather(&ids);
        assert_eq!(
            map.validate(Location::Host, 4, 5),
            Err(TopoMapError::SparseIndexOutOfRange {
                dense: 2,
                sparse: 7,
                elements: 5
            })
        );
    }

    #[test]
    fn gather_reports_indexer_overrun() {
        let ids = Array::from_vec(vec![0u32, 1, 2]);
        let map = IndexMap::gather_with(&ids, ArrayIndexer::offset(2));
        assert_eq!(
            map.validate(Location::Host, 2, 10),
            Err(TopoMapError::IndexerOutOfRange {
                dense: 1,
                position: 3,
                len: 3
            })
        );
    }

    #[test]
    fn overflowing_indexer_is_rejected() {
        let ids = Array::from_vec(vec![0u32, 1, 2]);
        let ix = ArrayIndexer::new(1, usize::MAX, usize::MAX, 1).unwrap();
        assert_eq!(ix.checked_index(1), None);
        let map = IndexMap::gather_with(&ids, ix);
        assert_eq!(
            map.validate(Location::Host, 2, 3),
            Err(TopoMapError::IndexerOutOfRange {
                dense: 1,
                position: usize::MAX,
                len: 3
            })
        );
    }

    #[test]
    fn gather_resolves_through_indexer() {
        let ids = Array::from_vec(vec![10u32, 11, 12, 13]);
        let view = IndexMap::gather_with(&ids, ArrayIndexer::strided(2, 1))
            .view(Location::Host)
            .unwrap();
        assert_eq!(view.sparse(0), 11);
        assert_eq!(view.sparse(1), 13);
    }
}
