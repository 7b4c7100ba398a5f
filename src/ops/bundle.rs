//! Input and output bundles: tuples of arrays addressed by dense position.
//!
//! An operation's arity is fixed by the shape of the bundle it is given:
//! `(&a, &b)` reads a `(A, B)` tuple at every dense position, `(&mut x,)`
//! writes one value. Bundles resolve to views of the copy resident on the
//! executing backend; resolving fails instead of transferring data.

use std::marker::PhantomData;

use crate::data::array::{Array, Element, Location};
use crate::topomap_error::TopoMapError;

/// Read side of an operation.
pub trait InputBundle {
    /// Value read at one dense position.
    type Item;
    /// Backend-resident view shared by all workers.
    type View<'v>: Sync
    where
        Self: 'v;

    /// Every array must hold exactly `nitems` tuples.
    fn check_len(&self, nitems: usize) -> Result<(), TopoMapError>;

    fn view(&self, loc: Location) -> Result<Self::View<'_>, TopoMapError>;

    fn read(view: &Self::View<'_>, d: usize) -> Self::Item;
}

/// Write side of an operation. Its tuple count is the operation's `nitems`.
pub trait OutputBundle {
    type Item;
    type View<'v>: Sync
    where
        Self: 'v;

    /// Common tuple count of all arrays in the bundle.
    fn tuple_count(&self) -> Result<usize, TopoMapError>;

    fn view_mut(&mut self, loc: Location) -> Result<Self::View<'_>, TopoMapError>;

    /// Store `item` at dense position `d`.
    ///
    /// # Safety
    /// `d` must be below [`tuple_count`](Self::tuple_count) and no other
    /// thread may write position `d` through the same view concurrently.
    unsafe fn write(view: &Self::View<'_>, d: usize, item: Self::Item);

    /// The backend finished: the copy on `loc` is now the only valid one.
    fn commit(&mut self, loc: Location);

    /// The backend failed: discard whatever it wrote on `loc`.
    fn abandon(&mut self, loc: Location);
}

/// No inputs; the functor sees `()`.
impl InputBundle for () {
    type Item = ();
    type View<'v> = ();

    fn check_len(&self, _nitems: usize) -> Result<(), TopoMapError> {
        Ok(())
    }

    fn view(&self, _loc: Location) -> Result<(), TopoMapError> {
        Ok(())
    }

    #[inline]
    fn read(_view: &(), _d: usize) {}
}

impl<T: Element> InputBundle for &Array<T> {
    type Item = T;
    type View<'v>
        = &'v [T]
    where
        Self: 'v;

    fn check_len(&self, nitems: usize) -> Result<(), TopoMapError> {
        if self.len() == nitems {
            Ok(())
        } else {
            Err(TopoMapError::LengthMismatch {
                what: "input array",
                expected: nitems,
                found: self.len(),
            })
        }
    }

    fn view(&self, loc: Location) -> Result<&[T], TopoMapError> {
        self.resident_slice(loc, "input array")
    }

    #[inline]
    fn read(view: &&[T], d: usize) -> T {
        view[d]
    }
}

/// Shared writer over one output array. Positions are written by exactly one
/// worker each, so unsynchronised stores never alias.
pub struct OutColumn<'v, T> {
    ptr: *mut T,
    len: usize,
    _borrow: PhantomData<&'v mut [T]>,
}

// SAFETY: an `OutColumn` is only written through `OutputBundle::write`,
// whose contract gives every position a single writer.
unsafe impl<T: Send> Send for OutColumn<'_, T> {}
unsafe impl<T: Send> Sync for OutColumn<'_, T> {}

impl<'v, T> OutColumn<'v, T> {
    fn new(slice: &'v mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _borrow: PhantomData,
        }
    }

    /// # Safety
    /// See [`OutputBundle::write`].
    #[inline]
    unsafe fn store(&self, d: usize, value: T) {
        debug_assert!(d < self.len, "dense index {d} beyond output of {}", self.len);
        // SAFETY: in bounds per the caller contract; the pointer comes from a
        // live `&'v mut [T]`.
        unsafe { self.ptr.add(d).write(value) }
    }
}

impl<T: Element> OutputBundle for &mut Array<T> {
    type Item = T;
    type View<'v>
        = OutColumn<'v, T>
    where
        Self: 'v;

    fn tuple_count(&self) -> Result<usize, TopoMapError> {
        Ok(self.len())
    }

    fn view_mut(&mut self, loc: Location) -> Result<OutColumn<'_, T>, TopoMapError> {
        Ok(OutColumn::new(self.resident_slice_mut(loc, "output array")?))
    }

    #[inline]
    unsafe fn write(view: &OutColumn<'_, T>, d: usize, item: T) {
        // SAFETY: forwarded caller contract.
        unsafe { view.store(d, item) }
    }

    fn commit(&mut self, loc: Location) {
        self.commit_write(loc);
    }

    fn abandon(&mut self, loc: Location) {
        self.abandon_write(loc);
    }
}

macro_rules! input_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: InputBundle),+> InputBundle for ($($name,)+) {
            type Item = ($($name::Item,)+);
            type View<'v> = ($($name::View<'v>,)+) where Self: 'v;

            fn check_len(&self, nitems: usize) -> Result<(), TopoMapError> {
                $(self.$idx.check_len(nitems)?;)+
                Ok(())
            }

            fn view(&self, loc: Location) -> Result<Self::View<'_>, TopoMapError> {
                Ok(($(self.$idx.view(loc)?,)+))
            }

            #[inline]
            fn read(view: &Self::View<'_>, d: usize) -> Self::Item {
                ($($name::read(&view.$idx, d),)+)
            }
        }
    };
}

input_tuple!(A: 0);
input_tuple!(A: 0, B: 1);
input_tuple!(A: 0, B: 1, C: 2);
input_tuple!(A: 0, B: 1, C: 2, D: 3);

macro_rules! output_tuple {
    ($first:ident : $fidx:tt $(, $name:ident : $idx:tt)*) => {
        impl<$first: OutputBundle $(, $name: OutputBundle)*> OutputBundle for ($first, $($name,)*) {
            type Item = ($first::Item, $($name::Item,)*);
            type View<'v> = ($first::View<'v>, $($name::View<'v>,)*) where Self: 'v;

            fn tuple_count(&self) -> Result<usize, TopoMapError> {
                let n = self.$fidx.tuple_count()?;
                $(
                    let found = self.$idx.tuple_count()?;
                    if found != n {
                        return Err(TopoMapError::LengthMismatch {
                            what: "output bundle",
                            expected: n,
                            found,
                        });
                    }
                )*
                Ok(n)
            }

            fn view_mut(&mut self, loc: Location) -> Result<Self::View<'_>, TopoMapError> {
                Ok((self.$fidx.view_mut(loc)?, $(self.$idx.view_mut(loc)?,)*))
            }

            #[inline]
            unsafe fn write(view: &Self::View<'_>, d: usize, item: Self::Item) {
                // SAFETY: forwarded caller contract, one column at a time.
                unsafe {
                    $first::write(&view.$fidx, d, item.$fidx);
                    $($name::write(&view.$idx, d, item.$idx);)*
                }
            }

            fn commit(&mut self, loc: Location) {
                self.$fidx.commit(loc);
                $(self.$idx.commit(loc);)*
            }

            fn abandon(&mut self, loc: Location) {
                self.$fidx.abandon(loc);
                $(self.$idx.abandon(loc);)*
            }
        }
    };
}

output_tuple!(A: 0);
output_tuple!(A: 0, B: 1);
output_tuple!(A: 0, B: 1, C: 2);
output_tuple!(A: 0, B: 1, C: 2, D: 3);
