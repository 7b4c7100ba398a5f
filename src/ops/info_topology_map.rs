//! `InfoTopologyPackedMapOp`: map a functor over elements, giving it each
//! element's shape type and its inputs.
//!
//! For dense position `d` in `[0, nitems)`:
//!
//! ```text
//! s = indices(d)
//! outputs[d] = functor(shape_type(s), inputs[d])
//! ```
//!
//! `nitems` is the tuple count of the output bundle. Inputs and outputs are
//! packed: both are addressed by `d`, never by `s`.

use crate::data::index::IndexMap;
use crate::device;
use crate::ops::bundle::{InputBundle, OutputBundle};
use crate::ops::dispatch::{self, PackedMapArgs};
use crate::ops::executor::{DeviceStrategy, ElementKernel, HostStrategy, Strategy};
use crate::ops::{ExecOptions, Operation};
use crate::topology::cell_set::CellSet;
use crate::topology::connectivity::Connectivity;
use crate::topology::relation::Topology;
use crate::topology::shape_type::ShapeType;
use crate::topomap_error::TopoMapError;

const KERNEL: &str = "info_topology_packed_map";

/// Packed map over elements that only sees shape types.
///
/// ```
/// use mesh_topomap::prelude::*;
///
/// let mut cells: CellSet = RegularStructure::new(&[2, 2])?.into();
/// let mut codes = Array::<u8>::zeros(4);
/// InfoTopologyPackedMapOp::new(
///     &mut cells,
///     Topology::NodesOfCells,
///     (),
///     &mut codes,
///     IndexMap::Identity,
///     |shape: ShapeType, ()| shape.code(),
/// )
/// .go_host()?;
/// assert_eq!(codes.host()?, &[4, 4, 4, 4]);
/// # Ok::<(), TopoMapError>(())
/// ```
pub struct InfoTopologyPackedMapOp<'a, I, O, F> {
    cells: &'a mut CellSet,
    topology: Topology,
    inputs: I,
    outputs: O,
    indices: IndexMap<'a>,
    functor: ShapeKernel<F>,
    options: ExecOptions,
}

impl<'a, I, O, F> InfoTopologyPackedMapOp<'a, I, O, F>
where
    I: InputBundle,
    O: OutputBundle,
    F: Fn(ShapeType, I::Item) -> O::Item + Sync,
{
    pub fn new(
        cells: &'a mut CellSet,
        topology: Topology,
        inputs: I,
        outputs: O,
        indices: IndexMap<'a>,
        functor: F,
    ) -> Self {
        Self {
            cells,
            topology,
            inputs,
            outputs,
            indices,
            functor: ShapeKernel(functor),
            options: ExecOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecOptions) -> Self {
        self.options = options;
        self
    }

    fn run<S: Strategy>(mut self) -> Result<(), TopoMapError> {
        dispatch::run::<S, _, _, _>(PackedMapArgs {
            name: KERNEL,
            cells: self.cells,
            topology: self.topology,
            inputs: &self.inputs,
            outputs: &mut self.outputs,
            indices: &self.indices,
            kernel: &self.functor,
            options: &self.options,
        })
    }
}

impl<I, O, F> Operation for InfoTopologyPackedMapOp<'_, I, O, F>
where
    I: InputBundle,
    O: OutputBundle,
    F: Fn(ShapeType, I::Item) -> O::Item + Sync,
{
    fn go_host(self) -> Result<(), TopoMapError> {
        self.run::<HostStrategy>()
    }

    fn go_device(self) -> Result<(), TopoMapError> {
        if !device::is_available() {
            return Err(TopoMapError::DeviceUnavailable {
                nitems: self.outputs.tuple_count()?,
            });
        }
        self.run::<DeviceStrategy>()
    }
}

struct ShapeKernel<F>(F);

impl<In, Out, F> ElementKernel<In, Out> for ShapeKernel<F>
where
    F: Fn(ShapeType, In) -> Out + Sync,
{
    #[inline]
    fn apply<C: Connectivity>(&self, conn: &C, sparse: usize, input: In) -> Out {
        (self.0)(conn.shape_type(sparse), input)
    }
}
