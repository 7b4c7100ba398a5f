//! `TopologyPackedMapOp`: like [`InfoTopologyPackedMapOp`], but the functor
//! also receives the element's adjacency list for the bound relation.
//!
//! [`InfoTopologyPackedMapOp`]: super::InfoTopologyPackedMapOp

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

const KERNEL: &str = "topology_packed_map";

/// Packed map over elements whose functor sees `(shape, adjacent ids, inputs)`.
///
/// ```
/// use mesh_topomap::prelude::*;
///
/// let mut cells: CellSet = RegularStructure::new(&[3])?.into();
/// let mut degree = Array::<u32>::zeros(4);
/// TopologyPackedMapOp::new(
///     &mut cells,
///     Topology::CellsOfNodes,
///     (),
///     &mut degree,
///     IndexMap::Identity,
///     |_shape: ShapeType, cells: &[u32], ()| cells.len() as u32,
/// )
/// .go_host()?;
/// assert_eq!(degree.host()?, &[1, 2, 2, 1]);
/// # Ok::<(), TopoMapError>(())
/// ```
pub struct TopologyPackedMapOp<'a, I, O, F> {
    cells: &'a mut CellSet,
    topology: Topology,
    inputs: I,
    outputs: O,
    indices: IndexMap<'a>,
    functor: AdjacencyKernel<F>,
    options: ExecOptions,
}

impl<'a, I, O, F> TopologyPackedMapOp<'a, I, O, F>
where
    I: InputBundle,
    O: OutputBundle,
    F: Fn(ShapeType, &[u32], I::Item) -> O::Item + Sync,
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
            functor: AdjacencyKernel(functor),
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

impl<I, O, F> Operation for TopologyPackedMapOp<'_, I, O, F>
where
    I: InputBundle,
    O: OutputBundle,
    F: Fn(ShapeType, &[u32], I::Item) -> O::Item + Sync,
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

struct AdjacencyKernel<F>(F);

impl<In, Out, F> ElementKernel<In, Out> for AdjacencyKernel<F>
where
    F: Fn(ShapeType, &[u32], In) -> Out + Sync,
{
    #[inline]
    fn apply<C: Connectivity>(&self, conn: &C, sparse: usize, input: In) -> Out {
        let ids = conn.components(sparse);
        (self.0)(conn.shape_type(sparse), &ids, input)
    }
}
