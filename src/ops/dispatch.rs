//! Cell-set dispatch: pick the connectivity instance for the bound cell set
//! and relation, then run the executor for it.

use crate::data::array::Location;
use crate::data::index::IndexMap;
use crate::debug_invariants::DebugInvariants;
use crate::ops::ExecOptions;
use crate::ops::bundle::{InputBundle, OutputBundle};
use crate::ops::executor::{ElementKernel, Strategy, packed_map};
use crate::topology::cell_set::CellSet;
use crate::topology::relation::Topology;
use crate::topomap_error::TopoMapError;

/// Everything a packed map needs besides its backend.
pub(crate) struct PackedMapArgs<'o, 'a, I, O, K> {
    pub name: &'static str,
    pub cells: &'o mut CellSet,
    pub topology: Topology,
    pub inputs: &'o I,
    pub outputs: &'o mut O,
    pub indices: &'o IndexMap<'a>,
    pub kernel: &'o K,
    pub options: &'o ExecOptions,
}

/// Run a packed map on backend `S` over whichever cell-set representation
/// `args.cells` holds.
///
/// Stored connectivity is made resident on the device around a device run
/// and brought back to the host afterwards, whether or not the run succeeds.
pub(crate) fn run<S, I, O, K>(args: PackedMapArgs<'_, '_, I, O, K>) -> Result<(), TopoMapError>
where
    S: Strategy,
    I: InputBundle,
    O: OutputBundle,
    K: ElementKernel<I::Item, O::Item>,
{
    let PackedMapArgs {
        name,
        cells,
        topology,
        inputs,
        outputs,
        indices,
        kernel,
        options,
    } = args;

    let nitems = outputs.tuple_count()?;
    inputs.check_len(nitems)?;
    log::debug!(
        "{name}: {nitems} items over {} cells ({topology:?}) on {:?}",
        cells.kind(),
        S::LOCATION
    );

    match cells {
        CellSet::Explicit(explicit) => {
            let conn = explicit.connectivity_mut(topology)?;
            conn.debug_assert_invariants();
            if S::LOCATION == Location::Device {
                conn.ensure_resident(Location::Device)?;
            }
            let result = conn.view(S::LOCATION).and_then(|view| {
                packed_map::<S, _, _, _, _>(
                    name, nitems, &view, inputs, outputs, indices, kernel, options,
                )
            });
            if S::LOCATION == Location::Device {
                // the run's own error wins over a failed transfer back
                return result.and(conn.ensure_resident(Location::Host));
            }
            result
        }
        CellSet::Structured(structured) => {
            let conn = structured.connectivity(topology);
            packed_map::<S, _, _, _, _>(
                name, nitems, &conn, inputs, outputs, indices, kernel, options,
            )
        }
    }
}
