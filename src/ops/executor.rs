//! Backend strategies and the packed-map executor.
//!
//! The executor is written once and instantiated per connectivity type and
//! per backend. Its per-item body is
//!
//! ```text
//! s   = index.sparse(d)
//! out = kernel.apply(conn, s, inputs[d])
//! outputs[d] = out
//! ```
//!
//! Inputs and outputs are both addressed by the dense position `d`; only the
//! connectivity lookup goes through the sparse id.

use std::panic::{self, AssertUnwindSafe};

use crate::data::array::Location;
use crate::data::index::IndexMap;
use crate::device::{self, PACKED_MAP_GEOMETRY};
use crate::ops::ExecOptions;
use crate::ops::bundle::{InputBundle, OutputBundle};
use crate::topology::connectivity::Connectivity;
use crate::topomap_error::TopoMapError;

/// How `[0, nitems)` is spread over workers on one backend.
pub(crate) trait Strategy {
    const LOCATION: Location;

    fn for_each<K>(
        kernel: &'static str,
        nitems: usize,
        opts: &ExecOptions,
        body: K,
    ) -> Result<(), TopoMapError>
    where
        K: Fn(usize) + Sync + Send;
}

/// Host threads. A functor panic unwinds into the caller.
pub(crate) struct HostStrategy;

impl Strategy for HostStrategy {
    const LOCATION: Location = Location::Host;

    fn for_each<K>(
        _kernel: &'static str,
        nitems: usize,
        opts: &ExecOptions,
        body: K,
    ) -> Result<(), TopoMapError>
    where
        K: Fn(usize) + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            (0..nitems)
                .into_par_iter()
                .with_min_len(opts.host_min_len.max(1))
                .for_each(body);
        }
        #[cfg(not(feature = "rayon"))]
        {
            let _ = opts;
            (0..nitems).for_each(body);
        }
        Ok(())
    }
}

/// One grid-stride launch on a fresh stream, then a synchronize.
pub(crate) struct DeviceStrategy;

impl Strategy for DeviceStrategy {
    const LOCATION: Location = Location::Device;

    fn for_each<K>(
        kernel: &'static str,
        nitems: usize,
        _opts: &ExecOptions,
        body: K,
    ) -> Result<(), TopoMapError>
    where
        K: Fn(usize) + Sync + Send,
    {
        let rt = device::runtime().ok_or(TopoMapError::DeviceUnavailable { nitems })?;
        let stream = rt.stream();
        stream.launch(kernel, PACKED_MAP_GEOMETRY, nitems, body);
        stream.synchronize().map_err(|fault| {
            log::warn!("`{kernel}` failed over {nitems} items: {fault}");
            TopoMapError::DeviceFault {
                kernel,
                nitems,
                fault,
            }
        })
    }
}

/// What a packed map computes for one element.
pub(crate) trait ElementKernel<In, Out>: Sync {
    fn apply<C: Connectivity>(&self, conn: &C, sparse: usize, input: In) -> Out;
}

/// Run `kernel` for every dense position of `outputs` on backend `S`.
///
/// The index map is validated (unless disabled) before any worker starts.
/// On success the outputs become resident only on `S::LOCATION`; on failure
/// they keep their pre-operation contents where a valid copy exists. A
/// functor panic on the host drops the written copy the same way before the
/// panic is resumed.
#[allow(clippy::too_many_arguments)]
pub(crate) fn packed_map<S, C, I, O, K>(
    name: &'static str,
    nitems: usize,
    conn: &C,
    inputs: &I,
    outputs: &mut O,
    indices: &IndexMap<'_>,
    kernel: &K,
    opts: &ExecOptions,
) -> Result<(), TopoMapError>
where
    S: Strategy,
    C: Connectivity,
    I: InputBundle,
    O: OutputBundle,
    K: ElementKernel<I::Item, O::Item>,
{
    let loc = S::LOCATION;
    let index = indices.view(loc)?;
    if opts.validate_indices {
        index.validate(nitems, conn.element_count())?;
    }
    let result = {
        let in_view = inputs.view(loc)?;
        let out_view = outputs.view_mut(loc)?;
        panic::catch_unwind(AssertUnwindSafe(|| {
            S::for_each(name, nitems, opts, |d| {
                let s = index.sparse(d);
                let value = kernel.apply(conn, s, I::read(&in_view, d));
                // SAFETY: `for_each` hands each d in [0, nitems) to exactly one
                // worker, and nitems is the outputs' tuple count.
                unsafe { O::write(&out_view, d, value) };
            })
        }))
    };

    match result {
        Ok(Ok(())) => {
            outputs.commit(loc);
            Ok(())
        }
        Ok(Err(e)) => {
            outputs.abandon(loc);
            Err(e)
        }
        Err(payload) => {
            log::warn!("`{name}` panicked on {loc:?} over {nitems} items");
            outputs.abandon(loc);
            panic::resume_unwind(payload)
        }
    }
}
