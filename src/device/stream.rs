//! Streams: kernel launch and the sticky error status.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;

use super::{DeviceFault, DeviceRuntime, LaunchGeometry};

/// An ordered launch queue with its own error status.
///
/// Launches are synchronous from the caller's side: `launch` returns once
/// every block has run. A fault is recorded instead of unwinding into the
/// caller; it stays set (and later launches on the stream are skipped) until
/// [`synchronize`](Self::synchronize) reports and clears it.
#[derive(Debug)]
pub struct Stream {
    runtime: &'static DeviceRuntime,
    status: Mutex<Option<DeviceFault>>,
}

impl Stream {
    pub(super) fn new(runtime: &'static DeviceRuntime) -> Self {
        Self {
            runtime,
            status: Mutex::new(None),
        }
    }

    /// Launch `body` over `[0, nitems)` with a grid-stride loop.
    ///
    /// Logical thread `t` of the grid handles `t, t + stride, t + 2*stride, ...`
    /// where `stride = geometry.total_threads()`, so every index is visited by
    /// exactly one thread regardless of how `nitems` compares to the grid.
    pub fn launch<K>(&self, kernel: &'static str, geometry: LaunchGeometry, nitems: usize, body: K)
    where
        K: Fn(usize) + Sync,
    {
        if geometry.blocks == 0 || geometry.threads_per_block == 0 {
            self.record(DeviceFault::InvalidLaunch(format!(
                "kernel `{kernel}` launched with empty grid {geometry}"
            )));
            return;
        }
        if self.status.lock().is_some() {
            log::debug!("skipping `{kernel}`: stream has a pending fault");
            return;
        }
        self.runtime.record_launch();
        log::trace!("launch `{kernel}` grid={geometry} nitems={nitems}");

        let stride = geometry.total_threads();
        let lanes = geometry.threads_per_block as usize;
        let run_block = |block: u32| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                for lane in 0..lanes {
                    let mut d = block as usize * lanes + lane;
                    while d < nitems {
                        body(d);
                        d += stride;
                    }
                }
            }));
            if let Err(payload) = result {
                self.record(DeviceFault::KernelPanicked {
                    block,
                    message: panic_message(payload.as_ref()),
                });
            }
        };

        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            (0..geometry.blocks).into_par_iter().for_each(run_block);
        }
        #[cfg(not(feature = "rayon"))]
        {
            (0..geometry.blocks).for_each(run_block);
        }
    }

    /// Wait for outstanding work and return (and clear) the error status.
    pub fn synchronize(&self) -> Result<(), DeviceFault> {
        match self.status.lock().take() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// First fault recorded wins; later ones are dropped like a sticky
    /// runtime error.
    fn record(&self, fault: DeviceFault) {
        let mut status = self.status.lock();
        if status.is_none() {
            *status = Some(fault);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
