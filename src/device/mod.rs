//! Device backend: memory space, streams and kernel launches.
//!
//! The device is an accelerator emulated in-process. It owns a memory space
//! separate from host arrays (see [`DeviceBuffer`]), launches kernels over a
//! bounded grid of logical threads with a grid-stride loop, and reports
//! faults through a sticky per-stream status that callers must check after
//! every launch, mirroring how GPU runtimes surface errors.
//!
//! Availability is a build-time property: without the `device` cargo feature
//! [`runtime`] returns `None` and every device request becomes a
//! configuration error.
//!
//! ```text
//! DeviceRuntime (process-global)
//! ├── MemoryRegistry  - live allocations, bytes in use
//! └── Stream          - per-operation launch queue + error status
//! ```

mod memory;
mod stream;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::{DeviceBuffer, MemoryRegistry};
pub use stream::Stream;

/// Number of blocks launched by the packed map kernels.
pub const PACKED_MAP_BLOCKS: u32 = 32;
/// Threads per block launched by the packed map kernels.
pub const PACKED_MAP_THREADS_PER_BLOCK: u32 = 256;

/// Fixed geometry for packed map launches. Meshes larger than the grid are
/// covered by the grid-stride loop, so this never scales with `nitems`.
pub const PACKED_MAP_GEOMETRY: LaunchGeometry =
    LaunchGeometry::new(PACKED_MAP_BLOCKS, PACKED_MAP_THREADS_PER_BLOCK);

/// One-dimensional launch geometry: `blocks × threads_per_block` logical threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LaunchGeometry {
    pub blocks: u32,
    pub threads_per_block: u32,
}

impl LaunchGeometry {
    pub const fn new(blocks: u32, threads_per_block: u32) -> Self {
        Self {
            blocks,
            threads_per_block,
        }
    }

    /// Total number of logical threads, i.e. the grid stride.
    pub const fn total_threads(&self) -> usize {
        self.blocks as usize * self.threads_per_block as usize
    }
}

impl fmt::Display for LaunchGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.blocks, self.threads_per_block)
    }
}

/// Error status reported by the device runtime after a launch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceFault {
    /// A logical thread aborted while executing the kernel body.
    #[error("kernel aborted in block {block}: {message}")]
    KernelPanicked { block: u32, message: String },
    /// The launch was rejected before any thread ran.
    #[error("invalid launch: {0}")]
    InvalidLaunch(String),
}

/// Process-global device state.
#[derive(Debug)]
pub struct DeviceRuntime {
    memory: MemoryRegistry,
    launches: AtomicU64,
}

static RUNTIME: Lazy<DeviceRuntime> = Lazy::new(|| {
    log::debug!("device runtime initialised (emulated accelerator)");
    DeviceRuntime {
        memory: MemoryRegistry::default(),
        launches: AtomicU64::new(0),
    }
});

/// The device runtime, or `None` when the backend is not compiled in.
pub fn runtime() -> Option<&'static DeviceRuntime> {
    if cfg!(feature = "device") {
        Some(&RUNTIME)
    } else {
        None
    }
}

/// True when device execution can be requested at all.
pub fn is_available() -> bool {
    runtime().is_some()
}

impl DeviceRuntime {
    /// Allocate a zero-filled buffer of `len` elements in device memory.
    pub fn alloc<T: bytemuck::Pod>(&'static self, len: usize) -> DeviceBuffer<T> {
        DeviceBuffer::new(self, len)
    }

    /// Memory registry (live allocations and bytes in use).
    pub fn memory(&self) -> &MemoryRegistry {
        &self.memory
    }

    /// Create an independent stream with a clean error status.
    pub fn stream(&'static self) -> Stream {
        Stream::new(self)
    }

    /// Number of kernel launches issued since start-up.
    pub fn launches(&self) -> u64 {
        self.launches.load(Ordering::Relaxed)
    }

    pub(crate) fn record_launch(&self) {
        self.launches.fetch_add(1, Ordering::Relaxed);
    }
}
