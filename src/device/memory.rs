//! Device memory: buffers and the allocation registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Pod;
use dashmap::DashMap;

use super::DeviceRuntime;
use crate::topomap_error::TopoMapError;

/// Tracks live device allocations by id.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    live: DashMap<u64, usize>,
    next_id: AtomicU64,
}

impl MemoryRegistry {
    fn register(&self, bytes: usize) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.live.insert(id, bytes);
        id
    }

    fn release(&self, id: u64) {
        self.live.remove(&id);
    }

    /// Number of live allocations.
    pub fn live_allocations(&self) -> usize {
        self.live.len()
    }

    /// Total bytes held by live allocations.
    pub fn bytes_in_use(&self) -> usize {
        self.live.iter().map(|entry| *entry.value()).sum()
    }
}

/// A typed allocation in device memory.
///
/// Host code never reads a `DeviceBuffer` directly: data moves in and out
/// through [`upload`](Self::upload) / [`download`](Self::download), which copy
/// raw bytes the way a host-to-device memcpy would.
pub struct DeviceBuffer<T: Pod> {
    id: u64,
    storage: Box<[T]>,
    runtime: &'static DeviceRuntime,
}

impl<T: Pod> DeviceBuffer<T> {
    pub(super) fn new(runtime: &'static DeviceRuntime, len: usize) -> Self {
        let storage = vec![T::zeroed(); len].into_boxed_slice();
        let id = runtime.memory.register(Self::byte_len_of(len));
        Self {
            id,
            storage,
            runtime,
        }
    }

    #[inline]
    fn byte_len_of(len: usize) -> usize {
        len * std::mem::size_of::<T>()
    }

    /// Length in elements.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> usize {
        Self::byte_len_of(self.len())
    }

    fn check_len(&self, what: &'static str, found: usize) -> Result<(), TopoMapError> {
        if found != self.len() {
            return Err(TopoMapError::LengthMismatch {
                what,
                expected: self.len(),
                found,
            });
        }
        Ok(())
    }

    /// Host-to-device copy of the whole buffer. `src` must match its length.
    pub fn upload(&mut self, src: &[T]) -> Result<(), TopoMapError> {
        self.check_len("upload source", src.len())?;
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut self.storage);
        dst.copy_from_slice(bytemuck::cast_slice(src));
        Ok(())
    }

    /// Device-to-host copy of the whole buffer. `dst` must match its length.
    pub fn download(&self, dst: &mut [T]) -> Result<(), TopoMapError> {
        self.check_len("download destination", dst.len())?;
        let dst: &mut [u8] = bytemuck::cast_slice_mut(dst);
        dst.copy_from_slice(bytemuck::cast_slice(&self.storage));
        Ok(())
    }

    /// Device-side view handed to kernels.
    pub(crate) fn kernel_slice(&self) -> &[T] {
        &self.storage
    }

    pub(crate) fn kernel_slice_mut(&mut self) -> &mut [T] {
        &mut self.storage
    }
}

impl<T: Pod> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.runtime.memory.release(self.id);
    }
}

impl<T: Pod> fmt::Debug for DeviceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}
