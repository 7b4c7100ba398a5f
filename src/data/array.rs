//! `Array<T>`: a fixed-length typed buffer with explicit host/device residency.
//!
//! An array always owns a host allocation; a device allocation is created
//! on the first transfer to the device. `residency` records which copies
//! currently hold valid data. Transfers only happen through
//! [`Array::ensure_resident`]; nothing in the execution path moves data
//! implicitly.

use core::fmt::{self, Debug};

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use crate::device::{self, DeviceBuffer};
use crate::topomap_error::TopoMapError;

/// Element types that can live in an [`Array`] and cross to the device.
pub trait Element: Pod + Send + Sync {}

impl<T: Pod + Send + Sync> Element for T {}

/// A memory space an operation can execute against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Host,
    Device,
}

impl Location {
    /// The other memory space.
    pub fn other(self) -> Location {
        match self {
            Location::Host => Location::Device,
            Location::Device => Location::Host,
        }
    }
}

/// Which memory spaces hold a valid copy of an array's data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Residency {
    Host,
    Device,
    Both,
}

impl Residency {
    /// True when `loc` holds a valid copy.
    pub fn contains(self, loc: Location) -> bool {
        matches!(
            (self, loc),
            (Residency::Both, _)
                | (Residency::Host, Location::Host)
                | (Residency::Device, Location::Device)
        )
    }

    fn only(loc: Location) -> Residency {
        match loc {
            Location::Host => Residency::Host,
            Location::Device => Residency::Device,
        }
    }
}

/// Count of copies performed between memory spaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferStats {
    pub to_device: u64,
    pub to_host: u64,
}

/// Homogeneous fixed-length buffer with host/device residency.
pub struct Array<T: Element> {
    host: Vec<T>,
    device: Option<DeviceBuffer<T>>,
    residency: Residency,
    transfers: TransferStats,
}

impl<T: Element> Array<T> {
    /// Host-resident array owning `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            host: data,
            device: None,
            residency: Residency::Host,
            transfers: TransferStats::default(),
        }
    }

    /// Host-resident array of `len` zeroed elements.
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::zeroed(); len])
    }

    /// Host-resident array of `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self::from_vec(vec![value; len])
    }

    /// Number of tuples.
    #[inline]
    pub fn len(&self) -> usize {
        self.host.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Where valid copies of the data currently live.
    #[inline]
    pub fn residency(&self) -> Residency {
        self.residency
    }

    #[inline]
    pub fn is_resident(&self, loc: Location) -> bool {
        self.residency.contains(loc)
    }

    /// Transfers performed so far.
    pub fn transfers(&self) -> TransferStats {
        self.transfers
    }

    /// Copy the data to `loc` unless a valid copy is already there.
    ///
    /// Idempotent, and never invalidates the copy on the other side: after a
    /// transfer the array is resident on both.
    pub fn ensure_resident(&mut self, loc: Location) -> Result<(), TopoMapError> {
        if self.residency.contains(loc) {
            return Ok(());
        }
        match loc {
            Location::Device => {
                let rt = device::runtime()
                    .ok_or(TopoMapError::DeviceUnavailable { nitems: self.len() })?;
                let len = self.host.len();
                let buf = self.device.get_or_insert_with(|| rt.alloc(len));
                buf.upload(&self.host)?;
                self.transfers.to_device += 1;
                log::debug!(
                    "array h->d: {} elems, {} bytes",
                    len,
                    len * std::mem::size_of::<T>()
                );
            }
            Location::Host => {
                // Residency::Device implies the buffer exists.
                let buf = self.device.as_ref().ok_or(TopoMapError::NotResident {
                    what: "array device copy",
                    required: Location::Device,
                    residency: self.residency,
                })?;
                buf.download(&mut self.host)?;
                self.transfers.to_host += 1;
                log::debug!(
                    "array d->h: {} elems, {} bytes",
                    self.host.len(),
                    buf.byte_len()
                );
            }
        }
        self.residency = Residency::Both;
        Ok(())
    }

    /// Bring the data home if needed and free the device allocation.
    pub fn release_device(&mut self) -> Result<(), TopoMapError> {
        self.ensure_resident(Location::Host)?;
        self.device = None;
        self.residency = Residency::Host;
        Ok(())
    }

    /// Read-only host data.
    pub fn host(&self) -> Result<&[T], TopoMapError> {
        self.resident_slice(Location::Host, "array")
    }

    /// Mutable host data. Any device copy becomes stale.
    pub fn host_mut(&mut self) -> Result<&mut [T], TopoMapError> {
        self.require(Location::Host, "array")?;
        self.residency = Residency::Host;
        Ok(&mut self.host)
    }

    /// Copy of the host data.
    pub fn to_vec(&self) -> Result<Vec<T>, TopoMapError> {
        self.host().map(<[T]>::to_vec)
    }

    fn require(&self, loc: Location, what: &'static str) -> Result<(), TopoMapError> {
        if self.residency.contains(loc) {
            Ok(())
        } else {
            Err(TopoMapError::NotResident {
                what,
                required: loc,
                residency: self.residency,
            })
        }
    }

    /// The valid copy on `loc`, for a backend to read.
    pub(crate) fn resident_slice(
        &self,
        loc: Location,
        what: &'static str,
    ) -> Result<&[T], TopoMapError> {
        self.require(loc, what)?;
        match loc {
            Location::Host => Ok(&self.host),
            Location::Device => match &self.device {
                Some(buf) => Ok(buf.kernel_slice()),
                None => Err(TopoMapError::NotResident {
                    what,
                    required: loc,
                    residency: self.residency,
                }),
            },
        }
    }

    /// The valid copy on `loc`, for a backend to overwrite. Residency is
    /// updated separately by [`commit_write`](Self::commit_write) or
    /// [`abandon_write`](Self::abandon_write) once the backend finishes.
    pub(crate) fn resident_slice_mut(
        &mut self,
        loc: Location,
        what: &'static str,
    ) -> Result<&mut [T], TopoMapError> {
        self.require(loc, what)?;
        let residency = self.residency;
        match loc {
            Location::Host => Ok(&mut self.host),
            Location::Device => match &mut self.device {
                Some(buf) => Ok(buf.kernel_slice_mut()),
                None => Err(TopoMapError::NotResident {
                    what,
                    required: loc,
                    residency,
                }),
            },
        }
    }

    /// A backend finished writing on `loc`: the other copy is now stale.
    pub(crate) fn commit_write(&mut self, loc: Location) {
        self.residency = Residency::only(loc);
    }

    /// A backend failed while writing on `loc`. If the other side still
    /// holds the pre-operation data, fall back to it so no partial result is
    /// ever observed.
    pub(crate) fn abandon_write(&mut self, loc: Location) {
        if self.residency.contains(loc.other()) {
            self.residency = Residency::only(loc.other());
        }
    }
}

impl<T: Element> From<Vec<T>> for Array<T> {
    fn from(v: Vec<T>) -> Self {
        Self::from_vec(v)
    }
}

impl<T: Element> Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("len", &self.len())
            .field("residency", &self.residency)
            .field("transfers", &self.transfers)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_array_is_host_resident() {
        let a = Array::from_vec(vec![1u32, 2, 3]);
        assert_eq!(a.residency(), Residency::Host);
        assert_eq!(a.host().unwrap(), &[1, 2, 3]);
        assert_eq!(a.transfers(), TransferStats::default());
    }

    #[test]
    fn ensure_host_on_host_array_is_noop() {
        let mut a = Array::<f32>::zeros(4);
        a.ensure_resident(Location::Host).unwrap();
        assert_eq!(a.transfers().to_host, 0);
    }

    #[test]
    fn residency_contains() {
        assert!(Residency::Both.contains(Location::Host));
        assert!(Residency::Both.contains(Location::Device));
        assert!(!Residency::Host.contains(Location::Device));
        assert!(!Residency::Device.contains(Location::Host));
    }

    #[cfg(feature = "device")]
    #[test]
    fn device_transfer_is_idempotent_and_keeps_host() {
        let mut a = Array::from_vec(vec![1.5f64, 2.5]);
        a.ensure_resident(Location::Device).unwrap();
        a.ensure_resident(Location::Device).unwrap();
        assert_eq!(a.residency(), Residency::Both);
        assert_eq!(a.transfers().to_device, 1);
        assert_eq!(a.host().unwrap(), &[1.5, 2.5]);
    }

    #[cfg(feature = "device")]
    #[test]
    fn host_mut_invalidates_device_copy() {
        let mut a = Array::from_vec(vec![1i32, 2]);
        a.ensure_resident(Location::Device).unwrap();
        a.host_mut().unwrap()[0] = 9;
        assert_eq!(a.residency(), Residency::Host);
        a.ensure_resident(Location::Device).unwrap();
        assert_eq!(a.transfers().to_device, 2);
    }

    #[cfg(feature = "device")]
    #[test]
    fn committed_device_write_requires_download() {
        let mut a = Array::from_vec(vec![0u32; 3]);
        a.ensure_resident(Location::Device).unwrap();
        a.resident_slice_mut(Location::Device, "out")
            .unwrap()
            .copy_from_slice(&[4, 5, 6]);
        a.commit_write(Location::Device);
        assert!(matches!(
            a.host(),
            Err(TopoMapError::NotResident { required: Location::Host, .. })
        ));
        a.ensure_resident(Location::Host).unwrap();
        assert_eq!(a.host().unwrap(), &[4, 5, 6]);
    }

    #[cfg(feature = "device")]
    #[test]
    fn abandoned_device_write_falls_back_to_host() {
        let mut a = Array::from_vec(vec![1u32, 2]);
        a.ensure_resident(Location::Device).unwrap();
        a.resident_slice_mut(Location::Device, "out").unwrap()[0] = 99;
        a.abandon_write(Location::Device);
        assert_eq!(a.residency(), Residency::Host);
        assert_eq!(a.host().unwrap(), &[1, 2]);
    }

    #[cfg(not(feature = "device"))]
    #[test]
    fn device_transfer_without_backend_is_config_error() {
        let mut a = Array::from_vec(vec![1u8; 7]);
        assert_eq!(
            a.ensure_resident(Location::Device),
            Err(TopoMapError::DeviceUnavailable { nitems: 7 })
        );
    }
}
