//! Data module: arrays, residency and index mappings

pub mod array;
pub mod compare;
pub mod index;

pub use array::{Array, Element, Location, Residency, TransferStats};
pub use index::{ArrayIndexer, IndexMap};
