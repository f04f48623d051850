//! Grid-based simulation modules

pub mod base;

pub use base::{GeoReference, GridBase, NODATA_ELEVATION};
