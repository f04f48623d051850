//! Filesystem collaborators the core engine never touches directly:
//! `settings.ini`, ASCII grid rasters, weather CSVs, and the fuel lookup
//! table. Raster/weather/settings I/O is external to `fire-sim-core`.

pub mod fuel_table;
pub mod output;
pub mod raster;
pub mod settings;
pub mod weather;
