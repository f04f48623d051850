//! Per-offset output rasters and the `sizes_<day>` CSV.
//!
//! One `probability`/`occurrence`/`intensity_L`/`intensity_M`/`intensity_H`
//! raster per configured `OUTPUT_DATE_OFFSETS` entry, named
//! `<kind>_<day:03>_<YYYY-MM-DD>`, plus a `sizes_<day>` CSV of every
//! scenario's final fire size. `--occurrence`/`--sim-area` are cheap
//! derivatives of the same `ProbabilityMap` the core already accumulates.

use std::path::{Path, PathBuf};

use fire_sim_core::{GridBase, Location, ProbabilityMap};

use crate::error::{CliError, IoContext};
use crate::io::raster::RasterFormat;

/// Which optional output rasters to write, mapped from the CLI's
/// `--no-probability`/`--occurrence`/`--no-intensity` flags.
#[derive(Debug, Clone, Copy)]
pub struct OutputFlags {
    pub probability: bool,
    pub occurrence: bool,
    pub intensity: bool,
    /// Crop every raster to the bounding box of cells that actually burned
    /// in any offset's map, rather than writing the full grid extent.
    pub sim_area: bool,
}

impl Default for OutputFlags {
    fn default() -> Self {
        OutputFlags { probability: true, occurrence: false, intensity: true, sim_area: false }
    }
}

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS_IN_MONTH[(month - 1) as usize]
    }
}

/// Add `offset_days` (may be negative) to a calendar date, matching the
/// civil calendar `Util.cpp::read_date`/`make_string` dates are rendered in.
fn add_days(year: i32, month: u32, day: u32, offset_days: i32) -> (i32, u32, u32) {
    let (mut y, mut m, mut d) = (year, month, day as i64 + i64::from(offset_days));
    loop {
        let dim = i64::from(days_in_month(y, m));
        if d < 1 {
            m = if m == 1 { 12 } else { m - 1 };
            if m == 12 {
                y -= 1;
            }
            d += i64::from(days_in_month(y, m));
        } else if d > dim {
            d -= dim;
            m += 1;
            if m > 12 {
                m = 1;
                y += 1;
            }
        } else {
            break;
        }
    }
    (y, m, d as u32)
}

/// A bounding box of grid rows/columns, used to crop output rasters when
/// `--sim-area` is set.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    row_min: usize,
    row_max: usize,
    col_min: usize,
    col_max: usize,
}

impl Bounds {
    fn rows(&self) -> usize {
        self.row_max - self.row_min + 1
    }

    fn columns(&self) -> usize {
        self.col_max - self.col_min + 1
    }

    fn full(grid: &GridBase) -> Self {
        Bounds { row_min: 0, row_max: grid.rows() - 1, col_min: 0, col_max: grid.columns() - 1 }
    }

    /// Smallest box containing every cell with nonzero occurrence across
    /// `maps`, or the full grid if nothing ever burned.
    fn simulated_area(grid: &GridBase, maps: &[ProbabilityMap]) -> Self {
        let mut found = false;
        let mut bounds = Bounds { row_min: 0, row_max: 0, col_min: 0, col_max: 0 };
        for row in 0..grid.rows() {
            for col in 0..grid.columns() {
                let loc = Location::new(row as i32, col as i32);
                if maps.iter().any(|m| m.occurrence(loc) > 0) {
                    if found {
                        bounds.row_min = bounds.row_min.min(row);
                        bounds.row_max = bounds.row_max.max(row);
                        bounds.col_min = bounds.col_min.min(col);
                        bounds.col_max = bounds.col_max.max(col);
                    } else {
                        bounds = Bounds { row_min: row, row_max: row, col_min: col, col_max: col };
                        found = true;
                    }
                }
            }
        }
        if found {
            bounds
        } else {
            Bounds::full(grid)
        }
    }
}

fn raster_name(out_dir: &Path, kind: &str, day: i32, date: (i32, u32, u32)) -> PathBuf {
    out_dir.join(format!("{kind}_{day:03}_{:04}-{:02}-{:02}.asc", date.0, date.1, date.2))
}

/// Write every configured raster and the `sizes_<day>` CSV for one save
/// offset's [`ProbabilityMap`].
///
/// # Errors
/// Returns an error if a raster or the sizes CSV can't be written.
#[allow(clippy::too_many_arguments)]
fn write_offset(
    out_dir: &Path,
    format: &dyn RasterFormat,
    grid: &GridBase,
    bounds: Bounds,
    day: i32,
    date: (i32, u32, u32),
    map: &ProbabilityMap,
    flags: OutputFlags,
    projection: Option<&str>,
) -> Result<(), CliError> {
    let georef = grid.georef();
    let cropped_origin = (
        georef.origin_x + (bounds.col_min as f64) * georef.cell_size_m,
        georef.origin_y + (bounds.row_min as f64) * georef.cell_size_m,
    );
    let cropped_georef = fire_sim_core::GeoReference::new(cropped_origin.0, cropped_origin.1, georef.cell_size_m);
    let rows = bounds.rows();
    let columns = bounds.columns();

    let loc_at = |row: usize, col: usize| Location::new((bounds.row_min + row) as i32, (bounds.col_min + col) as i32);

    if flags.probability {
        format.write_layer(
            &raster_name(out_dir, "probability", day, date),
            rows,
            columns,
            cropped_georef,
            -1.0,
            &|r, c| map.probability(loc_at(r, c)),
            projection,
        )?;
    }
    if flags.occurrence {
        format.write_layer(
            &raster_name(out_dir, "occurrence", day, date),
            rows,
            columns,
            cropped_georef,
            -1.0,
            &|r, c| f64::from(map.occurrence(loc_at(r, c))),
            projection,
        )?;
    }
    if flags.intensity {
        format.write_layer(
            &raster_name(out_dir, "intensity_L", day, date),
            rows,
            columns,
            cropped_georef,
            -1.0,
            &|r, c| map.probability_low(loc_at(r, c)),
            projection,
        )?;
        format.write_layer(
            &raster_name(out_dir, "intensity_M", day, date),
            rows,
            columns,
            cropped_georef,
            -1.0,
            &|r, c| map.probability_moderate(loc_at(r, c)),
            projection,
        )?;
        format.write_layer(
            &raster_name(out_dir, "intensity_H", day, date),
            rows,
            columns,
            cropped_georef,
            -1.0,
            &|r, c| map.probability_high(loc_at(r, c)),
            projection,
        )?;
    }

    let sizes_path = out_dir.join(format!("sizes_{day:03}.csv"));
    let file = std::fs::File::create(&sizes_path).with_path(&sizes_path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(["size_ha"]).map_err(|e| CliError::Parse(e.to_string()))?;
    for size in map.sizes() {
        writer.write_record([size.to_string()]).map_err(|e| CliError::Parse(e.to_string()))?;
    }
    writer.flush().with_path(&sizes_path)?;

    Ok(())
}

/// Write every configured raster for every `(offset, map)` pair.
/// `start_date` is the calendar date of simulation day 0; each offset's
/// rasters are dated `start_date + offset` days.
///
/// # Errors
/// Returns an error if any raster or CSV write fails.
pub fn write_all(
    out_dir: &Path,
    format: &dyn RasterFormat,
    grid: &GridBase,
    offsets: &[i32],
    maps: &[ProbabilityMap],
    start_date: (i32, u32, u32),
    flags: OutputFlags,
    projection: Option<&str>,
) -> Result<(), CliError> {
    std::fs::create_dir_all(out_dir).with_path(out_dir)?;
    let bounds = if flags.sim_area { Bounds::simulated_area(grid, maps) } else { Bounds::full(grid) };

    for (&day, map) in offsets.iter().zip(maps) {
        let date = add_days(start_date.0, start_date.1, start_date.2, day);
        write_offset(out_dir, format, grid, bounds, day, date, map, flags, projection)?;
    }
    Ok(())
}
