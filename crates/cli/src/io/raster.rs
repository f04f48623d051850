//! ASCII grid raster I/O and `.prj` sidecar emission.
//!
//! The collaborator boundary sits at ASCII grids only: a [`RasterFormat`]
//! trait with one implementation (`AsciiGrid`), selected by `--ascii`
//! (GeoTIFF decoding is out of scope for this crate). An Esri ASCII grid
//! header (`ncols`/`nrows`/`xllcorner`/`yllcorner`/`cellsize`/`NODATA_value`)
//! is followed by `nrows` rows of `ncols` space-separated values, row 0
//! being the northernmost (highest `row` index in
//! [`fire_sim_core::Location`] order, since `.asc` stores top-to-bottom but
//! the grid's origin is its lower-left corner).

use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use fire_sim_core::grid::NODATA_ELEVATION;
use fire_sim_core::{GeoReference, GridBase};

use crate::error::{CliError, IoContext};

/// One input layer decoded from an ASCII grid, plus the header it carried.
pub struct AsciiLayer<T> {
    pub rows: usize,
    pub columns: usize,
    pub georef: GeoReference,
    pub nodata: f64,
    pub values: Vec<T>,
}

struct AsciiHeader {
    ncols: usize,
    nrows: usize,
    xllcorner: f64,
    yllcorner: f64,
    cellsize: f64,
    nodata: f64,
}

fn parse_header(lines: &mut impl Iterator<Item = std::io::Result<String>>, path: &Path) -> Result<AsciiHeader, CliError> {
    let mut fields = std::collections::HashMap::new();
    for _ in 0..6 {
        let line = lines
            .next()
            .ok_or_else(|| CliError::Parse(format!("{}: truncated ASCII grid header", path.display())))?
            .with_path(path)?;
        let mut parts = line.split_whitespace();
        let key = parts
            .next()
            .ok_or_else(|| CliError::Parse(format!("{}: blank header line", path.display())))?
            .to_ascii_lowercase();
        let value = parts
            .next()
            .ok_or_else(|| CliError::Parse(format!("{}: header line {key} has no value", path.display())))?
            .to_string();
        fields.insert(key, value);
    }
    let get = |k: &str| -> Result<f64, CliError> {
        fields
            .get(k)
            .ok_or_else(|| CliError::Parse(format!("{}: missing header field {k}", path.display())))?
            .parse()
            .map_err(|_| CliError::Parse(format!("{}: header field {k} is not a number", path.display())))
    };
    Ok(AsciiHeader {
        ncols: get("ncols")? as usize,
        nrows: get("nrows")? as usize,
        xllcorner: get("xllcorner")?,
        yllcorner: get("yllcorner")?,
        cellsize: get("cellsize")?,
        nodata: get("nodata_value")?,
    })
}

/// Read an Esri ASCII grid of `f64` values. Integer layers (fuel code,
/// elevation, slope, aspect) parse their values through this and narrow
/// afterwards, since the ASCII format carries no type information.
///
/// # Errors
/// Returns an error if the file can't be read, the header is malformed, or
/// a data row doesn't have exactly `ncols` values.
pub fn read_ascii(path: &Path) -> Result<AsciiLayer<f64>, CliError> {
    let file = std::fs::File::open(path).with_path(path)?;
    let mut lines = BufReader::new(file).lines();
    let header = parse_header(&mut lines, path)?;

    let mut values = Vec::with_capacity(header.nrows * header.ncols);
    let mut rows_read = 0;
    for line in lines {
        let line = line.with_path(path)?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Vec<f64> = line
            .split_whitespace()
            .map(|s| {
                s.parse()
                    .map_err(|_| CliError::Parse(format!("{}: non-numeric cell value {s}", path.display())))
            })
            .collect::<Result<_, _>>()?;
        if row.len() != header.ncols {
            return Err(CliError::Parse(format!(
                "{}: row {rows_read} has {} values, expected {}",
                path.display(),
                row.len(),
                header.ncols
            )));
        }
        values.push(row);
        rows_read += 1;
    }
    if rows_read != header.nrows {
        return Err(CliError::Parse(format!(
            "{}: expected {} rows, got {rows_read}",
            path.display(),
            header.nrows
        )));
    }

    // `.asc` rows go north-to-south (row 0 = highest grid row); flip so the
    // returned Vec is row-major in GridBase's south-up order (row 0 = yllcorner).
    values.reverse();
    let flat = values.into_iter().flatten().collect();

    Ok(AsciiLayer {
        rows: header.nrows,
        columns: header.ncols,
        georef: GeoReference::new(header.xllcorner, header.yllcorner, header.cellsize),
        nodata: header.nodata,
        values: flat,
    })
}

/// Read the four required rasters (fuel, elevation, slope, aspect) from
/// `root`, checking they all share dimensions and cell size (every raster
/// must share cell size and projection), and assemble a [`GridBase`].
///
/// # Errors
/// Returns an error if any file is missing/malformed, or if the rasters
/// disagree on shape or cell size.
pub fn read_grid(root: &Path) -> Result<GridBase, CliError> {
    let fuel = read_ascii(&root.join("fuel.asc"))?;
    let elevation = read_ascii(&root.join("elevation.asc"))?;
    let slope = read_ascii(&root.join("slope.asc"))?;
    let aspect = read_ascii(&root.join("aspect.asc"))?;

    for (name, other) in [("elevation", &elevation), ("slope", &slope), ("aspect", &aspect)] {
        if other.rows != fuel.rows || other.columns != fuel.columns {
            return Err(CliError::Parse(format!(
                "{name}.asc is {}x{} but fuel.asc is {}x{}",
                other.rows, other.columns, fuel.rows, fuel.columns
            )));
        }
        if (other.georef.cell_size_m - fuel.georef.cell_size_m).abs() > 1e-9 {
            return Err(CliError::Parse(format!("{name}.asc cell size disagrees with fuel.asc")));
        }
    }

    let fuel_code: Vec<u8> = fuel
        .values
        .iter()
        .map(|&v| if (v - fuel.nodata).abs() < 1e-9 { fire_sim_core::NULL_FUEL_CODE } else { v as u8 })
        .collect();
    let elevation_m: Vec<i16> = elevation
        .values
        .iter()
        .map(|&v| if (v - elevation.nodata).abs() < 1e-9 { NODATA_ELEVATION } else { v as i16 })
        .collect();
    let slope_percent: Vec<u8> = slope.values.iter().map(|&v| v.max(0.0) as u8).collect();
    let aspect_degrees: Vec<u16> = aspect.values.iter().map(|&v| v.rem_euclid(360.0) as u16).collect();

    GridBase::new(fuel.rows, fuel.columns, fuel.georef, fuel_code, elevation_m, slope_percent, aspect_degrees)
        .map_err(|e| CliError::Parse(e.to_string()))
}

/// Read the `.prj` sidecar accompanying the raster inputs, if one is
/// present in `root` (conventionally alongside `fuel.asc`, mirroring the
/// `fuel.prj`/`fuel.asc` pairing Esri ASCII grid tools expect).
#[must_use]
pub fn read_projection(root: &Path) -> Option<String> {
    std::fs::read_to_string(root.join("fuel.prj")).ok()
}

/// Write one `f64`-valued layer as an Esri ASCII grid
/// (`<kind>_<day>_<YYYY-MM-DD>.asc`), plus a `.prj` sidecar carrying the
/// input projection string through unchanged. Grid reprojection is out of
/// scope; the sidecar is a pass-through of whatever `.prj` text accompanied
/// the input rasters.
///
/// # Errors
/// Returns an error if the output file can't be created or written.
pub fn write_ascii(
    path: &Path,
    rows: usize,
    columns: usize,
    georef: GeoReference,
    nodata: f64,
    value_at: impl Fn(usize, usize) -> f64,
    projection: Option<&str>,
) -> Result<(), CliError> {
    let file = std::fs::File::create(path).with_path(path)?;
    let mut out = std::io::BufWriter::new(file);
    writeln!(out, "ncols         {columns}").with_path(path)?;
    writeln!(out, "nrows         {rows}").with_path(path)?;
    writeln!(out, "xllcorner     {:.6}", georef.origin_x).with_path(path)?;
    writeln!(out, "yllcorner     {:.6}", georef.origin_y).with_path(path)?;
    writeln!(out, "cellsize      {}", georef.cell_size_m).with_path(path)?;
    writeln!(out, "NODATA_value  {nodata}").with_path(path)?;

    // north row first: the highest grid row index is the northernmost.
    for ro in 0..rows {
        let row = rows - 1 - ro;
        let mut line = String::new();
        for col in 0..columns {
            line.push_str(&value_at(row, col).to_string());
            line.push(' ');
        }
        writeln!(out, "{}", line.trim_end()).with_path(path)?;
    }

    if let Some(proj) = projection {
        let prj_path = path.with_extension("prj");
        std::fs::write(&prj_path, proj).with_path(&prj_path)?;
    }
    Ok(())
}

/// Collaborator boundary between the core and raster I/O: the core only
/// ever sees an already-built [`GridBase`]. A GeoTIFF codec would implement
/// this trait alongside [`AsciiGrid`]; none is implemented here.
pub trait RasterFormat {
    /// Read the four required layers from `root` into a [`GridBase`].
    ///
    /// # Errors
    /// See [`read_grid`].
    fn read_grid(&self, root: &Path) -> Result<GridBase, CliError>;

    /// Write one layer out at `path`, with an optional `.prj` sidecar.
    ///
    /// # Errors
    /// See [`write_ascii`].
    fn write_layer(
        &self,
        path: &Path,
        rows: usize,
        columns: usize,
        georef: GeoReference,
        nodata: f64,
        value_at: &dyn Fn(usize, usize) -> f64,
        projection: Option<&str>,
    ) -> Result<(), CliError>;
}

/// The `--ascii` raster format: Esri ASCII grid in, Esri ASCII grid out.
pub struct AsciiGrid;

impl RasterFormat for AsciiGrid {
    fn read_grid(&self, root: &Path) -> Result<GridBase, CliError> {
        read_grid(root)
    }

    fn write_layer(
        &self,
        path: &Path,
        rows: usize,
        columns: usize,
        georef: GeoReference,
        nodata: f64,
        value_at: &dyn Fn(usize, usize) -> f64,
        projection: Option<&str>,
    ) -> Result<(), CliError> {
        write_ascii(path, rows, columns, georef, nodata, value_at, projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    fn sample_asc(nodata_row: bool) -> String {
        let row0 = if nodata_row { "-9999 -9999" } else { "2 2" };
        format!(
            "ncols 2\nnrows 2\nxllcorner 0.0\nyllcorner 0.0\ncellsize 100.0\nNODATA_value -9999\n{row0}\n2 2\n"
        )
    }

    #[test]
    fn read_ascii_parses_header_and_flips_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "grid.asc", &sample_asc(true));
        let layer = read_ascii(&dir.path().join("grid.asc")).unwrap();
        assert_eq!(layer.rows, 2);
        assert_eq!(layer.columns, 2);
        // row 0 in GridBase order (south) came from the LAST line of the file.
        assert_eq!(layer.values[0], 2.0);
        assert_eq!(layer.values[2], -9999.0);
    }

    #[test]
    fn read_ascii_rejects_wrong_row_count() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "bad.asc", "ncols 2\nnrows 3\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n1 1\n1 1\n");
        assert!(read_ascii(&dir.path().join("bad.asc")).is_err());
    }

    #[test]
    fn read_grid_assembles_four_layers() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "fuel.asc", &sample_asc(false));
        write_file(dir.path(), "elevation.asc", "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 100\nNODATA_value -9999\n100 100\n100 100\n");
        write_file(dir.path(), "slope.asc", "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 100\nNODATA_value -9999\n0 0\n0 0\n");
        write_file(dir.path(), "aspect.asc", "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 100\nNODATA_value -9999\n0 0\n0 0\n");

        let grid = read_grid(dir.path()).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.columns(), 2);
    }

    #[test]
    fn read_projection_returns_none_without_a_prj_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_projection(dir.path()), None);
    }

    #[test]
    fn read_projection_reads_fuel_prj() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "fuel.prj", "+proj=utm +zone=15");
        assert_eq!(read_projection(dir.path()).as_deref(), Some("+proj=utm +zone=15"));
    }

    #[test]
    fn write_ascii_round_trips_through_read_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.asc");
        let georef = GeoReference::new(10.0, 20.0, 50.0);
        write_ascii(&path, 2, 2, georef, -1.0, |r, c| (r * 2 + c) as f64, Some("+proj=utm")).unwrap();

        let layer = read_ascii(&path).unwrap();
        assert_eq!(layer.rows, 2);
        assert_eq!(layer.values[0], 0.0); // row 0, col 0
        assert_eq!(layer.values[3], 3.0); // row 1, col 1
        assert_eq!(std::fs::read_to_string(path.with_extension("prj")).unwrap(), "+proj=utm");
    }
}
