//! `GridBase`: the fuel/elevation/slope/aspect raster the simulation reads
//! from, with affine georeferencing and NoData handling.
//!
//! A grid has a cell size and lower-left corner origin in projected
//! coordinates, and every per-cell input layer carries its own NoData
//! sentinel. Raster *reading* (GeoTIFF/ASCII parsing, projection checks) is
//! left to the CLI's `io` layer; this module only holds the decoded arrays.

use crate::cell::{Cell, SpreadKey, NULL_FUEL_CODE};
use crate::location::{Location, MAX_COLUMNS, MAX_ROWS};

/// Affine georeferencing for a grid: lower-left corner coordinates and the
/// shared cell size (metres) all input rasters must agree on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoReference {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_size_m: f64,
}

impl GeoReference {
    #[must_use]
    pub fn new(origin_x: f64, origin_y: f64, cell_size_m: f64) -> Self {
        GeoReference { origin_x, origin_y, cell_size_m }
    }

    /// Projected-coordinate centre of the cell at `location`.
    #[must_use]
    pub fn cell_centre(&self, location: Location) -> (f64, f64) {
        let x = self.origin_x + (f64::from(location.column()) + 0.5) * self.cell_size_m;
        let y = self.origin_y + (f64::from(location.row()) + 0.5) * self.cell_size_m;
        (x, y)
    }
}

/// Sentinel fuel-code and elevation values reserved for NoData cells.
pub const NODATA_ELEVATION: i16 = i16::MIN;

/// The environment a simulation runs over: fuel/elevation/slope/aspect
/// layers for every cell, row-major, plus the shared georeferencing.
///
/// Layers are flat `Vec`s rather than 2D arrays so the whole grid is one
/// contiguous allocation; `index_of` is the only place the row-major
/// layout is assumed.
#[derive(Debug, Clone)]
pub struct GridBase {
    rows: usize,
    columns: usize,
    georef: GeoReference,
    fuel_code: Vec<u8>,
    elevation_m: Vec<i16>,
    slope_percent: Vec<u8>,
    aspect_degrees: Vec<u16>,
}

impl GridBase {
    /// # Errors
    /// Returns an error if the grid exceeds [`MAX_ROWS`]/[`MAX_COLUMNS`], or
    /// if any layer's length doesn't match `rows * columns`.
    pub fn new(
        rows: usize,
        columns: usize,
        georef: GeoReference,
        fuel_code: Vec<u8>,
        elevation_m: Vec<i16>,
        slope_percent: Vec<u8>,
        aspect_degrees: Vec<u16>,
    ) -> Result<Self, crate::error::FatalError> {
        if rows > MAX_ROWS as usize || columns > MAX_COLUMNS as usize {
            return Err(crate::error::FatalError::GridTooLarge { rows, columns });
        }
        let n = rows * columns;
        debug_assert_eq!(fuel_code.len(), n);
        debug_assert_eq!(elevation_m.len(), n);
        debug_assert_eq!(slope_percent.len(), n);
        debug_assert_eq!(aspect_degrees.len(), n);
        Ok(GridBase {
            rows,
            columns,
            georef,
            fuel_code,
            elevation_m,
            slope_percent,
            aspect_degrees,
        })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub const fn georef(&self) -> GeoReference {
        self.georef
    }

    #[must_use]
    pub fn in_bounds(&self, location: Location) -> bool {
        (location.row() as usize) < self.rows && (location.column() as usize) < self.columns
    }

    fn index_of(&self, location: Location) -> usize {
        location.row() as usize * self.columns + location.column() as usize
    }

    #[must_use]
    pub fn fuel_code(&self, location: Location) -> u8 {
        self.fuel_code[self.index_of(location)]
    }

    #[must_use]
    pub fn elevation_m(&self, location: Location) -> i16 {
        self.elevation_m[self.index_of(location)]
    }

    #[must_use]
    pub fn slope_percent(&self, location: Location) -> u8 {
        self.slope_percent[self.index_of(location)]
    }

    #[must_use]
    pub fn aspect_degrees(&self, location: Location) -> u16 {
        self.aspect_degrees[self.index_of(location)]
    }

    /// Whether this cell has fuel and isn't NoData.
    #[must_use]
    pub fn can_burn(&self, location: Location) -> bool {
        self.in_bounds(location)
            && self.fuel_code(location) != NULL_FUEL_CODE
            && self.elevation_m(location) != NODATA_ELEVATION
    }

    /// The packed [`Cell`] (location + topographic spread key) at `location`.
    #[must_use]
    pub fn cell_at(&self, location: Location) -> Cell {
        let key = SpreadKey::new(
            self.slope_percent(location).min(127),
            self.aspect_degrees(location) % 360,
            self.fuel_code(location) & 0x3F,
        );
        Cell::new(location, key)
    }

    /// Expanding-ring search for the nearest burnable cell to `origin`,
    /// bounded by `max_radius` cells. An ignition landing in non-fuel
    /// falls back to this before being treated as fatal.
    #[must_use]
    pub fn find_burnable_near(&self, origin: Location, max_radius: i32) -> Option<Location> {
        if self.can_burn(origin) {
            return Some(origin);
        }
        for radius in 1..=max_radius {
            let row = origin.row();
            let col = origin.column();
            let mut best: Option<(i32, Location)> = None;
            for dr in -radius..=radius {
                for dc in -radius..=radius {
                    if dr.abs() != radius && dc.abs() != radius {
                        continue; // only the ring perimeter at this radius
                    }
                    let (r, c) = (row + dr, col + dc);
                    if r < 0 || c < 0 || r as usize >= self.rows || c as usize >= self.columns {
                        continue;
                    }
                    let candidate = Location::new(r, c);
                    if self.can_burn(candidate) {
                        let dist2 = dr * dr + dc * dc;
                        let better = match best {
                            Some((d, _)) => dist2 < d,
                            None => true,
                        };
                        if better {
                            best = Some((dist2, candidate));
                        }
                    }
                }
            }
            if let Some((_, loc)) = best {
                return Some(loc);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_grid(rows: usize, columns: usize, fuel: u8) -> GridBase {
        let n = rows * columns;
        GridBase::new(
            rows,
            columns,
            GeoReference::new(0.0, 0.0, 100.0),
            vec![fuel; n],
            vec![100; n],
            vec![0; n],
            vec![0; n],
        )
        .unwrap()
    }

    #[test]
    fn can_burn_is_false_for_null_fuel() {
        let grid = flat_grid(3, 3, NULL_FUEL_CODE);
        assert!(!grid.can_burn(Location::new(1, 1)));
    }

    #[test]
    fn can_burn_is_true_for_real_fuel() {
        let grid = flat_grid(3, 3, 2);
        assert!(grid.can_burn(Location::new(1, 1)));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let result = GridBase::new(5000, 5000, GeoReference::new(0.0, 0.0, 100.0), vec![], vec![], vec![], vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn find_burnable_near_returns_origin_when_already_burnable() {
        let grid = flat_grid(5, 5, 2);
        let found = grid.find_burnable_near(Location::new(2, 2), 3);
        assert_eq!(found, Some(Location::new(2, 2)));
    }

    #[test]
    fn find_burnable_near_expands_rings_until_found() {
        let mut fuel = vec![NULL_FUEL_CODE; 25];
        fuel[2 * 5 + 4] = 2; // burnable at (2,4), 2 cells from (2,2)
        let grid = GridBase::new(5, 5, GeoReference::new(0.0, 0.0, 100.0), fuel, vec![100; 25], vec![0; 25], vec![0; 25]).unwrap();
        let found = grid.find_burnable_near(Location::new(2, 2), 3);
        assert_eq!(found, Some(Location::new(2, 4)));
    }

    #[test]
    fn find_burnable_near_gives_up_past_max_radius() {
        let grid = flat_grid(5, 5, NULL_FUEL_CODE);
        assert_eq!(grid.find_burnable_near(Location::new(2, 2), 1), None);
    }

    #[test]
    fn cell_at_clamps_slope_and_fuel_into_packed_ranges() {
        let mut fuel = vec![2u8; 9];
        fuel[4] = 2;
        let grid = GridBase::new(3, 3, GeoReference::new(0.0, 0.0, 100.0), fuel, vec![100; 9], vec![200; 9], vec![400; 9]).unwrap();
        let cell = grid.cell_at(Location::new(1, 1));
        assert_eq!(cell.slope_percent(), 127);
        assert_eq!(cell.aspect_degrees(), 40);
    }
}
