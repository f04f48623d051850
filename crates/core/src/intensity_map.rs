//! Per-scenario burned-cell bookkeeping: [`BurnedData`] (has-this-cell-burned
//! bitset) and [`IntensityMap`] (intensity/ROS/azimuth at the hour each cell
//! burned hottest).

use crate::location::Location;
use rustc_hash::FxHashMap;

/// Number of `u64` words needed to hold one bit per cell of a `MAX_ROWS` x
/// `MAX_COLUMNS` grid.
const WORDS: usize = ((crate::location::MAX_ROWS as usize) * (crate::location::MAX_COLUMNS as usize)).div_ceil(64);

/// A fixed-size bitset recording which cells have burned, sized to the
/// maximum supported grid so it can be reused across scenarios without
/// reallocating.
#[derive(Clone)]
pub struct BurnedData {
    bits: Vec<u64>,
}

impl BurnedData {
    #[must_use]
    pub fn new() -> Self {
        BurnedData { bits: vec![0u64; WORDS] }
    }

    fn index(loc: Location) -> (usize, u32) {
        let bit = loc.hash() as usize;
        (bit / 64, (bit % 64) as u32)
    }

    pub fn set(&mut self, loc: Location) {
        let (word, bit) = Self::index(loc);
        self.bits[word] |= 1u64 << bit;
    }

    #[must_use]
    pub fn get(&self, loc: Location) -> bool {
        let (word, bit) = Self::index(loc);
        (self.bits[word] >> bit) & 1 == 1
    }

    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|w| *w = 0);
    }

    /// Whether every one of the 8 neighbours of `loc` has burned. Used to
    /// retire a point early: a source fully enclosed by burned cells cannot
    /// spread anywhere new.
    #[must_use]
    pub fn is_surrounded(&self, loc: Location) -> bool {
        let row = loc.row();
        let col = loc.column();
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (r, c) = (row + dr, col + dc);
                if r < 0 || c < 0 || (r as u32) >= crate::location::MAX_ROWS || (c as u32) >= crate::location::MAX_COLUMNS {
                    continue;
                }
                if !self.get(Location::new(r, c)) {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for BurnedData {
    fn default() -> Self {
        BurnedData::new()
    }
}

/// The ROS/azimuth recorded for a cell at the hour it burned with maximum
/// intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSpread {
    pub intensity: f64,
    pub ros: f64,
    pub azimuth_degrees: f64,
}

/// Per-scenario record of which cells have burned and, for each, the
/// intensity/ROS/azimuth recorded at whichever hour burned it hottest, plus
/// the simulation time each cell first caught (the survival test needs
/// `new_time - arrival[cell]`).
///
/// The "burned" bitset and the intensity map are kept in sync: a cell
/// appears in `peaks` if and only if its bit is set in `burned`. Intensity
/// is monotonic non-decreasing per cell across calls to [`Self::burn`].
pub struct IntensityMap {
    burned: BurnedData,
    peaks: FxHashMap<Location, PeakSpread>,
    arrival: FxHashMap<Location, f64>,
}

impl IntensityMap {
    #[must_use]
    pub fn new() -> Self {
        IntensityMap {
            burned: BurnedData::new(),
            peaks: FxHashMap::default(),
            arrival: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn can_burn(&self, loc: Location) -> bool {
        !self.burned.get(loc)
    }

    #[must_use]
    pub fn has_burned(&self, loc: Location) -> bool {
        self.burned.get(loc)
    }

    #[must_use]
    pub fn is_surrounded(&self, loc: Location) -> bool {
        self.burned.is_surrounded(loc)
    }

    /// Time (in the scenario's own units) `loc` first burned, or `None` if
    /// it hasn't burned yet.
    #[must_use]
    pub fn arrival(&self, loc: Location) -> Option<f64> {
        self.arrival.get(&loc).copied()
    }

    /// Mark `loc` as burned with no intensity recorded (used for ignition
    /// points, which start the fire rather than being reached by spread).
    pub fn ignite(&mut self, loc: Location, time: f64) {
        self.burned.set(loc);
        self.arrival.entry(loc).or_insert(time);
        self.peaks.entry(loc).or_insert(PeakSpread { intensity: 0.0, ros: 0.0, azimuth_degrees: 0.0 });
    }

    /// Record that `loc` burned at `time` with the given intensity/ROS/
    /// azimuth, keeping whichever of the old and new values has greater
    /// intensity. The first call for a cell fixes its arrival time.
    pub fn burn(&mut self, loc: Location, time: f64, intensity: f64, ros: f64, azimuth_degrees: f64) {
        self.burned.set(loc);
        self.arrival.entry(loc).or_insert(time);
        let candidate = PeakSpread { intensity, ros, azimuth_degrees };
        self.peaks
            .entry(loc)
            .and_modify(|existing| {
                if candidate.intensity > existing.intensity {
                    *existing = candidate;
                }
            })
            .or_insert(candidate);
    }

    #[must_use]
    pub fn peak(&self, loc: Location) -> Option<PeakSpread> {
        self.peaks.get(&loc).copied()
    }

    #[must_use]
    pub fn burned_cell_count(&self) -> usize {
        self.peaks.len()
    }

    /// Final fire size in hectares, given the grid's cell size in metres.
    #[must_use]
    pub fn fire_size_ha(&self, cell_size_m: f64) -> f64 {
        let cell_area_ha = (cell_size_m * cell_size_m) / 10_000.0;
        self.peaks.len() as f64 * cell_area_ha
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, PeakSpread)> + '_ {
        self.peaks.iter().map(|(&loc, &p)| (loc, p))
    }
}

impl Default for IntensityMap {
    fn default() -> Self {
        IntensityMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burned_data_set_and_get_roundtrip() {
        let mut b = BurnedData::new();
        let loc = Location::new(100, 200);
        assert!(!b.get(loc));
        b.set(loc);
        assert!(b.get(loc));
    }

    #[test]
    fn is_surrounded_false_until_all_neighbours_burned() {
        let mut b = BurnedData::new();
        let centre = Location::new(10, 10);
        assert!(!b.is_surrounded(centre));
        for dr in -1..=1i32 {
            for dc in -1..=1i32 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                b.set(Location::new(10 + dr, 10 + dc));
            }
        }
        assert!(b.is_surrounded(centre));
    }

    #[test]
    fn intensity_map_keeps_max_per_cell() {
        let mut im = IntensityMap::new();
        let loc = Location::new(3, 3);
        im.burn(loc, 0.0, 500.0, 2.0, 90.0);
        im.burn(loc, 1.0, 200.0, 1.0, 45.0);
        let peak = im.peak(loc).unwrap();
        assert!((peak.intensity - 500.0).abs() < 1e-9);
    }

    #[test]
    fn burned_cell_count_matches_distinct_cells() {
        let mut im = IntensityMap::new();
        im.ignite(Location::new(0, 0), 0.0);
        im.burn(Location::new(0, 1), 0.0, 100.0, 1.0, 0.0);
        im.burn(Location::new(0, 1), 1.0, 150.0, 1.0, 0.0);
        assert_eq!(im.burned_cell_count(), 2);
    }

    #[test]
    fn fire_size_scales_with_cell_area() {
        let mut im = IntensityMap::new();
        im.ignite(Location::new(0, 0), 0.0);
        im.burn(Location::new(0, 1), 0.0, 100.0, 1.0, 0.0);
        let size = im.fire_size_ha(100.0);
        assert!((size - 2.0).abs() < 1e-9);
    }

    #[test]
    fn arrival_time_is_fixed_on_first_burn() {
        let mut im = IntensityMap::new();
        let loc = Location::new(2, 2);
        im.burn(loc, 1.5, 100.0, 1.0, 0.0);
        im.burn(loc, 3.0, 200.0, 1.0, 0.0);
        assert_eq!(im.arrival(loc), Some(1.5));
    }
}
