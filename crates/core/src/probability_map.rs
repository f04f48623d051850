//! Aggregated per-cell burn probability across scenario repetitions,
//! partitioned into low/moderate/high intensity bands.
//!
//! Each completed scenario contributes one
//! [`crate::intensity_map::IntensityMap`], which this type folds in by
//! bucketing every burned cell's peak intensity into one of three bands
//! and incrementing that cell's occurrence count.

use rustc_hash::FxHashMap;

use crate::intensity_map::IntensityMap;
use crate::location::Location;
use crate::statistics::Statistics;

/// Intensity (kW/m) band boundaries used to classify a cell's peak
/// burn intensity into low/moderate/high.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityBands {
    pub min_value: f64,
    pub low_max: f64,
    pub med_max: f64,
    pub max_value: f64,
}

impl Default for IntensityBands {
    fn default() -> Self {
        IntensityBands { min_value: 0.0, low_max: 500.0, med_max: 2000.0, max_value: 4000.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Low,
    Moderate,
    High,
}

impl IntensityBands {
    fn classify(&self, intensity: f64) -> Band {
        if intensity <= self.low_max {
            Band::Low
        } else if intensity <= self.med_max {
            Band::Moderate
        } else {
            Band::High
        }
    }
}

/// Per-cell occurrence counts across every scenario folded in so far,
/// plus the list of final fire sizes for [`Statistics`].
#[derive(Debug, Clone)]
pub struct ProbabilityMap {
    bands: IntensityBands,
    simulations: u32,
    total: FxHashMap<Location, u32>,
    low: FxHashMap<Location, u32>,
    moderate: FxHashMap<Location, u32>,
    high: FxHashMap<Location, u32>,
    sizes: Vec<f64>,
}

impl ProbabilityMap {
    #[must_use]
    pub fn new(bands: IntensityBands) -> Self {
        ProbabilityMap {
            bands,
            simulations: 0,
            total: FxHashMap::default(),
            low: FxHashMap::default(),
            moderate: FxHashMap::default(),
            high: FxHashMap::default(),
            sizes: Vec::new(),
        }
    }

    /// An empty map with the same band configuration, for per-thread
    /// accumulation before merging (thread-local maps combine
    /// commutatively).
    #[must_use]
    pub fn copy_empty(&self) -> Self {
        ProbabilityMap::new(self.bands)
    }

    /// Fold one completed scenario's result in: every burned cell's peak
    /// intensity increments the matching band (and `total`), and the
    /// scenario's final fire size is recorded for [`Self::statistics`].
    pub fn add_probability(&mut self, for_time: &IntensityMap, fire_size_ha: f64) {
        self.simulations += 1;
        self.sizes.push(fire_size_ha);
        for (location, peak) in for_time.iter() {
            *self.total.entry(location).or_insert(0) += 1;
            let bucket = match self.bands.classify(peak.intensity) {
                Band::Low => &mut self.low,
                Band::Moderate => &mut self.moderate,
                Band::High => &mut self.high,
            };
            *bucket.entry(location).or_insert(0) += 1;
        }
    }

    /// Combine another map's counts into this one. Commutative, so merge
    /// order across threads doesn't matter.
    pub fn add_probabilities(&mut self, rhs: &ProbabilityMap) {
        self.simulations += rhs.simulations;
        self.sizes.extend_from_slice(&rhs.sizes);
        merge_counts(&mut self.total, &rhs.total);
        merge_counts(&mut self.low, &rhs.low);
        merge_counts(&mut self.moderate, &rhs.moderate);
        merge_counts(&mut self.high, &rhs.high);
    }

    #[must_use]
    pub fn simulations(&self) -> u32 {
        self.simulations
    }

    /// Fraction of folded-in scenarios in which `location` burned at all.
    #[must_use]
    pub fn probability(&self, location: Location) -> f64 {
        if self.simulations == 0 {
            return 0.0;
        }
        f64::from(self.total.get(&location).copied().unwrap_or(0)) / f64::from(self.simulations)
    }

    /// Raw number of folded-in scenarios in which `location` burned, for the
    /// `occurrence` output raster.
    #[must_use]
    pub fn occurrence(&self, location: Location) -> u32 {
        self.total.get(&location).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn probability_low(&self, location: Location) -> f64 {
        self.band_probability(&self.low, location)
    }

    #[must_use]
    pub fn probability_moderate(&self, location: Location) -> f64 {
        self.band_probability(&self.moderate, location)
    }

    #[must_use]
    pub fn probability_high(&self, location: Location) -> f64 {
        self.band_probability(&self.high, location)
    }

    fn band_probability(&self, band: &FxHashMap<Location, u32>, location: Location) -> f64 {
        if self.simulations == 0 {
            return 0.0;
        }
        f64::from(band.get(&location).copied().unwrap_or(0)) / f64::from(self.simulations)
    }

    #[must_use]
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    #[must_use]
    pub fn num_sizes(&self) -> usize {
        self.sizes.len()
    }

    /// # Panics
    /// Panics if no scenario has been folded in yet.
    #[must_use]
    pub fn statistics(&self) -> Statistics {
        let mut sorted = self.sizes.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("fire sizes are never NaN"));
        Statistics::new(&sorted)
    }

    pub fn reset(&mut self) {
        self.simulations = 0;
        self.total.clear();
        self.low.clear();
        self.moderate.clear();
        self.high.clear();
        self.sizes.clear();
    }
}

fn merge_counts(into: &mut FxHashMap<Location, u32>, from: &FxHashMap<Location, u32>) {
    for (&location, &count) in from {
        *into.entry(location).or_insert(0) += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;

    fn map_with_one_burn(loc: Location, intensity: f64) -> IntensityMap {
        let mut m = IntensityMap::new();
        m.burn(loc, 0.0, intensity, 1.0, 0.0);
        m
    }

    #[test]
    fn single_scenario_gives_full_probability_at_burned_cell() {
        let loc = Location::new(1, 1);
        let mut pm = ProbabilityMap::new(IntensityBands::default());
        pm.add_probability(&map_with_one_burn(loc, 100.0), 1.0);
        assert_eq!(pm.probability(loc), 1.0);
        assert_eq!(pm.probability_low(loc), 1.0);
        assert_eq!(pm.probability_moderate(loc), 0.0);
    }

    #[test]
    fn occurrence_counts_match_folded_in_scenarios() {
        let loc = Location::new(1, 1);
        let mut pm = ProbabilityMap::new(IntensityBands::default());
        pm.add_probability(&map_with_one_burn(loc, 100.0), 1.0);
        pm.add_probability(&map_with_one_burn(loc, 100.0), 1.0);
        assert_eq!(pm.occurrence(loc), 2);
        assert_eq!(pm.occurrence(Location::new(9, 9)), 0);
    }

    #[test]
    fn unburned_cell_has_zero_probability() {
        let pm = ProbabilityMap::new(IntensityBands::default());
        assert_eq!(pm.probability(Location::new(5, 5)), 0.0);
    }

    #[test]
    fn high_intensity_lands_in_high_band() {
        let loc = Location::new(2, 2);
        let mut pm = ProbabilityMap::new(IntensityBands::default());
        pm.add_probability(&map_with_one_burn(loc, 10_000.0), 1.0);
        assert_eq!(pm.probability_high(loc), 1.0);
        assert_eq!(pm.probability_low(loc), 0.0);
    }

    #[test]
    fn merging_two_maps_combines_simulation_counts() {
        let loc = Location::new(3, 3);
        let mut a = ProbabilityMap::new(IntensityBands::default());
        a.add_probability(&map_with_one_burn(loc, 100.0), 1.0);
        let mut b = ProbabilityMap::new(IntensityBands::default());
        b.add_probability(&map_with_one_burn(loc, 100.0), 2.0);
        a.add_probabilities(&b);
        assert_eq!(a.simulations(), 2);
        assert_eq!(a.probability(loc), 1.0);
        assert_eq!(a.num_sizes(), 2);
    }

    #[test]
    fn statistics_reflect_recorded_sizes() {
        let loc = Location::new(0, 0);
        let mut pm = ProbabilityMap::new(IntensityBands::default());
        pm.add_probability(&map_with_one_burn(loc, 100.0), 2.0);
        pm.add_probability(&map_with_one_burn(loc, 100.0), 4.0);
        let stats = pm.statistics();
        assert_eq!(stats.mean(), 3.0);
    }
}
