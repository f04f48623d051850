//! Simulation-wide settings passed to the driver at construction, rather
//! than threaded through as global mutable state.
//!
//! Mirrors a flat `KEY = value` settings file's keys, except `RASTER_ROOT`
//! and `FUEL_LOOKUP_TABLE`, which name filesystem paths an external
//! collaborator (`fire-sim-cli`) resolves before the core ever sees a
//! [`Settings`].

use crate::probability_map::IntensityBands;
use crate::threshold::ThresholdWeights;

/// Simulation-wide parameters read from `settings.ini` (minus the two path
/// keys `fire-sim-cli` consumes directly).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Minimum head ROS (m/min) below which a cell is treated as not
    /// spreading.
    pub minimum_ros: f64,
    /// Cap on how far (in cell-size units) a spread step may advance in
    /// one duration.
    pub max_spread_distance: f64,
    /// Minimum daytime FFMC below which a spread step is skipped entirely.
    pub minimum_ffmc: f64,
    /// Minimum FFMC between `offset_sunset` and `offset_sunrise`.
    pub minimum_ffmc_at_night: f64,
    /// Hour offset from midnight at which "night" ends.
    pub offset_sunrise: f64,
    /// Hour offset from midnight at which "night" begins.
    pub offset_sunset: f64,
    /// Relative error the Monte-Carlo stopping rule targets.
    pub confidence_level: f64,
    /// Wall-clock budget for the whole run, in seconds.
    pub maximum_time_seconds: u64,
    /// Hard cap on total scenario count regardless of confidence.
    pub maximum_simulations: u64,
    /// Relative weighting of the general/daily/hourly threshold draws,
    /// shared by both the extinction and spread arrays.
    pub threshold_weights: ThresholdWeights,
    /// Days-from-start offsets at which a `ProbabilityMap` snapshot is taken.
    pub output_date_offsets: Vec<i32>,
    /// Fallback percent-conifer for composite (M1/M2) fuels when a stand
    /// doesn't specify its own mix.
    pub default_percent_conifer: f64,
    /// Fallback percent-dead-fir for composite (M3/M4) fuels.
    pub default_percent_dead_fir: f64,
    /// Intensity band boundaries for `ProbabilityMap` classification.
    pub intensity_bands: IntensityBands,
    /// Angular sampling step (degrees) for `OriginalSpreadAlgorithm`.
    pub max_angle_degrees: f64,
    /// `true` disables the stochastic threshold draws and the PRNG offset
    /// generator, running a single reproducible iteration.
    pub deterministic: bool,
    /// Cap on concurrently running scenario threads, equal to hardware
    /// concurrency by default but overridable.
    pub max_threads: usize,
    /// Maximum ring radius (cells) searched for a burnable cell when an
    /// ignition point lands in non-fuel.
    pub ignition_search_radius: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            minimum_ros: 0.05,
            max_spread_distance: 5.0,
            minimum_ffmc: 80.0,
            minimum_ffmc_at_night: 85.0,
            offset_sunrise: 6.0,
            offset_sunset: 20.0,
            confidence_level: 0.05,
            maximum_time_seconds: 300,
            maximum_simulations: 1000,
            threshold_weights: ThresholdWeights::default(),
            output_date_offsets: vec![1],
            default_percent_conifer: 50.0,
            default_percent_dead_fir: 0.0,
            intensity_bands: IntensityBands::default(),
            max_angle_degrees: 10.0,
            deterministic: false,
            max_threads: std::thread::available_parallelism().map(std::num::NonZero::get).unwrap_or(1),
            ignition_search_radius: 10,
        }
    }
}

impl Settings {
    /// The minimum FFMC in effect at `hour_of_day` (0-23), switching between
    /// the day and night thresholds at `offset_sunset`/`offset_sunrise`.
    #[must_use]
    pub fn minimum_ffmc_at(&self, hour_of_day: f64) -> f64 {
        if hour_of_day >= self.offset_sunset || hour_of_day < self.offset_sunrise {
            self.minimum_ffmc_at_night
        } else {
            self.minimum_ffmc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_have_sane_bounds() {
        let s = Settings::default();
        assert!(s.minimum_ros > 0.0);
        assert!(s.max_threads >= 1);
        assert!(!s.output_date_offsets.is_empty());
    }

    #[test]
    fn night_hours_use_the_night_minimum() {
        let s = Settings::default();
        assert_eq!(s.minimum_ffmc_at(22.0), s.minimum_ffmc_at_night);
        assert_eq!(s.minimum_ffmc_at(2.0), s.minimum_ffmc_at_night);
        assert_eq!(s.minimum_ffmc_at(12.0), s.minimum_ffmc);
    }
}
