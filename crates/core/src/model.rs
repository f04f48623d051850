//! The Monte-Carlo driver: owns the environment, schedules Iterations,
//! applies the wall-clock/simulation-count/confidence stopping rules, and
//! merges results into the final per-save-offset `ProbabilityMap`s.
//!
//! The `runIterations` loop builds an Iteration, runs it, folds its delta
//! into the shared maps, checks whether enough scenarios have run for the
//! requested confidence, and either stops or resets and goes again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{FatalError, SimError};
use crate::fuel::FuelLookup;
use crate::grid::GridBase;
use crate::iteration::Iteration;
use crate::location::Location;
use crate::probability_map::ProbabilityMap;
use crate::scenario::Scenario;
use crate::settings::Settings;
use crate::spread_algorithm::SpreadAlgorithm;
use crate::statistics::Statistics;
use crate::weather::FireWeather;

/// Everything one simulation run needs, borrowed rather than owned so the
/// caller (`fire-sim-cli`) controls how the grid, fuel table, and weather
/// streams are loaded: each `Scenario` holds a raw back-reference to its
/// Model, which outlives all of them.
pub struct Model<'a> {
    grid: &'a GridBase,
    fuels: &'a dyn FuelLookup,
    algorithm: &'a dyn SpreadAlgorithm,
    settings: &'a Settings,
    weather_streams: &'a [&'a dyn FireWeather],
    ignitions: &'a [Location],
    start_day: i32,
}

/// Outcome of a full `run_iterations` call: the per-offset probability
/// maps and how many scenarios actually ran.
pub struct ModelResult {
    pub save_maps: Vec<ProbabilityMap>,
    pub total_simulations: u64,
}

impl<'a> Model<'a> {
    #[must_use]
    pub fn new(
        grid: &'a GridBase,
        fuels: &'a dyn FuelLookup,
        algorithm: &'a dyn SpreadAlgorithm,
        settings: &'a Settings,
        weather_streams: &'a [&'a dyn FireWeather],
        ignitions: &'a [Location],
        start_day: i32,
    ) -> Self {
        Model { grid, fuels, algorithm, settings, weather_streams, ignitions, start_day }
    }

    /// Number of scenarios one Iteration runs: every (weather stream,
    /// ignition point) pair.
    #[must_use]
    pub fn scenarios_per_iteration(&self) -> usize {
        self.weather_streams.len() * self.ignitions.len()
    }

    fn build_iteration(&self) -> Iteration<'a> {
        let mut scenarios = Vec::with_capacity(self.scenarios_per_iteration());
        for &weather in self.weather_streams {
            for &cell in self.ignitions {
                scenarios.push(Scenario::new(
                    self.grid,
                    self.fuels,
                    weather,
                    self.algorithm,
                    self.settings,
                    self.start_day,
                    cell,
                ));
            }
        }
        Iteration::new(scenarios)
    }

    /// Run Iterations until the confidence, wall-clock, or simulation-count
    /// stop condition fires. `base_seed` seeds the
    /// first Iteration; each subsequent reset derives a new seed from it so
    /// no two Iterations draw identical thresholds.
    ///
    /// # Errors
    /// Returns the first fatal error raised by any scenario. A cancellation
    /// triggered by the wall-clock timer is not an error: the maps
    /// accumulated by iterations that finished before the deadline are
    /// still returned.
    pub fn run_iterations(&self, base_seed: u64) -> Result<ModelResult, SimError> {
        if self.scenarios_per_iteration() == 0 {
            return Err(FatalError::MissingFuelGrid.into());
        }

        let mut save_maps: Vec<ProbabilityMap> = self
            .settings
            .output_date_offsets
            .iter()
            .map(|_| ProbabilityMap::new(self.settings.intensity_bands))
            .collect();

        let mut iteration = self.build_iteration();
        let scenarios_per_iter = iteration.scenario_count() as u64;
        let out_of_time = AtomicBool::new(false);
        let mut cumulative_sizes: Vec<f64> = Vec::new();
        let mut iteration_means: Vec<f64> = Vec::new();
        let mut iteration_pcts: Vec<f64> = Vec::new();
        let mut total_simulations: u64 = 0;
        let mut seed = base_seed;
        let start = Instant::now();

        std::thread::scope(|scope| -> Result<(), SimError> {
            let cancel_handle = iteration.cancel_handle();
            let deadline = Duration::from_secs(self.settings.maximum_time_seconds);
            let done = AtomicBool::new(false);
            scope.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    std::thread::sleep(Duration::from_secs(1));
                    if start.elapsed() > deadline {
                        out_of_time.store(true, Ordering::Relaxed);
                        cancel_handle.store(true, Ordering::Relaxed);
                        warn!("wall-clock budget exceeded, cancelling in-flight iteration");
                        break;
                    }
                }
            });

            let result = loop {
                iteration.reset(seed);
                seed = seed.wrapping_add(scenarios_per_iter.max(1));

                if let Err(err) = iteration.run(&mut save_maps, self.settings.max_threads) {
                    break Err(err);
                }

                let sizes_this_iteration = iteration.sizes().values();
                if !sizes_this_iteration.is_empty() {
                    let mean_this_iteration =
                        sizes_this_iteration.iter().sum::<f64>() / sizes_this_iteration.len() as f64;
                    iteration_means.push(mean_this_iteration);
                    iteration_pcts.push(crate::statistics::percentile_95(&sizes_this_iteration));
                }
                cumulative_sizes.extend(sizes_this_iteration);
                total_simulations += scenarios_per_iter;
                debug!(total_simulations, "iteration complete");

                if self.settings.deterministic {
                    break Ok(());
                }
                if out_of_time.load(Ordering::Relaxed) {
                    info!("stopping: wall-clock budget exceeded");
                    break Ok(());
                }
                if total_simulations >= self.settings.maximum_simulations {
                    info!("stopping: simulation count cap reached");
                    break Ok(());
                }
                if cumulative_sizes.is_empty() {
                    warn!("every scenario so far was cancelled or ran out of time");
                    break Ok(());
                }

                // Spec 4.7 step 4 / Model.cpp's `runs_required`: stop only once all
                // three series (pooled scenario sizes, per-iteration means, and
                // per-iteration 95th percentiles) are independently confident.
                let mut sorted_sizes = cumulative_sizes.clone();
                sorted_sizes.sort_by(|a, b| a.partial_cmp(b).expect("fire sizes are never NaN"));
                let mut sorted_means = iteration_means.clone();
                sorted_means.sort_by(|a, b| a.partial_cmp(b).expect("fire sizes are never NaN"));
                let mut sorted_pcts = iteration_pcts.clone();
                sorted_pcts.sort_by(|a, b| a.partial_cmp(b).expect("fire sizes are never NaN"));

                let stats_for_sizes = Statistics::new(&sorted_sizes);
                let stats_for_means = Statistics::new(&sorted_means);
                let stats_for_pct = Statistics::new(&sorted_pcts);

                let runs_for_sizes = stats_for_sizes.runs_required(self.settings.confidence_level);
                let runs_for_means = stats_for_means.runs_required(self.settings.confidence_level);
                let runs_for_pct = stats_for_pct.runs_required(self.settings.confidence_level);
                let runs_left = runs_for_means.max(runs_for_pct).max(runs_for_sizes);
                if runs_left == 0 {
                    info!(total_simulations, "stopping: confidence threshold reached");
                    break Ok(());
                }
                debug!(runs_left, "confidence not yet reached, rerunning iteration");
            };

            done.store(true, Ordering::Relaxed);
            result
        })?;

        Ok(ModelResult { save_maps, total_simulations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::{C2Conifer, FuelType};
    use crate::grid::GeoReference;
    use crate::weather::{ConstantWeather, Wind};

    struct OneFuelTable(C2Conifer);
    impl FuelLookup for OneFuelTable {
        fn fuel(&self, code: u8) -> Option<&dyn FuelType> {
            (code == self.0.code()).then_some(&self.0 as &dyn FuelType)
        }
    }

    fn flat_grid(size: usize) -> GridBase {
        let n = size * size;
        GridBase::new(
            size,
            size,
            GeoReference::new(0.0, 0.0, 100.0),
            vec![2u8; n],
            vec![100; n],
            vec![0; n],
            vec![0; n],
        )
        .unwrap()
    }

    #[test]
    fn deterministic_mode_runs_exactly_one_iteration() {
        let grid = flat_grid(20);
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(15.0, 180.0), 100, 48);
        let streams: Vec<&dyn FireWeather> = vec![&weather];
        let algorithm = crate::spread_algorithm::OriginalSpreadAlgorithm {
            max_angle_degrees: 10.0,
            cell_size_m: 100.0,
            min_ros: 0.05,
        };
        let settings = Settings { deterministic: true, output_date_offsets: vec![1], ..Settings::default() };
        let ignitions = vec![Location::new(10, 10)];

        let model = Model::new(&grid, &fuels, &algorithm, &settings, &streams, &ignitions, 0);
        let result = model.run_iterations(1).unwrap();
        assert_eq!(result.total_simulations, 1);
        assert_eq!(result.save_maps[0].simulations(), 1);
    }

    #[test]
    fn empty_environment_is_fatal() {
        let grid = flat_grid(5);
        let fuels = OneFuelTable(C2Conifer::new());
        let streams: Vec<&dyn FireWeather> = Vec::new();
        let algorithm = crate::spread_algorithm::OriginalSpreadAlgorithm {
            max_angle_degrees: 10.0,
            cell_size_m: 100.0,
            min_ros: 0.05,
        };
        let settings = Settings::default();
        let ignitions = vec![Location::new(2, 2)];

        let model = Model::new(&grid, &fuels, &algorithm, &settings, &streams, &ignitions, 0);
        assert!(matches!(model.run_iterations(1), Err(SimError::Fatal(FatalError::MissingFuelGrid))));
    }
}
