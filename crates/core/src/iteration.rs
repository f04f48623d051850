//! A bundle of scenarios sharing one reset cycle. An `Iteration` owns a
//! vector of scenarios and a `SafeVector` of final fire sizes;
//! `reset(rng_ext, rng_spread)` re-seeds all its scenarios and
//! `cancel(warn)` cascades cancellation to each of them.
//!
//! One [`Iteration`] corresponds to one pass over every (weather stream,
//! ignition point) pair the `Model` configured; [`crate::model::Model`]
//! repeatedly resets and reruns an `Iteration` until its stopping rule is
//! satisfied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::{RecoverableCondition, SimError};
use crate::probability_map::ProbabilityMap;
use crate::safe_vector::SafeVector;
use crate::scenario::Scenario;

/// Owns one [`Scenario`] per (weather stream, ignition point) pair and the
/// final-size accumulator they all report into.
pub struct Iteration<'a> {
    scenarios: Vec<Scenario<'a>>,
    sizes: SafeVector,
    cancel_flag: Arc<AtomicBool>,
}

impl<'a> Iteration<'a> {
    /// Wrap `scenarios`, wiring every one of them to this iteration's shared
    /// cancellation flag: both the timer thread and the iteration driver
    /// can set it.
    #[must_use]
    pub fn new(mut scenarios: Vec<Scenario<'a>>) -> Self {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        for scenario in &mut scenarios {
            scenario.share_cancel_flag(Arc::clone(&cancel_flag));
        }
        Iteration { scenarios, sizes: SafeVector::new(), cancel_flag }
    }

    #[must_use]
    pub fn sizes(&self) -> &SafeVector {
        &self.sizes
    }

    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.scenarios.len()
    }

    /// Re-seed every scenario and clear this iteration's cancellation flag
    /// and accumulated sizes, ready for a fresh `run`. `base_seed` is offset
    /// per scenario so that re-running the same `Iteration` after a
    /// reset never repeats a prior draw: each scenario gets a single seeded
    /// PRNG, built from two independent seed sequences (extinction and
    /// spread) per iteration.
    pub fn reset(&mut self, base_seed: u64) {
        self.cancel_flag.store(false, Ordering::Relaxed);
        self.sizes = SafeVector::new();
        for (index, scenario) in self.scenarios.iter_mut().enumerate() {
            scenario.reset(base_seed.wrapping_add(index as u64));
        }
    }

    /// Request cancellation of every scenario in this iteration. `warn`
    /// controls whether the cascade is logged (the Model logs once at the
    /// driver level instead when cancelling many iterations at once).
    pub fn cancel(&self, warn_on_cancel: bool) {
        if warn_on_cancel {
            warn!(scenarios = self.scenarios.len(), "cancelling iteration");
        }
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// A clone of this iteration's cancellation flag, shareable with a
    /// thread that has no other access to this `Iteration` (the Model's
    /// timer thread never borrows `Iteration` itself, since that would
    /// conflict with the driver loop's own `&mut` access).
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_flag)
    }

    /// Run every scenario to completion (or cancellation), folding each
    /// scenario's private `ProbabilityMap` deltas into `save_maps` as it
    /// finishes. Scenarios run on their own OS thread, in batches of at
    /// most `max_threads` concurrently; no two threads ever touch the same
    /// scenario.
    ///
    /// # Errors
    /// Returns the first fatal error encountered by any scenario. Recoverable
    /// conditions (cancellation, running out of time) are logged and simply
    /// leave that scenario's contribution out of `save_maps`.
    pub fn run(&mut self, save_maps: &mut [ProbabilityMap], max_threads: usize) -> Result<(), SimError> {
        let sizes = &self.sizes;
        let offsets = save_maps.len();
        let batch_size = max_threads.max(1);
        let mut fatal: Option<SimError> = None;

        for batch in self.scenarios.chunks_mut(batch_size) {
            std::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter_mut()
                    .map(|scenario| {
                        let mut local_maps: Vec<ProbabilityMap> =
                            (0..offsets).map(|i| save_maps[i].copy_empty()).collect();
                        scope.spawn(move || {
                            let result = scenario.run(&mut local_maps, sizes);
                            (local_maps, result)
                        })
                    })
                    .collect();

                for handle in handles {
                    let (local_maps, result) = handle.join().expect("scenario thread panicked");
                    match result {
                        Ok(()) | Err(SimError::Recoverable(RecoverableCondition::FireExtinguished)) => {
                            for (into, from) in save_maps.iter_mut().zip(local_maps.iter()) {
                                into.add_probabilities(from);
                            }
                        }
                        Err(SimError::Recoverable(RecoverableCondition::Cancelled)) => {
                            warn!("scenario cancelled mid-run, excluded from this iteration");
                        }
                        Err(SimError::Recoverable(RecoverableCondition::OutOfTime)) => {
                            warn!("scenario ran out of time, excluded from this iteration");
                        }
                        Err(err @ SimError::Fatal(_)) => {
                            if fatal.is_none() {
                                fatal = Some(err);
                            }
                        }
                    }
                }
            });

            if fatal.is_some() {
                break;
            }
        }

        fatal.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::{C2Conifer, FuelLookup, FuelType};
    use crate::grid::{GeoReference, GridBase};
    use crate::location::Location;
    use crate::probability_map::IntensityBands;
    use crate::settings::Settings;
    use crate::spread_algorithm::OriginalSpreadAlgorithm;
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
    fn two_scenarios_fold_into_the_shared_probability_map() {
        let grid = flat_grid(20);
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(15.0, 180.0), 100, 48);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 0.05 };
        let settings =
            Settings { deterministic: true, output_date_offsets: vec![1], ..Settings::default() };

        let start_a = Location::new(5, 5);
        let start_b = Location::new(15, 15);
        let scenario_a = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 0, start_a);
        let scenario_b = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 0, start_b);

        let mut iteration = Iteration::new(vec![scenario_a, scenario_b]);
        iteration.reset(1);

        let mut save_maps = vec![ProbabilityMap::new(IntensityBands::default())];
        iteration.run(&mut save_maps, 4).unwrap();

        assert_eq!(save_maps[0].simulations(), 2);
        assert!(save_maps[0].probability(start_a) > 0.0);
        assert!(save_maps[0].probability(start_b) > 0.0);
        assert_eq!(iteration.sizes().len(), 2);
    }

    #[test]
    fn cancelling_before_run_excludes_every_scenario() {
        let grid = flat_grid(10);
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(15.0, 180.0), 100, 48);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 0.05 };
        let settings =
            Settings { deterministic: true, output_date_offsets: vec![1], ..Settings::default() };

        let scenario = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 0, Location::new(5, 5));
        let mut iteration = Iteration::new(vec![scenario]);
        iteration.reset(1);
        iteration.cancel(false);

        let mut save_maps = vec![ProbabilityMap::new(IntensityBands::default())];
        iteration.run(&mut save_maps, 4).unwrap();
        assert_eq!(save_maps[0].simulations(), 0);
    }
}
