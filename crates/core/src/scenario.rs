//! A single stochastic fire-growth realisation: point set, per-scenario
//! thresholds, event scheduler, and intensity map.
//!
//! `Scenario` borrows the environment (grid, fuel table, weather stream,
//! spread algorithm, settings) from its owning driver rather than holding
//! its own copies: the Model outlives all its scenarios, so a borrow with
//! lifetime tied to the Model is enough.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{Cell, SpreadKey};
use crate::cell_points::CellPoints;
use crate::cell_points_map::CellPointsMap;
use crate::error::{FatalError, RecoverableCondition, SimError};
use crate::event::{Event, Scheduler};
use crate::fuel::{FuelLookup, SpreadInputs};
use crate::grid::GridBase;
use crate::hull::convex_hull;
use crate::intensity_map::IntensityMap;
use crate::location::{relative_index, DirectionMask, Location};
use crate::point::{apply_offsets, Offset};
use crate::probability_map::ProbabilityMap;
use crate::safe_vector::SafeVector;
use crate::settings::Settings;
use crate::spread_algorithm::SpreadAlgorithm;
use crate::spread_info::SpreadInfo;
use crate::threshold::ThresholdArrays;
use crate::weather::{foliar_moisture, FireWeather, FwiWeather};

/// One stochastic realisation of fire growth from a single ignition cell
/// over one weather stream. Scenarios are one-shot: call [`Scenario::reset`]
/// before each [`Scenario::run`] to draw a fresh set of thresholds.
pub struct Scenario<'a> {
    grid: &'a GridBase,
    fuels: &'a dyn FuelLookup,
    weather: &'a dyn FireWeather,
    algorithm: &'a dyn SpreadAlgorithm,
    settings: &'a Settings,
    start_day: i32,
    start_cell: Location,

    scheduler: Scheduler,
    points: CellPointsMap,
    intensity: IntensityMap,
    thresholds: ThresholdArrays,
    spread_info: FxHashMap<SpreadKey, SpreadInfo>,
    current_hour: Option<i32>,
    max_ros: f64,
    /// Cells that have permanently failed survival or become fully
    /// surrounded; once a cell lands here it is never reinserted, even if
    /// a later step's offsets would otherwise land a point on it.
    unburnable: FxHashSet<Location>,
    cancelled: bool,
    /// External cancellation flag, set by an `Iteration`'s driver thread
    /// (e.g. the Model's timer thread) while this scenario runs on its own
    /// thread. `None` until [`Self::share_cancel_flag`] is called.
    shared_cancel: Option<Arc<AtomicBool>>,
}

impl<'a> Scenario<'a> {
    /// Construct a scenario bound to its environment. Call [`Self::reset`]
    /// before [`Self::run`]; the constructor alone leaves no thresholds
    /// drawn and no events scheduled.
    #[must_use]
    pub fn new(
        grid: &'a GridBase,
        fuels: &'a dyn FuelLookup,
        weather: &'a dyn FireWeather,
        algorithm: &'a dyn SpreadAlgorithm,
        settings: &'a Settings,
        start_day: i32,
        start_cell: Location,
    ) -> Self {
        Scenario {
            grid,
            fuels,
            weather,
            algorithm,
            settings,
            start_day,
            start_cell,
            scheduler: Scheduler::new(),
            points: CellPointsMap::new(),
            intensity: IntensityMap::new(),
            thresholds: ThresholdArrays::deterministic(start_day, start_day),
            spread_info: FxHashMap::default(),
            current_hour: None,
            max_ros: 0.0,
            unburnable: FxHashSet::default(),
            cancelled: false,
            shared_cancel: None,
        }
    }

    /// Bind an external cancellation flag, checked alongside [`Self::cancel`]
    /// on every iteration of [`Self::run`]'s event loop. Used by `Iteration`
    /// to let the Model's timer thread cancel a scenario running on its own
    /// thread: the flag is checked between events, so both the timer thread
    /// and the iteration driver can cancel it.
    pub fn share_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.shared_cancel = Some(flag);
    }

    /// Draw a fresh threshold pair (or the all-zero deterministic arrays)
    /// and schedule the initial NEW_FIRE, one SAVE per configured output
    /// day, and the terminal END_SIMULATION at `last_save`.
    pub fn reset(&mut self, seed: u64) {
        self.scheduler.reset();
        self.points.clear();
        self.intensity = IntensityMap::new();
        self.spread_info.clear();
        self.current_hour = None;
        self.max_ros = 0.0;
        self.unburnable.clear();
        self.cancelled = false;

        let last_offset = self.settings.output_date_offsets.iter().copied().max().unwrap_or(0);
        let last_day = self.start_day + last_offset;
        self.thresholds = if self.settings.deterministic {
            ThresholdArrays::deterministic(self.start_day, last_day)
        } else {
            ThresholdArrays::generate(seed, self.start_day, last_day, self.settings.threshold_weights)
        };

        for &offset in &self.settings.output_date_offsets {
            self.scheduler.push(Event::Save { time: f64::from(offset) });
        }
        self.scheduler.push(Event::EndSimulation { time: f64::from(last_offset) });
        self.scheduler.push(Event::NewFire { time: 0.0, cell: self.start_cell });
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    #[must_use]
    pub fn intensity(&self) -> &IntensityMap {
        &self.intensity
    }

    #[must_use]
    pub fn fire_size_ha(&self) -> f64 {
        self.intensity.fire_size_ha(self.grid.georef().cell_size_m)
    }

    /// Drive the event loop until the scheduler empties, END_SIMULATION
    /// fires, or [`Self::cancel`] is observed between events. `save_maps`
    /// must have one entry per `settings.output_date_offsets`, in the same
    /// order; `sizes` collects this scenario's final fire size if it runs
    /// to completion.
    ///
    /// # Errors
    /// Returns [`FatalError`] on invariant violations (non-monotone event
    /// time, ignition landing in non-fuel), or
    /// [`RecoverableCondition::Cancelled`] if cancelled mid-run.
    pub fn run(&mut self, save_maps: &mut [ProbabilityMap], sizes: &SafeVector) -> Result<(), SimError> {
        loop {
            if self.cancelled || self.shared_cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(RecoverableCondition::Cancelled.into());
            }
            let Some(event) = self.scheduler.pop()? else {
                return Ok(());
            };
            match event {
                Event::NewFire { time, cell } => self.handle_new_fire(time, cell)?,
                Event::FireSpread { time } => self.handle_fire_spread(time)?,
                Event::Save { time } => self.handle_save(time, save_maps, sizes),
                Event::EndSimulation { .. } => self.scheduler.clear(),
            }
        }
    }

    fn effective_min_ros(&self, day: i32, hour: i32) -> f64 {
        self.settings.minimum_ros.max(self.thresholds.spread_ros_at(self.start_day, day, hour))
    }

    fn spread_inputs(&self, weather: &FwiWeather, cell: Cell, nd: i32) -> SpreadInputs {
        SpreadInputs {
            isi: weather.isi,
            bui: weather.bui,
            wind_speed_kmh: weather.wind.speed_kmh,
            foliar_moisture: foliar_moisture(nd),
            percent_slope: cell.slope_percent(),
        }
    }

    fn handle_new_fire(&mut self, time: f64, cell: Location) -> Result<(), SimError> {
        let cell = if self.grid.can_burn(cell) {
            cell
        } else {
            self.grid
                .find_burnable_near(cell, self.settings.ignition_search_radius)
                .ok_or(FatalError::NoBurnableCellNearIgnition { row: cell.row(), col: cell.column() })?
        };

        self.intensity.ignite(cell, time);

        let this_hour = (time * 24.0).floor() as i32;
        let day = self.start_day + this_hour.div_euclid(24);
        let hour_of_day = this_hour.rem_euclid(24);
        let grid_cell = self.grid.cell_at(cell);
        let nd = self.weather.nd(this_hour);

        let survives = self.weather.daily(this_hour).is_some_and(|daily| {
            self.fuels.fuel(grid_cell.fuel_code()).is_some_and(|fuel| {
                let inputs = self.spread_inputs(&daily, grid_cell, nd);
                fuel.survival_probability(&inputs) >= self.thresholds.extinction_at(self.start_day, day, hour_of_day)
            })
        });

        self.points.clear();
        if survives {
            let centre = Offset::new(f64::from(cell.column()) + 0.5, f64::from(cell.row()) + 0.5);
            self.points.insert(CellPoints::with_point(centre));
        }

        self.scheduler.push(Event::FireSpread { time });
        Ok(())
    }

    fn handle_fire_spread(&mut self, time: f64) -> Result<(), SimError> {
        let this_hour = (time * 24.0).floor() as i32;
        let next_time = f64::from(this_hour + 1) / 24.0;
        let max_duration = (next_time - time) * 1440.0;

        let Some(hourly) = self.weather.hourly(this_hour) else {
            self.scheduler.push(Event::EndSimulation { time });
            return Ok(());
        };

        let day = self.start_day + this_hour.div_euclid(24);
        let hour_of_day = this_hour.rem_euclid(24);
        let min_ffmc = self.settings.minimum_ffmc_at(f64::from(hour_of_day));
        if hourly.ffmc < min_ffmc {
            self.scheduler.push(Event::FireSpread { time: next_time });
            return Ok(());
        }

        if self.current_hour != Some(this_hour) {
            self.spread_info.clear();
            self.max_ros = 0.0;
            self.current_hour = Some(this_hour);
        }

        let Some(daily) = self.weather.daily(this_hour) else {
            self.scheduler.push(Event::FireSpread { time: next_time });
            return Ok(());
        };
        let nd = self.weather.nd(this_hour);
        let min_ros = self.effective_min_ros(day, hour_of_day);

        let locations: Vec<Location> = self.points.locations().collect();
        let mut spreading: Vec<Location> = Vec::new();
        let mut non_spreading: Vec<Location> = Vec::new();
        for loc in locations {
            let cell = self.grid.cell_at(loc);
            let key = cell.spread_key();
            self.ensure_spread_info(key, cell, time, nd, &hourly, min_ros);
            let info = &self.spread_info[&key];
            if info.is_not_spreading() {
                non_spreading.push(loc);
            } else {
                spreading.push(loc);
                self.max_ros = self.max_ros.max(info.head_ros());
            }
        }

        if spreading.is_empty() {
            self.scheduler.push(Event::FireSpread { time: next_time });
            return Ok(());
        }

        let duration = max_duration.min(self.settings.max_spread_distance * self.grid.georef().cell_size_m / self.max_ros);
        let new_time = time + duration / 1440.0;

        let mut fresh = CellPointsMap::new();
        for &loc in &spreading {
            let key = self.grid.cell_at(loc).spread_key();
            let scaled: Vec<Offset> = self.spread_info[&key].offsets().iter().map(|o| o.scaled(duration)).collect();
            let Some(cp) = self.points.get(loc) else { continue };
            for point in cp.unique_points() {
                for (dest, dest_point) in apply_offsets(point, &scaled) {
                    if !self.grid.can_burn(dest) || self.unburnable.contains(&dest) {
                        continue;
                    }
                    let mut dest_cp = CellPoints::with_point(dest_point);
                    dest_cp.add_source(source_direction(dest, loc));
                    fresh.insert(dest_cp);
                }
            }
        }

        for &loc in &non_spreading {
            if self.unburnable.contains(&loc) {
                continue;
            }
            if let Some(cp) = self.points.get(loc) {
                fresh.insert(cp.clone());
            }
        }

        let mut final_map = CellPointsMap::new();
        let destinations: Vec<Location> = fresh.locations().collect();
        for dest in destinations {
            let dest_cell = self.grid.cell_at(dest);
            let key = dest_cell.spread_key();
            self.ensure_spread_info(key, dest_cell, time, nd, &hourly, min_ros);
            let max_intensity = self.spread_info[&key].max_intensity();

            if max_intensity > 0.0 {
                let head_ros = self.spread_info[&key].head_ros();
                let head_azimuth = self.spread_info[&key].head_azimuth_degrees();
                self.intensity.burn(dest, new_time, max_intensity.max(1.0), head_ros, head_azimuth);

                let survives = self.fuels.fuel(dest_cell.fuel_code()).is_some_and(|fuel| {
                    let inputs = self.spread_inputs(&daily, dest_cell, nd);
                    fuel.survival_probability(&inputs) >= self.thresholds.extinction_at(self.start_day, day, hour_of_day)
                });

                if !survives || self.intensity.is_surrounded(dest) {
                    self.unburnable.insert(dest);
                    continue;
                }
            }

            let Some(cp) = fresh.get(dest) else { continue };
            let points = cp.unique_points();
            if points.len() > 3 {
                let hull = convex_hull(&points);
                let mut reduced = CellPoints::empty();
                for p in hull {
                    reduced.insert(p);
                }
                reduced.add_source(cp.sources());
                final_map.insert(reduced);
            } else {
                final_map.insert(cp.clone());
            }
        }

        self.points = final_map;
        self.scheduler.push(Event::FireSpread { time: new_time });
        Ok(())
    }

    fn ensure_spread_info(&mut self, key: SpreadKey, cell: Cell, time: f64, nd: i32, weather: &FwiWeather, min_ros: f64) {
        if self.spread_info.contains_key(&key) {
            return;
        }
        let info = match self.fuels.fuel(cell.fuel_code()) {
            Some(fuel) => SpreadInfo::calculate(cell, time, nd, weather, fuel, self.algorithm, min_ros),
            None => SpreadInfo::calculate(cell, time, nd, weather, &NoFuel, self.algorithm, min_ros),
        };
        self.spread_info.insert(key, info);
    }

    fn handle_save(&mut self, time: f64, save_maps: &mut [ProbabilityMap], sizes: &SafeVector) {
        for (idx, &offset) in self.settings.output_date_offsets.iter().enumerate() {
            if f64::from(offset) == time {
                if let Some(map) = save_maps.get_mut(idx) {
                    map.add_probability(&self.intensity, self.fire_size_ha());
                }
            }
        }
        let last_offset = self.settings.output_date_offsets.iter().copied().max().unwrap_or(0);
        if f64::from(last_offset) == time {
            sizes.add_value(self.fire_size_ha());
        }
    }
}

/// Direction from `to` toward `from`, clamped to the immediate 8-neighbour
/// ring so [`relative_index`] never sees a delta outside `[-1, 1]` even
/// when a spread step's offsets jump a point more than one cell away in a
/// single step.
fn source_direction(to: Location, from: Location) -> DirectionMask {
    let dr = (from.row() - to.row()).clamp(-1, 1);
    let dc = (from.column() - to.column()).clamp(-1, 1);
    let synthetic = Location::new(to.row() + dr, to.column() + dc);
    relative_index(to, synthetic)
}

/// A placeholder fuel used only to produce a `head_ros < 0` ("not
/// spreading") [`SpreadInfo`] for cells whose fuel code has no entry in the
/// scenario's [`FuelLookup`]: such cells hold points (an ember landed there)
/// but never ignite.
struct NoFuel;

impl crate::fuel::FuelType for NoFuel {
    fn code(&self) -> u8 {
        crate::cell::NULL_FUEL_CODE
    }

    fn name(&self) -> &str {
        "none"
    }

    fn can_crown(&self) -> bool {
        false
    }

    fn rate_of_spread(&self, _inputs: &SpreadInputs) -> crate::fuel::RosResult {
        crate::fuel::RosResult { ros_m_per_min: 0.0, is_crowning: false }
    }

    fn length_to_breadth(&self, _wind_speed_kmh: f64) -> f64 {
        1.0
    }

    fn surface_fuel_consumption(&self, _bui: f64) -> f64 {
        0.0
    }

    fn crown_consumption(&self, _cfb: f64) -> f64 {
        0.0
    }

    fn critical_surface_intensity(&self, _foliar_moisture: f64) -> f64 {
        f64::INFINITY
    }

    fn bui_effect(&self, _bui: f64) -> f64 {
        1.0
    }

    fn survival_probability(&self, _inputs: &SpreadInputs) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuel::{C2Conifer, FuelType};
    use crate::grid::GeoReference;
    use crate::spread_algorithm::OriginalSpreadAlgorithm;
    use crate::weather::{ConstantWeather, Wind};

    struct OneFuelTable(C2Conifer);

    impl FuelLookup for OneFuelTable {
        fn fuel(&self, code: u8) -> Option<&dyn FuelType> {
            if code == self.0.code() {
                Some(&self.0)
            } else {
                None
            }
        }
    }

    fn flat_grid(size: usize) -> GridBase {
        let n = size * size;
        GridBase::new(size, size, GeoReference::new(0.0, 0.0, 100.0), vec![2u8; n], vec![100; n], vec![0; n], vec![0; n]).unwrap()
    }

    #[test]
    fn below_minimum_ffmc_burns_only_the_ignition_cell() {
        let grid = flat_grid(21);
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(70.0, 35.0, 275.0, Wind::new(20.0, 180.0), 100, 24);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 1.0 };
        let settings = Settings {
            deterministic: true,
            output_date_offsets: vec![1],
            minimum_ffmc: 80.0,
            minimum_ffmc_at_night: 80.0,
            ..Settings::default()
        };

        let start = Location::new(10, 10);
        let mut scenario = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 150, start);
        scenario.reset(1);
        let mut maps = vec![ProbabilityMap::new(settings.intensity_bands)];
        let sizes = SafeVector::new();
        scenario.run(&mut maps, &sizes).unwrap();

        assert_eq!(scenario.intensity().burned_cell_count(), 1);
    }

    #[test]
    fn deterministic_runs_are_reproducible() {
        let grid = flat_grid(41);
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(0.0, 180.0), 100, 24);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 1.0 };
        let settings = Settings {
            deterministic: true,
            output_date_offsets: vec![1],
            minimum_ffmc: 80.0,
            minimum_ffmc_at_night: 80.0,
            max_spread_distance: 1.0,
            ..Settings::default()
        };

        let start = Location::new(20, 20);

        let mut a = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 150, start);
        a.reset(1);
        let mut maps_a = vec![ProbabilityMap::new(settings.intensity_bands)];
        a.run(&mut maps_a, &SafeVector::new()).unwrap();

        let mut b = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 150, start);
        b.reset(1);
        let mut maps_b = vec![ProbabilityMap::new(settings.intensity_bands)];
        b.run(&mut maps_b, &SafeVector::new()).unwrap();

        assert_eq!(a.intensity().burned_cell_count(), b.intensity().burned_cell_count());
        assert_eq!(a.fire_size_ha(), b.fire_size_ha());
    }

    #[test]
    fn ignition_with_no_burnable_cell_in_search_radius_is_fatal() {
        let n = 25 * 25;
        let grid = GridBase::new(
            25,
            25,
            GeoReference::new(0.0, 0.0, 100.0),
            vec![crate::cell::NULL_FUEL_CODE; n],
            vec![100; n],
            vec![0; n],
            vec![0; n],
        )
        .unwrap();
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(10.0, 180.0), 100, 24);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 1.0 };
        let settings = Settings {
            deterministic: true,
            output_date_offsets: vec![1],
            ignition_search_radius: 3,
            ..Settings::default()
        };

        let start = Location::new(12, 12);
        let mut scenario = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 150, start);
        scenario.reset(1);
        let mut maps = vec![ProbabilityMap::new(settings.intensity_bands)];
        let result = scenario.run(&mut maps, &SafeVector::new());
        assert!(matches!(result, Err(SimError::Fatal(FatalError::NoBurnableCellNearIgnition { .. }))));
    }

    #[test]
    fn ignition_in_non_fuel_falls_back_to_nearest_burnable_cell() {
        let n = 5 * 5;
        let mut fuel = vec![2u8; n];
        fuel[2 * 5 + 2] = crate::cell::NULL_FUEL_CODE;
        let grid = GridBase::new(5, 5, GeoReference::new(0.0, 0.0, 100.0), fuel, vec![100; n], vec![0; n], vec![0; n]).unwrap();
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(10.0, 180.0), 100, 24);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 1.0 };
        let settings = Settings { deterministic: true, output_date_offsets: vec![1], ..Settings::default() };

        let start = Location::new(2, 2);
        let mut scenario = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 150, start);
        scenario.reset(1);
        let mut maps = vec![ProbabilityMap::new(settings.intensity_bands)];
        scenario.run(&mut maps, &SafeVector::new()).unwrap();
        assert_eq!(scenario.intensity().burned_cell_count(), 1);
    }

    #[test]
    fn cancellation_stops_before_completion() {
        let grid = flat_grid(61);
        let fuels = OneFuelTable(C2Conifer::new());
        let weather = ConstantWeather::new(92.0, 35.0, 275.0, Wind::new(15.0, 180.0), 100, 240);
        let algorithm = OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 1.0 };
        let settings = Settings { deterministic: true, output_date_offsets: vec![5], ..Settings::default() };

        let start = Location::new(30, 30);
        let mut scenario = Scenario::new(&grid, &fuels, &weather, &algorithm, &settings, 150, start);
        scenario.reset(1);
        scenario.cancel();
        let mut maps = vec![ProbabilityMap::new(settings.intensity_bands)];
        let result = scenario.run(&mut maps, &SafeVector::new());
        assert!(matches!(result, Err(SimError::Recoverable(RecoverableCondition::Cancelled))));
    }
}
