//! Per-cell, per-hour FBP evaluation: combines fuel, weather, and slope
//! into a head rate of spread, resultant azimuth, peak intensity, and the
//! [`Offset`] set a [`crate::spread_algorithm::SpreadAlgorithm`] derives
//! from them.
//!
//! A `SpreadInfo` is built fresh for every distinct `(SpreadKey, hour)`
//! pair a scenario encounters and is invalid (`head_ros < 0`) when the
//! fuel's rate of spread doesn't clear the scenario's minimum ROS
//! threshold.

use crate::cell::Cell;
use crate::fuel::{FuelType, SpreadInputs};
use crate::point::Offset;
use crate::spread_algorithm::{HorizontalAdjustment, SpreadAlgorithm};
use crate::weather::{foliar_moisture, FwiWeather};

/// Result of evaluating fire behaviour in one cell for one hour.
#[derive(Debug, Clone)]
pub struct SpreadInfo {
    cell: Cell,
    time: f64,
    nd: i32,
    head_ros: f64,
    head_azimuth_degrees: f64,
    max_intensity: f64,
    offsets: Vec<Offset>,
}

/// Slope Factor (ST-X-3 eq 39): how much a percent slope multiplies the
/// flat-ground ISI-driven rate of spread.
fn slope_factor(percent_slope: u8) -> f64 {
    (3.533 * (f64::from(percent_slope) / 100.0).powf(1.2)).exp()
}

/// Combine a wind vector and an upslope vector (ST-X-3 eq 47-48's vector
/// addition, simplified: the slope contribution's magnitude is taken as
/// `wind_speed_kmh * (slope_factor - 1.0)` rather than iterating the
/// original's full wind-slope-vector solver) into one resultant azimuth.
fn resultant_azimuth(wind_direction_degrees: f64, wind_speed_kmh: f64, upslope_azimuth_degrees: f64, slope_weight: f64) -> f64 {
    if slope_weight <= 0.0 {
        return wind_direction_degrees;
    }
    let (wx, wy) = (wind_direction_degrees.to_radians().sin() * wind_speed_kmh, wind_direction_degrees.to_radians().cos() * wind_speed_kmh);
    let (sx, sy) = (
        upslope_azimuth_degrees.to_radians().sin() * slope_weight,
        upslope_azimuth_degrees.to_radians().cos() * slope_weight,
    );
    (wx + sx).atan2(wy + sy).to_degrees().rem_euclid(360.0)
}

impl SpreadInfo {
    /// Sentinel meaning "no spread": the fuel's rate of spread for this
    /// hour falls below `min_ros`.
    pub const NOT_SPREADING: f64 = -1.0;

    /// Evaluate fire behaviour for `cell` at `time`, given `weather` and
    /// `fuel`. Returns a non-spreading `SpreadInfo` if the resulting head
    /// ROS is below `min_ros`.
    #[must_use]
    pub fn calculate(
        cell: Cell,
        time: f64,
        nd: i32,
        weather: &FwiWeather,
        fuel: &dyn FuelType,
        algorithm: &dyn SpreadAlgorithm,
        min_ros: f64,
    ) -> Self {
        let slope_percent = cell.spread_key().slope_percent();
        let aspect_degrees = cell.spread_key().aspect_degrees();
        let foliar_moisture_content = foliar_moisture(nd);

        let sf = slope_factor(slope_percent);
        let inputs = SpreadInputs {
            isi: weather.isi * sf,
            bui: weather.bui,
            wind_speed_kmh: weather.wind.speed_kmh,
            foliar_moisture: foliar_moisture_content,
            percent_slope: slope_percent,
        };
        let ros = fuel.rate_of_spread(&inputs);

        if ros.ros_m_per_min < min_ros {
            return SpreadInfo::not_spreading(cell, time, nd);
        }

        let upslope_azimuth = (f64::from(aspect_degrees) + 180.0).rem_euclid(360.0);
        let raz_degrees = if slope_percent == 0 {
            weather.wind.direction_degrees
        } else {
            resultant_azimuth(weather.wind.direction_degrees, weather.wind.speed_kmh, upslope_azimuth, weather.wind.speed_kmh * (sf - 1.0))
        };

        let length_to_breadth = fuel.length_to_breadth(weather.wind.speed_kmh);
        // Backing rate of spread (ST-X-3 eq 89), using wind speed as a
        // stand-in for the full wind-slope vector magnitude.
        let back_ros = ros.ros_m_per_min * (-0.05039 * weather.wind.speed_kmh).exp();

        let correction = HorizontalAdjustment::new(upslope_azimuth, slope_percent);
        let offsets = algorithm.calculate_offsets(&correction, raz_degrees.to_radians(), ros.ros_m_per_min, back_ros, length_to_breadth);

        let sfc = fuel.surface_fuel_consumption(weather.bui);
        // Total Fuel Consumption (ST-X-3 eq 66/69): full crown consumption
        // assumed once crowning starts, rather than scaling by Crown
        // Fraction Burned.
        let tfc = if ros.is_crowning { sfc + fuel.crown_consumption(1.0) } else { sfc };
        let max_intensity = 300.0 * tfc * ros.ros_m_per_min;

        SpreadInfo {
            cell,
            time,
            nd,
            head_ros: ros.ros_m_per_min,
            head_azimuth_degrees: raz_degrees,
            max_intensity,
            offsets,
        }
    }

    fn not_spreading(cell: Cell, time: f64, nd: i32) -> Self {
        SpreadInfo {
            cell,
            time,
            nd,
            head_ros: Self::NOT_SPREADING,
            head_azimuth_degrees: 0.0,
            max_intensity: 0.0,
            offsets: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_not_spreading(&self) -> bool {
        self.head_ros < 0.0
    }

    #[must_use]
    pub fn cell(&self) -> Cell {
        self.cell
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    #[must_use]
    pub fn nd(&self) -> i32 {
        self.nd
    }

    #[must_use]
    pub fn head_ros(&self) -> f64 {
        self.head_ros
    }

    #[must_use]
    pub fn head_azimuth_degrees(&self) -> f64 {
        self.head_azimuth_degrees
    }

    #[must_use]
    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    #[must_use]
    pub fn offsets(&self) -> &[Offset] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::SpreadKey;
    use crate::fuel::C2Conifer;
    use crate::location::Location;
    use crate::spread_algorithm::OriginalSpreadAlgorithm;
    use crate::weather::{FwiWeather, Wind};

    fn weather(wind_speed: f64, ffmc: f64) -> FwiWeather {
        FwiWeather::derive(20.0, 40.0, Wind::new(wind_speed, 270.0), 0.0, ffmc, 30.0, 200.0)
    }

    fn algorithm() -> OriginalSpreadAlgorithm {
        OriginalSpreadAlgorithm { max_angle_degrees: 10.0, cell_size_m: 100.0, min_ros: 1.0 }
    }

    #[test]
    fn below_minimum_ros_is_not_spreading() {
        let cell = Cell::new(Location::new(0, 0), SpreadKey::new(0, 0, 2));
        let fuel = C2Conifer::default();
        let algorithm = algorithm();
        let info = SpreadInfo::calculate(cell, 0.0, 100, &weather(0.0, 50.0), &fuel, &algorithm, 1_000_000.0);
        assert!(info.is_not_spreading());
        assert!(info.offsets().is_empty());
    }

    #[test]
    fn normal_conditions_produce_spread_offsets() {
        let cell = Cell::new(Location::new(0, 0), SpreadKey::new(0, 0, 2));
        let fuel = C2Conifer::default();
        let algorithm = algorithm();
        let info = SpreadInfo::calculate(cell, 0.0, 100, &weather(20.0, 92.0), &fuel, &algorithm, 0.0);
        assert!(!info.is_not_spreading());
        assert!(!info.offsets().is_empty());
        assert!(info.max_intensity() > 0.0);
    }

    #[test]
    fn slope_increases_head_ros_versus_flat_ground() {
        let flat = Cell::new(Location::new(0, 0), SpreadKey::new(0, 0, 2));
        let sloped = Cell::new(Location::new(0, 0), SpreadKey::new(40, 270, 2));
        let fuel = C2Conifer::default();
        let algorithm = algorithm();
        let w = weather(15.0, 92.0);
        let flat_info = SpreadInfo::calculate(flat, 0.0, 100, &w, &fuel, &algorithm, 0.0);
        let sloped_info = SpreadInfo::calculate(sloped, 0.0, 100, &w, &fuel, &algorithm, 0.0);
        assert!(sloped_info.head_ros() > flat_info.head_ros());
    }
}
