//! Probabilistic wildland fire growth simulation core.
//!
//! Implements the Canadian Forest Fire Behavior Prediction (FBP) system
//! driving an event-based per-scenario spread simulator, aggregated across
//! a Monte-Carlo ensemble of stochastic realizations into per-cell burn
//! probabilities and fire-size statistics.

pub mod cell;
pub mod cell_points;
pub mod cell_points_map;
pub mod error;
pub mod event;
pub mod fuel;
pub mod grid;
pub mod hull;
pub mod intensity_map;
pub mod iteration;
pub mod location;
pub mod model;
pub mod point;
pub mod probability_map;
pub mod safe_vector;
pub mod scenario;
pub mod settings;
pub mod spread_algorithm;
pub mod spread_info;
pub mod statistics;
pub mod threshold;
pub mod weather;

pub use cell::{Cell, SpreadKey, NULL_FUEL_CODE};
pub use error::{FatalError, RecoverableCondition, SimError};
pub use fuel::{FuelLookup, FuelType, RosResult, SpreadInputs};
pub use grid::{GeoReference, GridBase};
pub use intensity_map::IntensityMap;
pub use iteration::Iteration;
pub use location::{Direction, DirectionMask, Location};
pub use model::Model;
pub use probability_map::{IntensityBands, ProbabilityMap};
pub use safe_vector::SafeVector;
pub use scenario::Scenario;
pub use settings::Settings;
pub use spread_algorithm::SpreadAlgorithm;
pub use spread_info::SpreadInfo;
pub use statistics::Statistics;
pub use threshold::{ThresholdArrays, ThresholdWeights};
pub use weather::{ConstantWeather, FireWeather, FwiWeather, Wind};
