//! Error types for the simulation core.
//!
//! Three error kinds: fatal conditions abort the whole run, recoverable
//! conditions are attached to the scenario or iteration that hit them and
//! do not stop anything else, and diagnostics are just log records (see the
//! `tracing` calls throughout this crate).

use std::fmt;

/// Conditions that abort the entire simulation run.
#[derive(Debug, Clone, PartialEq)]
pub enum FatalError {
    /// A fuel grid was not supplied, or a lookup against it failed.
    MissingFuelGrid,
    /// Two input rasters disagree on cell size, dimensions, or projection.
    ProjectionMismatch(String),
    /// The weather file's header or stream layout didn't match expectations.
    WeatherHeaderMismatch(String),
    /// An ignition point has no burnable cell within the search radius.
    NoBurnableCellNearIgnition { row: i32, col: i32 },
    /// An event was scheduled at a time earlier than the one just processed.
    NonMonotoneEventTime { previous: f64, attempted: f64 },
    /// A cell that was already marked burned was burned again.
    ReburnedCell { row: i32, col: i32 },
    /// A raster or grid dimension exceeded the supported range.
    GridTooLarge { rows: usize, columns: usize },
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::MissingFuelGrid => write!(f, "fuel grid is missing or unreadable"),
            FatalError::ProjectionMismatch(msg) => write!(f, "projection mismatch: {msg}"),
            FatalError::WeatherHeaderMismatch(msg) => write!(f, "weather header mismatch: {msg}"),
            FatalError::NoBurnableCellNearIgnition { row, col } => write!(
                f,
                "no burnable cell found near ignition at ({row}, {col})"
            ),
            FatalError::NonMonotoneEventTime { previous, attempted } => write!(
                f,
                "event time went backwards: previous {previous}, attempted {attempted}"
            ),
            FatalError::ReburnedCell { row, col } => {
                write!(f, "cell ({row}, {col}) was burned a second time")
            }
            FatalError::GridTooLarge { rows, columns } => write!(
                f,
                "grid {rows}x{columns} exceeds the maximum of {} cells per side",
                crate::location::MAX_ROWS
            ),
        }
    }
}

impl std::error::Error for FatalError {}

/// Conditions that end one scenario or iteration early without affecting
/// anything else running concurrently.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoverableCondition {
    /// The scenario ran out of wall-clock time before reaching `END_SIMULATION`.
    OutOfTime,
    /// Every burning point in the scenario went out (extinction or surround).
    FireExtinguished,
    /// The scenario or iteration was cancelled by the driver.
    Cancelled,
}

impl fmt::Display for RecoverableCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverableCondition::OutOfTime => write!(f, "scenario ran out of time"),
            RecoverableCondition::FireExtinguished => write!(f, "fire went out"),
            RecoverableCondition::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Top level error type returned from fallible core operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// See [`FatalError`]. The caller should abort the run with this message.
    Fatal(FatalError),
    /// See [`RecoverableCondition`]. The caller should drop only the affected
    /// scenario/iteration and continue.
    Recoverable(RecoverableCondition),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Fatal(e) => write!(f, "fatal: {e}"),
            SimError::Recoverable(e) => write!(f, "recoverable: {e}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<FatalError> for SimError {
    fn from(e: FatalError) -> Self {
        SimError::Fatal(e)
    }
}

impl From<RecoverableCondition> for SimError {
    fn from(e: RecoverableCondition) -> Self {
        SimError::Recoverable(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_displays_with_context() {
        let e = FatalError::ReburnedCell { row: 3, col: 4 };
        assert!(e.to_string().contains("(3, 4)"));
    }

    #[test]
    fn conversions_roundtrip_into_sim_error() {
        let e: SimError = RecoverableCondition::OutOfTime.into();
        assert_eq!(e, SimError::Recoverable(RecoverableCondition::OutOfTime));
    }
}
