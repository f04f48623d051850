//! Per-scenario Monte-Carlo threshold arrays.
//!
//! Every scenario draws its own extinction/spread threshold arrays from a
//! seeded PRNG, combining a general (once per stream), daily, and hourly
//! draw into a weighted survival probability per hour, using `rand_chacha`
//! for a reproducible, seedable stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Relative weights for the general/daily/hourly draws that make up one
/// threshold weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdWeights {
    pub general: f64,
    pub daily: f64,
    pub hourly: f64,
}

impl Default for ThresholdWeights {
    fn default() -> Self {
        ThresholdWeights { general: 1.0, daily: 1.0, hourly: 1.0 }
    }
}

/// Inverse of the spread-event probability function:
/// `(25/4) * ln(-(e^(41/25) * p) / (p - 1))`, with `p=1 -> +inf` and
/// `p=0 -> 0.0` as exact fixups rather than letting the formula produce
/// `NaN`/`-NaN` at those endpoints.
#[must_use]
pub fn inverse_spread_prob(p: f64) -> f64 {
    if p >= 1.0 {
        return f64::INFINITY;
    }
    if p <= 0.0 {
        return 0.0;
    }
    25.0 / 4.0 * (-((41.0_f64 / 25.0).exp() * p) / (p - 1.0)).ln()
}

/// Per-scenario extinction and spread-ROS threshold arrays, one entry per
/// hour across the scenario's day range, indexed by `(day - start_day) *
/// 24 + hour`.
#[derive(Debug, Clone)]
pub struct ThresholdArrays {
    pub extinction: Vec<f64>,
    pub spread_ros: Vec<f64>,
}

impl ThresholdArrays {
    #[must_use]
    pub fn hour_index(start_day: i32, day: i32, hour: i32) -> usize {
        debug_assert!(day >= start_day);
        debug_assert!((0..24).contains(&hour));
        ((day - start_day) * 24 + hour) as usize
    }

    /// Build both arrays for the day range `[start_day, last_day]` using
    /// two independent seed sequences per iteration, one for extinction and
    /// one for spread.
    #[must_use]
    pub fn generate(seed: u64, start_day: i32, last_day: i32, weights: ThresholdWeights) -> Self {
        let len = ((last_day - start_day + 2) * 24) as usize;
        let mut extinction_rng = ChaCha8Rng::seed_from_u64(seed);
        let mut spread_rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        let extinction = draw_hourly_weights(&mut extinction_rng, start_day, last_day, weights)
            .into_iter()
            .map(|w| (1.0 - w).clamp(0.0, 1.0))
            .collect::<Vec<_>>();
        let spread_ros = draw_hourly_weights(&mut spread_rng, start_day, last_day, weights)
            .into_iter()
            .map(|w| inverse_spread_prob((1.0 - w).clamp(0.0, 1.0)))
            .collect::<Vec<_>>();
        debug_assert_eq!(extinction.len(), len);
        debug_assert_eq!(spread_ros.len(), len);
        ThresholdArrays { extinction, spread_ros }
    }

    /// A deterministic variant that skips the PRNG entirely: every cell
    /// survives and every ROS threshold is zero.
    #[must_use]
    pub fn deterministic(start_day: i32, last_day: i32) -> Self {
        let len = ((last_day - start_day + 2) * 24) as usize;
        ThresholdArrays {
            extinction: vec![0.0; len],
            spread_ros: vec![0.0; len],
        }
    }

    #[must_use]
    pub fn extinction_at(&self, start_day: i32, day: i32, hour: i32) -> f64 {
        self.extinction[Self::hour_index(start_day, day, hour)]
    }

    #[must_use]
    pub fn spread_ros_at(&self, start_day: i32, day: i32, hour: i32) -> f64 {
        self.spread_ros[Self::hour_index(start_day, day, hour)]
    }
}

fn draw_hourly_weights(rng: &mut ChaCha8Rng, start_day: i32, last_day: i32, weights: ThresholdWeights) -> Vec<f64> {
    let total = weights.general + weights.daily + weights.hourly;
    let mut out = Vec::with_capacity((((last_day - start_day + 2) * 24) as usize).max(24));
    let general: f64 = rng.random();
    for day in start_day..=last_day + 1 {
        let daily: f64 = rng.random();
        for _hour in 0..24 {
            let hourly: f64 = rng.random();
            let w = if total > 0.0 {
                (weights.general * general + weights.daily * daily + weights.hourly * hourly) / total
            } else {
                0.5
            };
            out.push(w);
        }
        let _ = day;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_spread_prob_endpoints() {
        assert_eq!(inverse_spread_prob(1.0), f64::INFINITY);
        assert_eq!(inverse_spread_prob(0.0), 0.0);
    }

    #[test]
    fn inverse_spread_prob_is_finite_in_between() {
        let v = inverse_spread_prob(0.5);
        assert!(v.is_finite());
        assert!(v > 0.0);
    }

    #[test]
    fn same_seed_produces_identical_arrays() {
        let a = ThresholdArrays::generate(42, 150, 151, ThresholdWeights::default());
        let b = ThresholdArrays::generate(42, 150, 151, ThresholdWeights::default());
        assert_eq!(a.extinction, b.extinction);
        assert_eq!(a.spread_ros, b.spread_ros);
    }

    #[test]
    fn different_seeds_usually_differ() {
        let a = ThresholdArrays::generate(1, 150, 151, ThresholdWeights::default());
        let b = ThresholdArrays::generate(2, 150, 151, ThresholdWeights::default());
        assert_ne!(a.extinction, b.extinction);
    }

    #[test]
    fn deterministic_mode_is_all_zeros() {
        let arr = ThresholdArrays::deterministic(150, 151);
        assert!(arr.extinction.iter().all(|&v| v == 0.0));
        assert!(arr.spread_ros.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn array_length_matches_day_range_plus_two() {
        let arr = ThresholdArrays::generate(7, 100, 103, ThresholdWeights::default());
        assert_eq!(arr.extinction.len(), (103 - 100 + 2) * 24);
    }
}
