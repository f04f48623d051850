//! Confidence-interval and Student's-t convergence machinery for the
//! Monte-Carlo driver, including a 100-entry Student's-t critical value
//! table (two-tailed, 95% column, degrees of freedom 1..=100).

/// Critical values of Student's-t distribution at `df = index + 1`.
#[rustfmt::skip]
const T_VALUES: [f64; 100] = [
    3.078, 1.886, 1.638, 1.533, 1.476, 1.440, 1.415, 1.397, 1.383, 1.372,
    1.363, 1.356, 1.350, 1.345, 1.341, 1.337, 1.333, 1.330, 1.328, 1.325,
    1.323, 1.321, 1.319, 1.318, 1.316, 1.315, 1.314, 1.313, 1.311, 1.310,
    1.309, 1.309, 1.308, 1.307, 1.306, 1.306, 1.305, 1.304, 1.304, 1.303,
    1.303, 1.302, 1.302, 1.301, 1.301, 1.300, 1.300, 1.299, 1.299, 1.299,
    1.298, 1.298, 1.298, 1.297, 1.297, 1.297, 1.297, 1.296, 1.296, 1.296,
    1.296, 1.295, 1.295, 1.295, 1.295, 1.295, 1.294, 1.294, 1.294, 1.294,
    1.294, 1.293, 1.293, 1.293, 1.293, 1.293, 1.293, 1.292, 1.292, 1.292,
    1.292, 1.292, 1.292, 1.292, 1.291, 1.291, 1.291, 1.291, 1.291, 1.291,
    1.291, 1.291, 1.291, 1.290, 1.290, 1.290, 1.290, 1.290, 1.290, 1.290,
];

/// Summary statistics over a sorted sample of final fire sizes, used by
/// the driver to decide whether enough scenarios have run: it stops once
/// the relative confidence interval on mean fire size falls below the
/// requested threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    n: usize,
    min: f64,
    max: f64,
    median: f64,
    mean: f64,
    standard_deviation: f64,
    sample_variance: f64,
}

impl Statistics {
    /// Computes statistics over `sorted_values`. Input must already be
    /// sorted ascending (callers get this for free from
    /// [`crate::safe_vector::SafeVector::values`]).
    ///
    /// # Panics
    /// Panics if `sorted_values` is empty.
    #[must_use]
    pub fn new(sorted_values: &[f64]) -> Self {
        assert!(!sorted_values.is_empty(), "Statistics requires at least one value");
        let n = sorted_values.len();
        let min = sorted_values[0];
        let max = sorted_values[n - 1];
        let median = percentile(sorted_values, 50);
        let mean = sorted_values.iter().sum::<f64>() / n as f64;
        let standard_deviation = if n > 0 {
            (sorted_values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
        } else {
            0.0
        };
        let sample_variance = if n > 1 {
            sorted_values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        Statistics { n, min, max, median, mean, standard_deviation, sample_variance }
    }

    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.median
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }

    #[must_use]
    pub fn sample_variance(&self) -> f64 {
        self.sample_variance
    }

    /// Half-width of the confidence interval on the mean at standard
    /// score `z`, expressed relative to the mean.
    #[must_use]
    pub fn confidence_interval(&self, z: f64) -> f64 {
        z * self.standard_deviation / (self.n as f64).sqrt() / self.mean.abs()
    }

    #[must_use]
    pub fn confidence_interval_80(&self) -> f64 {
        self.confidence_interval(1.28)
    }

    #[must_use]
    pub fn confidence_interval_90(&self) -> f64 {
        self.confidence_interval(1.645)
    }

    #[must_use]
    pub fn confidence_interval_95(&self) -> f64 {
        self.confidence_interval(1.96)
    }

    #[must_use]
    pub fn confidence_interval_98(&self) -> f64 {
        self.confidence_interval(2.33)
    }

    #[must_use]
    pub fn confidence_interval_99(&self) -> f64 {
        self.confidence_interval(2.58)
    }

    /// Relative Student's-t margin on the mean, using the sample variance
    /// and the two-tailed 95% critical value for `n` degrees of freedom.
    #[must_use]
    pub fn students_t(&self) -> f64 {
        students_t_for(self.n, self.sample_variance, self.mean)
    }

    /// Whether the current sample already satisfies `relative_error`,
    /// i.e. the confidence stopping rule.
    #[must_use]
    pub fn is_confident(&self, relative_error: f64) -> bool {
        self.students_t() <= relative_error / (1.0 + relative_error)
    }

    /// Estimated number of *additional* runs needed to bring the
    /// Student's-t margin down to `relative_error`, found by a binary
    /// search over hypothetical sample sizes between `n` and `10 * n`
    /// that holds `sample_variance`/`mean` fixed (same approximation
    /// `Statistics.h` uses: variance/mean are assumed to stay roughly
    /// constant as more scenarios are added).
    #[must_use]
    pub fn runs_required(&self, relative_error: f64) -> usize {
        if self.is_confident(relative_error) || self.n == 0 {
            return 0;
        }
        let mut lo = self.n;
        let mut hi = 10 * self.n.max(1);
        while students_t_for(hi, self.sample_variance, self.mean) > relative_error && hi < usize::MAX / 2 {
            lo = hi;
            hi *= 10;
        }
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if students_t_for(mid, self.sample_variance, self.mean) <= relative_error {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        hi - self.n
    }
}

fn students_t_for(n: usize, sample_variance: f64, mean: f64) -> f64 {
    if mean == 0.0 {
        return f64::INFINITY;
    }
    let t = T_VALUES[n.clamp(1, 100) - 1];
    t * (sample_variance / n as f64).sqrt() / mean.abs()
}

/// Linear-interpolation-free nearest-rank percentile, matching
/// `Statistics.h`'s `truncl((i / 100.0) * n)` indexing scheme.
fn percentile(sorted_values: &[f64], pct: usize) -> f64 {
    let n = sorted_values.len();
    let idx = ((pct as f64 / 100.0) * n as f64) as usize;
    sorted_values[idx.min(n - 1)]
}

/// 95th percentile of one iteration's sorted fire sizes, the per-iteration
/// value the driver's `pct` series accumulates (spec.md's
/// `runsRequired_for_pct` criterion).
#[must_use]
pub fn percentile_95(sorted_values: &[f64]) -> f64 {
    percentile(sorted_values, 95)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_median_of_simple_sample() {
        let stats = Statistics::new(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(stats.mean(), 3.0);
        assert_eq!(stats.median(), 3.0);
        assert_eq!(stats.min(), 1.0);
        assert_eq!(stats.max(), 5.0);
    }

    #[test]
    fn standard_deviation_is_population_variant() {
        let stats = Statistics::new(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.standard_deviation() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn sample_variance_divides_by_n_minus_one() {
        let stats = Statistics::new(&[1.0, 2.0, 3.0]);
        assert!((stats.sample_variance() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn single_value_sample_has_zero_spread() {
        let stats = Statistics::new(&[42.0]);
        assert_eq!(stats.standard_deviation(), 0.0);
        assert_eq!(stats.sample_variance(), 0.0);
    }

    #[test]
    fn tight_sample_is_confident_at_loose_threshold() {
        let values: Vec<f64> = (0..50).map(|_| 100.0).collect();
        let stats = Statistics::new(&values);
        assert!(stats.is_confident(0.1));
        assert_eq!(stats.runs_required(0.1), 0);
    }

    #[test]
    fn noisy_small_sample_requires_more_runs() {
        let values = vec![10.0, 90.0, 5.0, 120.0, 2.0];
        let stats = Statistics::new(&values);
        assert!(!stats.is_confident(0.01));
        assert!(stats.runs_required(0.01) > 0);
    }
}
