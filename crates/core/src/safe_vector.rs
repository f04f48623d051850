//! Mutex-guarded accumulator for per-scenario final fire sizes, shared
//! across the worker threads an [`crate::model::Model`] spawns.
//!
//! Values are appended from any thread and read back sorted for
//! [`crate::statistics::Statistics`], which requires sorted input.

use std::sync::Mutex;

/// A `Vec<f64>` behind a mutex, safe to share across scenario threads.
#[derive(Debug, Default)]
pub struct SafeVector {
    values: Mutex<Vec<f64>>,
}

impl SafeVector {
    #[must_use]
    pub fn new() -> Self {
        SafeVector { values: Mutex::new(Vec::new()) }
    }

    pub fn add_value(&self, value: f64) {
        self.values.lock().expect("SafeVector mutex poisoned").push(value);
    }

    /// A sorted snapshot of the values added so far.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        let mut v = self.values.lock().expect("SafeVector mutex poisoned").clone();
        v.sort_by(|a, b| a.partial_cmp(b).expect("fire sizes are never NaN"));
        v
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().expect("SafeVector mutex poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_returned_sorted() {
        let v = SafeVector::new();
        v.add_value(3.0);
        v.add_value(1.0);
        v.add_value(2.0);
        assert_eq!(v.values(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn len_matches_number_of_additions() {
        let v = SafeVector::new();
        v.add_value(1.0);
        v.add_value(1.0);
        assert_eq!(v.len(), 2);
    }

    #[test]
    fn concurrent_additions_are_all_recorded() {
        let v = SafeVector::new();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let v = &v;
                scope.spawn(move || v.add_value(f64::from(i)));
            }
        });
        assert_eq!(v.len(), 8);
    }
}
