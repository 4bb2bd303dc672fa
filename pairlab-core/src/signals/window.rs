//! Fixed-capacity rolling window over log-spread values.
//!
//! Mean and variance come from a running sum and sum-of-squares, updated in
//! O(1) per push. The sums are kept relative to an anchor value (a value that
//! was in the window at the last resync), which keeps the magnitudes small and
//! makes a constant series produce exactly zero variance. Every
//! `RESYNC_INTERVAL` pushes the sums are recomputed directly from the buffer to
//! bound floating-point drift.
//!
//! Uses population variance (divide by N).

use std::collections::VecDeque;

/// Number of pushes between direct recomputations of the running sums.
pub const RESYNC_INTERVAL: usize = 512;

/// Running variance below this is re-derived with an exact two-pass sum before
/// it is trusted, so a window of identical values reports exactly zero.
const RECOMPUTE_BELOW: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct SpreadWindow {
    capacity: usize,
    values: VecDeque<f64>,
    anchor: f64,
    sum: f64,
    sum_sq: f64,
    pushes_since_resync: usize,
}

impl SpreadWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "SpreadWindow capacity must be >= 1");
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
            anchor: 0.0,
            sum: 0.0,
            sum_sq: 0.0,
            pushes_since_resync: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True once `capacity` values have been observed.
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Push a value, evicting the oldest once capacity is exceeded.
    pub fn push(&mut self, value: f64) {
        if self.values.is_empty() {
            self.anchor = value;
        }

        let d = value - self.anchor;
        self.values.push_back(value);
        self.sum += d;
        self.sum_sq += d * d;

        if self.values.len() > self.capacity {
            if let Some(old) = self.values.pop_front() {
                let od = old - self.anchor;
                self.sum -= od;
                self.sum_sq -= od * od;
            }
        }

        self.pushes_since_resync += 1;
        if self.pushes_since_resync >= RESYNC_INTERVAL {
            self.resync();
        }
    }

    /// Recompute the running sums directly from the buffer.
    pub fn resync(&mut self) {
        self.anchor = self.values.front().copied().unwrap_or(0.0);
        let anchor = self.anchor;
        let (sum, sum_sq) = self.values.iter().fold((0.0, 0.0), |(s, sq), &v| {
            let d = v - anchor;
            (s + d, sq + d * d)
        });
        self.sum = sum;
        self.sum_sq = sum_sq;
        self.pushes_since_resync = 0;
    }

    /// Mean of the window, `None` until the window is full.
    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        Some(self.anchor + self.sum / self.values.len() as f64)
    }

    /// Population variance of the window, `None` until the window is full.
    pub fn variance(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }
        let n = self.values.len() as f64;
        let m = self.sum / n;
        let running = (self.sum_sq / n - m * m).max(0.0);
        if running < RECOMPUTE_BELOW {
            return Some(self.exact_variance());
        }
        Some(running)
    }

    /// Population standard deviation, `None` until the window is full.
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Two-pass variance relative to the oldest value.
    fn exact_variance(&self) -> f64 {
        let Some(&first) = self.values.front() else {
            return 0.0;
        };
        let n = self.values.len() as f64;
        let mean_d = self.values.iter().map(|v| v - first).sum::<f64>() / n;
        self.values
            .iter()
            .map(|v| {
                let diff = (v - first) - mean_d;
                diff * diff
            })
            .sum::<f64>()
            / n
    }
}
