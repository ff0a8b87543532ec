//! Incremental statistic computation
//!
//! One accumulator per (group, field) pair. Values are folded in one at a
//! time; variance uses Welford's online algorithm.

use crate::types::StatisticKind;

/// Running state for every supported statistic over one field
#[derive(Debug, Clone)]
pub struct StatisticAccumulator {
    /// Sum of values
    sum: f64,

    /// Count of values
    count: u64,

    /// Minimum value
    min: f64,

    /// Maximum value
    max: f64,

    /// Running mean (Welford)
    mean: f64,

    /// Sum of squared differences from the mean
    m2: f64,
}

impl StatisticAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Fold in one value
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Merge another accumulator into this one (Chan et al.)
    pub fn merge(&mut self, other: &StatisticAccumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);

        let combined_count = self.count + other.count;
        let delta = other.mean - self.mean;
        let combined_m2 = self.m2
            + other.m2
            + delta * delta * (self.count * other.count) as f64 / combined_count as f64;

        self.sum += other.sum;
        self.count = combined_count;
        self.mean = self.sum / combined_count as f64;
        self.m2 = combined_m2;
    }

    /// Number of values folded in
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Final value of a statistic
    ///
    /// Count and Sum are defined for empty input (0). The others need at
    /// least one value. Sample deviation and variance of a single value are 0.
    pub fn finalize(&self, kind: StatisticKind) -> Option<f64> {
        let non_empty = self.count > 0;
        match kind {
            StatisticKind::Count => Some(self.count as f64),
            StatisticKind::Sum => Some(self.sum),
            StatisticKind::Average => non_empty.then(|| self.sum / self.count as f64),
            StatisticKind::Minimum => non_empty.then_some(self.min),
            StatisticKind::Maximum => non_empty.then_some(self.max),
            StatisticKind::Variance => non_empty.then(|| self.sample_variance()),
            StatisticKind::StandardDeviation => non_empty.then(|| self.sample_variance().sqrt()),
        }
    }

    fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

impl Default for StatisticAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
