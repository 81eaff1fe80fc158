//! Incremental trackers for values that arrive one cycle at a time

use super::median;

/// Running mean over a stream of values
#[derive(Debug, Clone, Default)]
pub struct RunningMean {
    total_sum: f64,
    count: usize,
    min_value: Option<f64>,
    max_value: Option<f64>,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, value: f64) {
        self.total_sum += value;
        self.count += 1;
        self.min_value = Some(self.min_value.map_or(value, |min| min.min(value)));
        self.max_value = Some(self.max_value.map_or(value, |max| max.max(value)));
    }

    /// Current mean, `0.0` before the first value
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_sum / self.count as f64
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        self.min_value
    }

    pub fn max(&self) -> Option<f64> {
        self.max_value
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Running median; keeps every value since the median needs the full set
#[derive(Debug, Clone, Default)]
pub struct RunningMedian {
    values: Vec<f64>,
}

impl RunningMedian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn median(&self) -> f64 {
        median(&self.values)
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}
