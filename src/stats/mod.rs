//! Statistical reduction of speed test samples
//!
//! Every function here is total: empty input yields `0.0` and the caller's
//! slice is never mutated. Failed trials routinely shrink sample sets to
//! nothing, so none of these may panic or produce NaN.

pub mod running;

pub use running::{RunningMean, RunningMedian};

use std::cmp::Ordering;

/// Number of leading samples discarded by [`average_without_cold_start`] by default
pub const COLD_START_DROP: usize = 1;

/// Multiplier applied to the interquartile range when filtering outliers
pub const IQR_FENCE: f64 = 1.5;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Arithmetic mean, `0.0` for an empty slice
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of a sorted copy; the mean of the two central values for even lengths
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let sorted = sorted_copy(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Drop values outside `[Q1 - 1.5·IQR, Q3 + 1.5·IQR]`.
///
/// Quartiles are read straight from the sorted copy at `floor(n/4)` and
/// `floor(3n/4)` without interpolation. Two values or fewer carry no usable
/// spread and are returned as-is. Survivors keep their input order.
pub fn remove_outliers(values: &[f64]) -> Vec<f64> {
    if values.len() <= 2 {
        return values.to_vec();
    }

    let sorted = sorted_copy(values);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[(3 * n) / 4];
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    values
        .iter()
        .copied()
        .filter(|value| *value >= lower && *value <= upper)
        .collect()
}

/// Mean after skipping the first `drop_count` values.
///
/// At most `len - 1` values are skipped so a non-empty input always
/// contributes at least one value.
pub fn average_without_cold_start(values: &[f64], drop_count: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let start = drop_count.min(values.len() - 1);
    average(&values[start..])
}

/// Convert a transfer of `bytes` over `seconds` into Mbit/s.
///
/// Uses binary megabits (`bytes * 8 / 1024²`). Zero bytes or a non-positive
/// duration give `0.0`.
pub fn bytes_to_mbps(bytes: u64, seconds: f64) -> f64 {
    if bytes == 0 || !seconds.is_finite() || seconds <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / BYTES_PER_MEGABYTE / seconds
}

/// Payload length in bytes for a size given in megabytes
pub fn megabytes_to_bytes(size_mb: f64) -> usize {
    if !size_mb.is_finite() || size_mb <= 0.0 {
        return 0;
    }
    (size_mb * BYTES_PER_MEGABYTE).round() as usize
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}


#[cfg(test)]
mod comprehensive_tests;
