//! Property-based tests for the statistics functions

use super::*;
use proptest::collection::vec;
use proptest::prelude::*;

mod generators {
    use super::*;

    /// Throughput- or latency-like positive values
    pub fn positive_floats() -> impl Strategy<Value = f64> {
        0.001f64..100000.0
    }

    pub fn number_vectors() -> impl Strategy<Value = Vec<f64>> {
        vec(positive_floats(), 0..200)
    }

    pub fn non_empty_vectors() -> impl Strategy<Value = Vec<f64>> {
        vec(positive_floats(), 1..200)
    }
}

proptest! {
    /// Results are always finite numbers
    #[test]
    fn functions_never_return_nan(numbers in generators::number_vectors(), drop in 0usize..10) {
        prop_assert!(average(&numbers).is_finite());
        prop_assert!(median(&numbers).is_finite());
        prop_assert!(average_without_cold_start(&numbers, drop).is_finite());
        prop_assert!(remove_outliers(&numbers).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn average_invariant_under_reordering(numbers in generators::non_empty_vectors()) {
        let mut reversed = numbers.clone();
        reversed.reverse();
        let a = average(&numbers);
        let b = average(&reversed);
        prop_assert!((a - b).abs() <= a.abs() * 1e-9 + 1e-9);
    }

    #[test]
    fn mean_and_median_between_min_max(numbers in generators::non_empty_vectors()) {
        let min = numbers.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = numbers.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let mean = average(&numbers);
        let mid = median(&numbers);

        prop_assert!(mean >= min - 1e-6 && mean <= max + 1e-6);
        prop_assert!(mid >= min && mid <= max);
    }

    #[test]
    fn remove_outliers_never_grows(numbers in generators::number_vectors()) {
        let filtered = remove_outliers(&numbers);
        prop_assert!(filtered.len() <= numbers.len());
        if numbers.len() <= 2 {
            prop_assert_eq!(filtered, numbers);
        }
    }

    #[test]
    fn remove_outliers_is_an_ordered_subsequence(numbers in generators::number_vectors()) {
        let filtered = remove_outliers(&numbers);
        let mut source = numbers.iter();
        for value in &filtered {
            prop_assert!(source.any(|candidate| candidate == value));
        }
    }

    #[test]
    fn cold_start_average_consumes_at_least_one(numbers in generators::non_empty_vectors(), drop in 0usize..400) {
        let value = average_without_cold_start(&numbers, drop);
        let min = numbers.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        prop_assert!(value >= min - 1e-6);
    }

    #[test]
    fn throughput_monotonic_in_bytes(bytes in 1u64..1_000_000_000, extra in 1u64..1_000_000, secs in 0.001f64..100.0) {
        prop_assert!(bytes_to_mbps(bytes + extra, secs) > bytes_to_mbps(bytes, secs));
    }

    #[test]
    fn throughput_monotonic_in_seconds(bytes in 1u64..1_000_000_000, secs in 0.001f64..100.0, extra in 0.001f64..100.0) {
        prop_assert!(bytes_to_mbps(bytes, secs + extra) < bytes_to_mbps(bytes, secs));
    }

    #[test]
    fn throughput_zero_for_non_positive_seconds(bytes in 0u64..1_000_000_000, secs in -100.0f64..=0.0) {
        prop_assert_eq!(bytes_to_mbps(bytes, secs), 0.0);
    }
}

#[test]
fn test_cluster_with_single_extreme_value() {
    let values = [50.0, 52.0, 51.0, 49.0, 48.0, 53.0, 50.5, 2.0];
    let filtered = remove_outliers(&values);
    assert!(!filtered.contains(&2.0));
    assert_eq!(filtered.len(), 7);
}

#[test]
fn test_identical_values_survive_filtering() {
    let values = [25.0; 6];
    assert_eq!(remove_outliers(&values), values.to_vec());
    assert_eq!(median(&values), 25.0);
}
