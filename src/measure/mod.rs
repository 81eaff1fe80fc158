//! Measurement engine: single trials and their aggregation

pub mod aggregate;
pub mod progress;
pub mod trial;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::{trim_first_and_last, AggregationPlan, MetricAggregator};
pub use progress::{ProgressEvent, ProgressReporter};
pub use trial::{create_upload_payload, generate_upload_payload, TrialRunner, TrialTimeouts};
