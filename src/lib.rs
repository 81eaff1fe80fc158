//! Network Speed Tester
//!
//! An HTTP speed measurement engine that estimates download throughput,
//! upload throughput and round-trip latency against a cooperating speed
//! test server, reducing noisy trials with outlier removal and cold-start
//! discounting.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod measure;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use client::{HttpTransport, SpeedTransport};
pub use error::{AppError, Result};
pub use executor::SpeedTestExecutor;
pub use logging::{EventSink, Logger, NoopSink};
pub use measure::{MetricAggregator, ProgressEvent, TrialRunner};
pub use models::{Config, MetricAggregate, SeriesReport, SpeedResult, TrialRecord};
pub use output::{ColoredFormatter, OutputFormatter, PlainFormatter};
pub use types::{ExecutionMode, MetricKind, PingMethod, TrialOutcome};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";
    pub const DEFAULT_DOWNLOAD_SIZES_MB: &[f64] = &[2.0, 5.0];
    pub const DEFAULT_UPLOAD_SIZES_MB: &[f64] = &[2.0, 5.0];
    pub const DEFAULT_TRIALS_PER_SIZE: u32 = 2;
    pub const DEFAULT_PING_ATTEMPTS: u32 = 8;
    pub const DEFAULT_CYCLES: u32 = 10;
    pub const DEFAULT_TRIAL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_ZERO_CYCLE_BACKOFF: Duration = Duration::from_millis(1000);
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    /// Largest payload accepted in a size list
    pub const MAX_PAYLOAD_MB: f64 = 100.0;
    /// Sizes the server serves without clamping
    pub const SERVER_MIN_SIZE_MB: f64 = 0.5;
    pub const SERVER_MAX_SIZE_MB: f64 = 10.0;
    /// Smallest upload cap a server deployment is expected to enforce
    pub const SERVER_UPLOAD_CAP_MB: f64 = 3.0;

    /// Trials in flight per size bucket, scaled to the machine
    pub fn default_max_concurrency() -> usize {
        (num_cpus::get() * 2).clamp(2, 8)
    }
}
