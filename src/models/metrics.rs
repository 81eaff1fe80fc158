//! Trial records, aggregates and series data models

use crate::types::{MetricKind, RateLimitInfo, TrialStatus, ZeroReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// What one trial produced, failures included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub metric: MetricKind,
    /// Payload size for throughput trials
    pub size_mb: Option<f64>,
    /// Zero-based attempt index within its size bucket (or ping run)
    pub attempt: usize,
    pub status: TrialStatus,
    /// Mbit/s or milliseconds; `0.0` unless `status` is `Success`
    pub value: f64,
    pub error_message: Option<String>,
    pub rate_limit: Option<RateLimitInfo>,
    pub timestamp: DateTime<Utc>,
}

impl TrialRecord {
    fn new(metric: MetricKind, size_mb: Option<f64>, attempt: usize, status: TrialStatus) -> Self {
        Self {
            metric,
            size_mb,
            attempt,
            status,
            value: 0.0,
            error_message: None,
            rate_limit: None,
            timestamp: Utc::now(),
        }
    }

    /// A trial that produced a usable sample
    pub fn success(metric: MetricKind, size_mb: Option<f64>, attempt: usize, value: f64) -> Self {
        Self {
            value,
            ..Self::new(metric, size_mb, attempt, TrialStatus::Success)
        }
    }

    /// A trial that completed without a usable sample
    pub fn zero(metric: MetricKind, size_mb: Option<f64>, attempt: usize, reason: &ZeroReason) -> Self {
        Self {
            error_message: Some(reason.to_string()),
            rate_limit: reason.rate_limit().cloned(),
            ..Self::new(metric, size_mb, attempt, reason.status())
        }
    }

    /// A trial abandoned because of a transport or protocol failure
    pub fn failed(metric: MetricKind, size_mb: Option<f64>, attempt: usize, error_message: String) -> Self {
        Self {
            error_message: Some(error_message),
            ..Self::new(metric, size_mb, attempt, TrialStatus::Failed)
        }
    }

    /// A trial abandoned after running past its timeout
    pub fn timeout(metric: MetricKind, size_mb: Option<f64>, attempt: usize, limit: Duration) -> Self {
        Self {
            error_message: Some(format!("Trial timed out after {}s", limit.as_secs())),
            ..Self::new(metric, size_mb, attempt, TrialStatus::Timeout)
        }
    }

    pub fn is_successful(&self) -> bool {
        self.status.is_success() && self.value > 0.0
    }
}

/// Reduction of one payload size's trials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeAggregate {
    pub size_mb: f64,
    /// Successful samples in issue order, even when trials overlap
    pub samples: Vec<f64>,
    /// Outlier-filtered, cold-start-trimmed mean; `None` when the size produced nothing
    pub representative: Option<f64>,
}

/// One metric's value for a cycle, with the trials behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregate {
    pub metric: MetricKind,
    /// Rounded Mbit/s or milliseconds; `0.0` when nothing could be measured
    pub value: f64,
    /// Values the final reduction ran over (per-size representatives or ping latencies)
    pub samples: Vec<f64>,
    pub sizes: Vec<SizeAggregate>,
    pub trials: Vec<TrialRecord>,
}

impl MetricAggregate {
    pub fn empty(metric: MetricKind) -> Self {
        Self {
            metric,
            value: 0.0,
            samples: Vec::new(),
            sizes: Vec::new(),
            trials: Vec::new(),
        }
    }

    pub fn successful_trials(&self) -> usize {
        self.trials.iter().filter(|t| t.is_successful()).count()
    }

    pub fn failed_trials(&self) -> usize {
        self.trials.len() - self.successful_trials()
    }
}

/// Download, upload and ping for one measurement cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedResult {
    pub download: MetricAggregate,
    pub upload: MetricAggregate,
    pub ping: MetricAggregate,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
}

impl SpeedResult {
    pub fn download_mbps(&self) -> f64 {
        self.download.value
    }

    pub fn upload_mbps(&self) -> f64 {
        self.upload.value
    }

    pub fn ping_ms(&self) -> f64 {
        self.ping.value
    }

    /// All three metrics came back as zero, typically a rate limit lockout
    pub fn is_all_zero(&self) -> bool {
        self.download.value <= 0.0 && self.upload.value <= 0.0 && self.ping.value <= 0.0
    }
}

/// One cycle's values as plotted in the series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub cycle: usize,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    pub skipped: bool,
}

impl SeriesPoint {
    pub fn from_result(cycle: usize, result: &SpeedResult) -> Self {
        Self {
            cycle,
            download_mbps: result.download_mbps(),
            upload_mbps: result.upload_mbps(),
            ping_ms: result.ping_ms(),
            skipped: result.is_all_zero(),
        }
    }
}

/// Bounded history of series points; the oldest point goes first once full
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    capacity: usize,
    points: VecDeque<SeriesPoint>,
}

impl Series {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: SeriesPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }
}

/// Running figures over the non-zero points of a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub mean_download_mbps: f64,
    pub mean_upload_mbps: f64,
    pub median_ping_ms: f64,
    pub completed_cycles: usize,
    pub skipped_cycles: usize,
}

/// Everything a measurement session produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesReport {
    pub points: Vec<SeriesPoint>,
    pub cycles: Vec<SpeedResult>,
    /// Indices of cycles where every metric came back as zero
    pub skipped_cycles: Vec<usize>,
    pub summary: SeriesSummary,
    pub started_at: DateTime<Utc>,
    pub duration_ms: f64,
}
