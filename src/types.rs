//! Shared enums for measurement kinds and trial outcomes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use crate::error::{AppError, Result};

/// The three quantities a speed test reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Download,
    Upload,
    Ping,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Ping => "ping",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::Download | Self::Upload => "Mbit/s",
            Self::Ping => "ms",
        }
    }

    /// Decimal places kept in the aggregated value
    pub fn precision(&self) -> u32 {
        match self {
            Self::Download | Self::Upload => 0,
            Self::Ping => 1,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single trial ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    /// Produced a positive sample
    Success,
    /// Completed but produced nothing usable (empty body, no elapsed time)
    Zero,
    /// Server answered 429
    RateLimited,
    /// Transport or protocol failure
    Failed,
    /// Abandoned after the trial timeout
    Timeout,
}

impl TrialStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Whether the three metric aggregators of a cycle overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Concurrent,
    Sequential,
}

impl FromStr for ExecutionMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "concurrent" | "parallel" => Ok(Self::Concurrent),
            "sequential" | "serial" => Ok(Self::Sequential),
            other => Err(AppError::parse(format!(
                "Unknown execution mode '{}' (expected concurrent or sequential)",
                other
            ))),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Concurrent => f.write_str("concurrent"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

/// Request method used against the ping endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PingMethod {
    #[default]
    Head,
    Get,
}

impl FromStr for PingMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "HEAD" => Ok(Self::Head),
            "GET" => Ok(Self::Get),
            other => Err(AppError::parse(format!(
                "Unknown ping method '{}' (expected HEAD or GET)",
                other
            ))),
        }
    }
}

impl fmt::Display for PingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head => f.write_str("HEAD"),
            Self::Get => f.write_str("GET"),
        }
    }
}

/// Rate limit hints returned alongside a 429
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// `Retry-After`, in whole seconds
    pub retry_after: Option<Duration>,
    /// `X-RateLimit-Limit`
    pub limit: Option<u64>,
    /// `X-RateLimit-Remaining`
    pub remaining: Option<u64>,
    /// `X-RateLimit-Reset`, as sent by the server
    pub reset: Option<String>,
}

/// Why a completed trial produced no sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ZeroReason {
    RateLimited { info: RateLimitInfo },
    EmptyBody,
    NonPositiveElapsed,
    Status { code: u16 },
}

impl ZeroReason {
    pub fn status(&self) -> TrialStatus {
        match self {
            Self::RateLimited { .. } => TrialStatus::RateLimited,
            _ => TrialStatus::Zero,
        }
    }

    pub fn rate_limit(&self) -> Option<&RateLimitInfo> {
        match self {
            Self::RateLimited { info } => Some(info),
            _ => None,
        }
    }
}

impl fmt::Display for ZeroReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited { info } => match info.retry_after {
                Some(wait) => write!(f, "rate limited (retry after {}s)", wait.as_secs()),
                None => f.write_str("rate limited"),
            },
            Self::EmptyBody => f.write_str("empty response body"),
            Self::NonPositiveElapsed => f.write_str("no measurable elapsed time"),
            Self::Status { code } => write!(f, "HTTP status {}", code),
        }
    }
}

/// Result of one trial that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    /// A positive Mbit/s or millisecond value
    Sample(f64),
    Zero(ZeroReason),
}

impl TrialOutcome {
    pub fn sample(&self) -> Option<f64> {
        match self {
            Self::Sample(value) => Some(*value),
            Self::Zero(_) => None,
        }
    }
}
