//! Single timed transfers against the speed test endpoints

use crate::{
    client::SpeedTransport,
    error::{AppError, Result},
    logging::{LogLevel, SharedSink},
    stats::{bytes_to_mbps, megabytes_to_bytes},
    types::{MetricKind, RateLimitInfo, TrialOutcome, ZeroReason},
};
use bytes::Bytes;
use futures::StreamExt;
use rand::RngCore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

const TOO_MANY_REQUESTS: u16 = 429;

/// Ceilings applied to individual trials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialTimeouts {
    /// Download and ping
    pub trial: Duration,
    pub upload: Duration,
}

impl Default for TrialTimeouts {
    fn default() -> Self {
        Self {
            trial: crate::defaults::DEFAULT_TRIAL_TIMEOUT,
            upload: crate::defaults::DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

/// Runs one download, upload or ping trial and turns it into a sample
pub struct TrialRunner {
    transport: Arc<dyn SpeedTransport>,
    sink: SharedSink,
    timeouts: TrialTimeouts,
}

impl TrialRunner {
    pub fn new(transport: Arc<dyn SpeedTransport>, sink: SharedSink, timeouts: TrialTimeouts) -> Self {
        Self {
            transport,
            sink,
            timeouts,
        }
    }

    pub fn timeout_for(&self, metric: MetricKind) -> Duration {
        match metric {
            MetricKind::Upload => self.timeouts.upload,
            MetricKind::Download | MetricKind::Ping => self.timeouts.trial,
        }
    }

    /// Download `size_mb` megabytes and report Mbit/s.
    ///
    /// Timing starts right before the first body read and ends at the
    /// arrival of the last chunk.
    pub async fn measure_download_once(&self, size_mb: f64) -> Result<TrialOutcome> {
        let limit = self.timeout_for(MetricKind::Download);
        timeout(limit, self.download(size_mb))
            .await
            .map_err(|_| AppError::timeout(format!("Download of {} MB exceeded {}s", size_mb, limit.as_secs())))?
    }

    /// Upload `payload` and report Mbit/s over the transmission window.
    ///
    /// The payload is shared; trials of one size send the same bytes.
    pub async fn measure_upload_once(&self, payload: Bytes) -> Result<TrialOutcome> {
        let limit = self.timeout_for(MetricKind::Upload);
        let size_mb = payload_megabytes(payload.len() as u64);
        timeout(limit, self.upload(payload))
            .await
            .map_err(|_| AppError::timeout(format!("Upload of {} MB exceeded {}s", size_mb, limit.as_secs())))?
    }

    /// Round-trip latency of one ping request in milliseconds
    pub async fn measure_ping_once(&self) -> Result<TrialOutcome> {
        let limit = self.timeout_for(MetricKind::Ping);
        timeout(limit, self.ping())
            .await
            .map_err(|_| AppError::timeout(format!("Ping exceeded {}s", limit.as_secs())))?
    }

    async fn download(&self, size_mb: f64) -> Result<TrialOutcome> {
        let response = self.transport.download(size_mb).await?;

        if response.status == TOO_MANY_REQUESTS {
            return Ok(rate_limited(response.rate_limit));
        }
        if !response.is_success() {
            return Ok(TrialOutcome::Zero(ZeroReason::Status { code: response.status }));
        }

        let mut body = response.body;
        let started = Instant::now();
        let mut last_chunk = started;
        let mut received: u64 = 0;

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if chunk.is_empty() {
                continue;
            }
            received += chunk.len() as u64;
            last_chunk = Instant::now();
        }

        if received == 0 {
            return Ok(TrialOutcome::Zero(ZeroReason::EmptyBody));
        }

        let elapsed = last_chunk.saturating_duration_since(started).as_secs_f64();
        if elapsed <= 0.0 {
            return Ok(TrialOutcome::Zero(ZeroReason::NonPositiveElapsed));
        }

        Ok(TrialOutcome::Sample(bytes_to_mbps(received, elapsed)))
    }

    async fn upload(&self, payload: Bytes) -> Result<TrialOutcome> {
        if payload.is_empty() {
            return Ok(TrialOutcome::Zero(ZeroReason::EmptyBody));
        }
        let sent = payload.len() as u64;

        let receipt = self.transport.upload(payload).await?;

        if receipt.status == TOO_MANY_REQUESTS {
            return Ok(rate_limited(receipt.rate_limit));
        }
        if !receipt.is_success() {
            return Err(AppError::http_request(format!(
                "Upload of {} MB rejected with status {}",
                payload_megabytes(sent),
                receipt.status
            )));
        }

        if let Some(acknowledged) = receipt.acknowledged_bytes {
            if acknowledged != sent {
                self.sink.on_event(
                    LogLevel::Warn,
                    MetricKind::Upload.as_str(),
                    "Server acknowledged a different byte count",
                    Some(json!({ "sent": sent, "acknowledged": acknowledged })),
                );
            }
        }

        let elapsed = receipt
            .transmission
            .map(|window| window.elapsed_secs())
            .unwrap_or(0.0);
        if elapsed <= 0.0 {
            return Ok(TrialOutcome::Zero(ZeroReason::NonPositiveElapsed));
        }

        Ok(TrialOutcome::Sample(bytes_to_mbps(sent, elapsed)))
    }

    async fn ping(&self) -> Result<TrialOutcome> {
        let started = Instant::now();
        let response = self.transport.ping().await?;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if response.status == TOO_MANY_REQUESTS {
            return Ok(rate_limited(response.rate_limit));
        }
        if !response.is_success() {
            return Err(AppError::http_request(format!("Ping failed with status {}", response.status)));
        }
        if latency_ms <= 0.0 {
            return Ok(TrialOutcome::Zero(ZeroReason::NonPositiveElapsed));
        }

        Ok(TrialOutcome::Sample(latency_ms))
    }
}

fn rate_limited(info: Option<RateLimitInfo>) -> TrialOutcome {
    TrialOutcome::Zero(ZeroReason::RateLimited {
        info: info.unwrap_or_default(),
    })
}

fn payload_megabytes(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Random payload of `round(size_mb * 1024²)` bytes
pub fn create_upload_payload(size_mb: f64) -> Bytes {
    let mut buffer = vec![0u8; megabytes_to_bytes(size_mb)];
    rand::thread_rng().fill_bytes(&mut buffer);
    Bytes::from(buffer)
}

/// [`create_upload_payload`] on the blocking pool, off the runtime thread
pub async fn generate_upload_payload(size_mb: f64) -> Result<Bytes> {
    tokio::task::spawn_blocking(move || create_upload_payload(size_mb))
        .await
        .map_err(|e| AppError::internal(format!("Upload payload generation failed: {}", e)))
}
