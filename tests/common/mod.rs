//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use network_speed_tester::{
    client::{DownloadResponse, PingResponse, SpeedTransport, TransmissionWindow, UploadReceipt},
    error::{AppError, Result},
    models::Config,
    types::ExecutionMode,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use wiremock::{
    matchers::{method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

pub const MEGABYTE: usize = 1024 * 1024;

/// Small configuration that keeps sessions short
pub fn quick_config(base_url: &str) -> Config {
    Config {
        base_url: base_url.to_string(),
        download_sizes_mb: vec![2.0],
        upload_sizes_mb: vec![2.0],
        trials_per_size: 2,
        ping_attempts: 4,
        cycles: 2,
        zero_cycle_backoff_ms: 0,
        max_concurrency: 2,
        enable_color: false,
        ..Default::default()
    }
}

pub fn sequential(mut config: Config) -> Config {
    config.execution_mode = ExecutionMode::Sequential;
    config
}

/// Transport with fixed pacing, usable under a paused clock.
///
/// The first `limited_*` calls of each kind answer 429.
pub struct PacedTransport {
    pub download_ms: u64,
    pub upload_ms: u64,
    pub ping_ms: u64,
    pub limited_downloads: usize,
    pub limited_uploads: usize,
    pub limited_pings: usize,
    pub broken: bool,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
    pings: AtomicUsize,
}

impl PacedTransport {
    pub fn new(download_ms: u64, upload_ms: u64, ping_ms: u64) -> Self {
        Self {
            download_ms,
            upload_ms,
            ping_ms,
            limited_downloads: 0,
            limited_uploads: 0,
            limited_pings: 0,
            broken: false,
            downloads: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            pings: AtomicUsize::new(0),
        }
    }

    pub fn rate_limited_first(mut self, downloads: usize, uploads: usize, pings: usize) -> Self {
        self.limited_downloads = downloads;
        self.limited_uploads = uploads;
        self.limited_pings = pings;
        self
    }

    /// Every ping fails with an error no trial can absorb
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn ping_calls(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeedTransport for PacedTransport {
    async fn download(&self, size_mb: f64) -> Result<DownloadResponse> {
        let call = self.downloads.fetch_add(1, Ordering::SeqCst);
        if call < self.limited_downloads {
            return Ok(DownloadResponse {
                status: 429,
                rate_limit: None,
                body: stream::empty().boxed(),
            });
        }

        // Four equal chunks spread over the configured duration
        let chunk_len = (size_mb * MEGABYTE as f64) as usize / 4;
        let delay = Duration::from_millis(self.download_ms / 4);
        let body = stream::iter(0..4)
            .then(move |_| async move {
                sleep(delay).await;
                Ok::<Bytes, AppError>(Bytes::from(vec![0u8; chunk_len]))
            })
            .boxed();

        Ok(DownloadResponse {
            status: 200,
            rate_limit: None,
            body,
        })
    }

    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt> {
        let call = self.uploads.fetch_add(1, Ordering::SeqCst);
        if call < self.limited_uploads {
            return Ok(UploadReceipt {
                status: 429,
                rate_limit: None,
                transmission: None,
                acknowledged_bytes: None,
            });
        }

        let started = Instant::now();
        sleep(Duration::from_millis(self.upload_ms)).await;
        Ok(UploadReceipt {
            status: 200,
            rate_limit: None,
            transmission: Some(TransmissionWindow {
                started,
                finished: Instant::now(),
            }),
            acknowledged_bytes: Some(payload.len() as u64),
        })
    }

    async fn ping(&self) -> Result<PingResponse> {
        if self.broken {
            return Err(AppError::internal("ping handler lost its connection pool"));
        }

        let call = self.pings.fetch_add(1, Ordering::SeqCst);
        if call < self.limited_pings {
            return Ok(PingResponse {
                status: 429,
                rate_limit: None,
            });
        }

        sleep(Duration::from_millis(self.ping_ms)).await;
        Ok(PingResponse {
            status: 204,
            rate_limit: None,
        })
    }
}

/// Mock speed test server serving every endpoint under `/api/`
pub struct SpeedServer {
    pub server: MockServer,
}

impl SpeedServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}/api/", self.server.uri())
    }

    /// Healthy server: downloads of `download_len` bytes, acknowledged uploads, 204 pings
    pub async fn healthy(self, download_len: usize) -> Self {
        Mock::given(method("GET"))
            .and(path("/api/download"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; download_len]))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "size": 2 * MEGABYTE })))
            .mount(&self.server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/api/ping"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(5)))
            .mount(&self.server)
            .await;
        self
    }

    /// Every endpoint answers 429
    pub async fn rate_limited(self) -> Self {
        Mock::given(path_regex(r"^/api/"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&self.server)
            .await;
        self
    }

    /// Uploads rejected with the given status, everything else healthy
    pub async fn rejecting_uploads(self, status: u16, download_len: usize) -> Self {
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
        self.healthy(download_len).await
    }
}
