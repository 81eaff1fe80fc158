//! Scripted transport for exercising the measurers without a network

use crate::client::{DownloadResponse, PingResponse, SpeedTransport, TransmissionWindow, UploadReceipt};
use crate::error::{AppError, Result};
use crate::types::RateLimitInfo;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[derive(Debug, Clone)]
pub enum DownloadScript {
    /// `count` chunks of `chunk_len` bytes, each arriving after `delay_ms`
    Chunks { count: usize, chunk_len: usize, delay_ms: u64 },
    Status(u16),
    Fail,
    Hang,
    Internal,
}

impl DownloadScript {
    pub fn chunks(count: usize, chunk_len: usize, delay_ms: u64) -> Self {
        Self::Chunks { count, chunk_len, delay_ms }
    }
}

#[derive(Debug, Clone)]
pub enum UploadScript {
    /// Body takes `duration_ms` to leave; `ack` overrides the echoed size
    Transmit { duration_ms: u64, ack: Option<u64> },
    Status(u16),
    Fail,
    Hang,
}

impl UploadScript {
    pub fn transmit(duration_ms: u64) -> Self {
        Self::Transmit { duration_ms, ack: None }
    }
}

#[derive(Debug, Clone)]
pub enum PingScript {
    Reply { latency_ms: u64 },
    Status(u16),
    Fail,
    Hang,
    Internal,
}

impl PingScript {
    pub fn reply(latency_ms: u64) -> Self {
        Self::Reply { latency_ms }
    }
}

/// Transport answering from per-operation queues, falling back once a queue runs dry
pub struct ScriptedTransport {
    downloads: Mutex<VecDeque<DownloadScript>>,
    uploads: Mutex<VecDeque<UploadScript>>,
    pings: Mutex<VecDeque<PingScript>>,
    fallback_download: DownloadScript,
    fallback_upload: UploadScript,
    fallback_ping: PingScript,
    download_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    ping_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            downloads: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(VecDeque::new()),
            pings: Mutex::new(VecDeque::new()),
            fallback_download: DownloadScript::Fail,
            fallback_upload: UploadScript::Fail,
            fallback_ping: PingScript::Fail,
            download_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            ping_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_downloads(self, scripts: Vec<DownloadScript>) -> Self {
        *self.downloads.lock().unwrap() = scripts.into();
        self
    }

    pub fn with_uploads(self, scripts: Vec<UploadScript>) -> Self {
        *self.uploads.lock().unwrap() = scripts.into();
        self
    }

    pub fn with_pings(self, scripts: Vec<PingScript>) -> Self {
        *self.pings.lock().unwrap() = scripts.into();
        self
    }

    pub fn with_fallbacks(mut self, download: DownloadScript, upload: UploadScript, ping: PingScript) -> Self {
        self.fallback_download = download;
        self.fallback_upload = upload;
        self.fallback_ping = ping;
        self
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    fn limited(status: u16) -> Option<RateLimitInfo> {
        (status == 429).then(|| RateLimitInfo {
            retry_after: Some(Duration::from_secs(1)),
            ..Default::default()
        })
    }
}

#[async_trait]
impl SpeedTransport for ScriptedTransport {
    async fn download(&self, _size_mb: f64) -> Result<DownloadResponse> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .downloads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback_download.clone());

        match script {
            DownloadScript::Chunks { count, chunk_len, delay_ms } => {
                let body = stream::iter(0..count)
                    .then(move |_| async move {
                        if delay_ms > 0 {
                            sleep(Duration::from_millis(delay_ms)).await;
                        }
                        Ok::<Bytes, AppError>(Bytes::from(vec![0u8; chunk_len]))
                    })
                    .boxed();
                Ok(DownloadResponse { status: 200, rate_limit: None, body })
            }
            DownloadScript::Status(status) => Ok(DownloadResponse {
                status,
                rate_limit: Self::limited(status),
                body: stream::empty().boxed(),
            }),
            DownloadScript::Fail => Err(AppError::network("connection reset by peer")),
            DownloadScript::Hang => futures::future::pending().await,
            DownloadScript::Internal => Err(AppError::internal("transport invariant broken")),
        }
    }

    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback_upload.clone());

        match script {
            UploadScript::Transmit { duration_ms, ack } => {
                let started = Instant::now();
                sleep(Duration::from_millis(duration_ms)).await;
                let finished = Instant::now();
                Ok(UploadReceipt {
                    status: 200,
                    rate_limit: None,
                    transmission: Some(TransmissionWindow { started, finished }),
                    acknowledged_bytes: Some(ack.unwrap_or(payload.len() as u64)),
                })
            }
            UploadScript::Status(status) => Ok(UploadReceipt {
                status,
                rate_limit: Self::limited(status),
                transmission: None,
                acknowledged_bytes: None,
            }),
            UploadScript::Fail => Err(AppError::network("broken pipe")),
            UploadScript::Hang => futures::future::pending().await,
        }
    }

    async fn ping(&self) -> Result<PingResponse> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .pings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback_ping.clone());

        match script {
            PingScript::Reply { latency_ms } => {
                sleep(Duration::from_millis(latency_ms)).await;
                Ok(PingResponse { status: 204, rate_limit: None })
            }
            PingScript::Status(status) => Ok(PingResponse {
                status,
                rate_limit: Self::limited(status),
            }),
            PingScript::Fail => Err(AppError::network("connection refused")),
            PingScript::Hang => futures::future::pending().await,
            PingScript::Internal => Err(AppError::internal("transport invariant broken")),
        }
    }
}
