//! HTTP transport for the speed test endpoints
//!
//! [`SpeedTransport`] is the seam between the measurement engine and the
//! network. It hands back raw material (status, body stream, transmission
//! window) and leaves the timing math to the trial measurers.


use crate::{
    error::{AppError, Result},
    models::Config,
    types::{PingMethod, RateLimitInfo},
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{
    header::{HeaderMap, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER},
    Client, Method, StatusCode, Url,
};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Streamed response body, one item per network chunk
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Transport operations the trial measurers rely on
#[async_trait]
pub trait SpeedTransport: Send + Sync {
    /// Request `size_mb` megabytes from the download endpoint; the body is not read yet
    async fn download(&self, size_mb: f64) -> Result<DownloadResponse>;

    /// Send `payload` to the upload endpoint, recording when transmission started and ended
    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt>;

    /// One request against the ping endpoint, resolved once headers arrive
    async fn ping(&self) -> Result<PingResponse>;
}

/// Download endpoint response with an unread body
pub struct DownloadResponse {
    pub status: u16,
    pub rate_limit: Option<RateLimitInfo>,
    pub body: ByteStream,
}

impl DownloadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("status", &self.status)
            .field("rate_limit", &self.rate_limit)
            .finish_non_exhaustive()
    }
}

/// When the request body started and finished leaving the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionWindow {
    pub started: Instant,
    pub finished: Instant,
}

impl TransmissionWindow {
    pub fn elapsed_secs(&self) -> f64 {
        self.finished.saturating_duration_since(self.started).as_secs_f64()
    }
}

/// Outcome of one upload request
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub status: u16,
    pub rate_limit: Option<RateLimitInfo>,
    /// `None` when the body never started or never finished transmitting
    pub transmission: Option<TransmissionWindow>,
    /// Byte count echoed back by the server, when it sent a readable acknowledgement
    pub acknowledged_bytes: Option<u64>,
}

impl UploadReceipt {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct PingResponse {
    pub status: u16,
    pub rate_limit: Option<RateLimitInfo>,
}

impl PingResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Settings for [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL ending in `/`; `download`, `upload` and `ping` are joined onto it
    pub base_url: Url,
    pub ping_method: PingMethod,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    /// Size of the pieces an upload payload is streamed in
    pub upload_chunk_size: usize,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ping_method: PingMethod::default(),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 8,
            upload_chunk_size: 64 * 1024,
            user_agent: format!("{}/{}", crate::PKG_NAME, crate::VERSION),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client_config = Self::new(config.endpoint_base()?);
        client_config.ping_method = config.ping_method;
        client_config.connect_timeout = config.trial_timeout().min(Duration::from_secs(10));
        client_config.pool_max_idle_per_host = config.max_concurrency.max(1);
        Ok(client_config)
    }
}

struct Endpoints {
    download: Url,
    upload: Url,
    ping: Url,
}

/// [`SpeedTransport`] over a pooled `reqwest` client
pub struct HttpTransport {
    client: Client,
    endpoints: Endpoints,
    ping_method: PingMethod,
    upload_chunk_size: usize,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        let endpoints = Endpoints {
            download: config.base_url.join("download")?,
            upload: config.base_url.join("upload")?,
            ping: config.base_url.join("ping")?,
        };

        Ok(Self {
            client,
            endpoints,
            ping_method: config.ping_method,
            upload_chunk_size: config.upload_chunk_size.max(1),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(ClientConfig::from_config(config)?)
    }

    /// Download URL for one payload size, e.g. `.../download?size=2`
    pub fn download_url(&self, size_mb: f64) -> Url {
        let mut url = self.endpoints.download.clone();
        url.query_pairs_mut().append_pair("size", &size_mb.to_string());
        url
    }

    pub fn upload_url(&self) -> &Url {
        &self.endpoints.upload
    }

    pub fn ping_url(&self) -> &Url {
        &self.endpoints.ping
    }

    /// Split the payload into chunks and note when the first and last leave
    fn instrumented_body(&self, payload: Bytes, timeline: Arc<Mutex<Timeline>>) -> reqwest::Body {
        let chunk_size = self.upload_chunk_size;
        let chunks: Vec<Bytes> = (0..payload.len())
            .step_by(chunk_size)
            .map(|offset| payload.slice(offset..(offset + chunk_size).min(payload.len())))
            .collect();
        let last_index = chunks.len().saturating_sub(1);

        let chunk_timeline = Arc::clone(&timeline);
        let body = stream::iter(chunks.into_iter().enumerate()).map(move |(index, chunk)| {
            let now = Instant::now();
            if let Ok(mut timeline) = chunk_timeline.lock() {
                timeline.started.get_or_insert(now);
                if index == last_index {
                    timeline.finished = Some(now);
                }
            }
            Ok::<Bytes, std::io::Error>(chunk)
        });

        // Polled once the connection asks for more after the final chunk
        let end_of_body = stream::once(async move {
            if let Ok(mut timeline) = timeline.lock() {
                if timeline.started.is_some() {
                    timeline.finished = Some(Instant::now());
                }
            }
        })
        .filter_map(|_| async { None::<std::result::Result<Bytes, std::io::Error>> });

        reqwest::Body::wrap_stream(body.chain(end_of_body))
    }
}

#[derive(Debug, Default)]
struct Timeline {
    started: Option<Instant>,
    finished: Option<Instant>,
}

impl Timeline {
    fn window(&self) -> Option<TransmissionWindow> {
        match (self.started, self.finished) {
            (Some(started), Some(finished)) => Some(TransmissionWindow { started, finished }),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadAck {
    size: u64,
}

#[async_trait]
impl SpeedTransport for HttpTransport {
    async fn download(&self, size_mb: f64) -> Result<DownloadResponse> {
        let response = self
            .client
            .get(self.download_url(size_mb))
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        let rate_limit = rate_limit_for(status, response.headers());
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(AppError::from))
            .boxed();

        Ok(DownloadResponse {
            status: status.as_u16(),
            rate_limit,
            body,
        })
    }

    async fn upload(&self, payload: Bytes) -> Result<UploadReceipt> {
        let timeline = Arc::new(Mutex::new(Timeline::default()));
        let payload_len = payload.len();
        let body = self.instrumented_body(payload, Arc::clone(&timeline));

        let response = self
            .client
            .post(self.endpoints.upload.clone())
            .header(CACHE_CONTROL, "no-store")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, payload_len)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let rate_limit = rate_limit_for(status, response.headers());
        let transmission = timeline.lock().ok().and_then(|timeline| timeline.window());

        let acknowledged_bytes = if status.is_success() {
            response.json::<UploadAck>().await.ok().map(|ack| ack.size)
        } else {
            None
        };

        Ok(UploadReceipt {
            status: status.as_u16(),
            rate_limit,
            transmission,
            acknowledged_bytes,
        })
    }

    async fn ping(&self) -> Result<PingResponse> {
        let method = match self.ping_method {
            PingMethod::Head => Method::HEAD,
            PingMethod::Get => Method::GET,
        };

        let response = self
            .client
            .request(method, self.endpoints.ping.clone())
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await?;

        let status = response.status();
        Ok(PingResponse {
            status: status.as_u16(),
            rate_limit: rate_limit_for(status, response.headers()),
        })
    }
}

fn rate_limit_for(status: StatusCode, headers: &HeaderMap) -> Option<RateLimitInfo> {
    (status == StatusCode::TOO_MANY_REQUESTS).then(|| rate_limit_info(headers))
}

/// Read `Retry-After` and `X-RateLimit-*` headers
pub fn rate_limit_info(headers: &HeaderMap) -> RateLimitInfo {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
    };

    RateLimitInfo {
        retry_after: header_str(RETRY_AFTER.as_str())
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs),
        limit: header_str("x-ratelimit-limit").and_then(|value| value.parse().ok()),
        remaining: header_str("x-ratelimit-remaining").and_then(|value| value.parse().ok()),
        reset: header_str("x-ratelimit-reset"),
    }
}
