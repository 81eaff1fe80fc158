//! Measurement session execution
//!
//! `SpeedTestExecutor` drives the three metric aggregators:
//! - one cycle at a time via [`SpeedTestExecutor::measure_once`]
//! - a whole session of cycles via [`SpeedTestExecutor::run_series`],
//!   reporting progress as each trial, metric and cycle completes

use crate::{
    client::SpeedTransport,
    error::Result,
    logging::{LogLevel, SharedSink},
    measure::{AggregationPlan, MetricAggregator, ProgressEvent, ProgressReporter, TrialRunner, TrialTimeouts},
    models::{Config, MetricAggregate, Series, SeriesPoint, SeriesReport, SeriesSummary, SpeedResult},
    stats::{RunningMean, RunningMedian},
    types::{ExecutionMode, MetricKind},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

/// Session-level execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Number of cycles in a series
    pub cycles: usize,
    /// Whether the three metrics of a cycle run together or one after another
    pub mode: ExecutionMode,
    /// Pause after a cycle where every metric came back as zero
    pub zero_cycle_backoff: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ExecutionConfig {
    fn from(config: &Config) -> Self {
        Self {
            cycles: config.cycles as usize,
            mode: config.execution_mode,
            zero_cycle_backoff: config.zero_cycle_backoff(),
        }
    }
}

/// Running figures over the non-zero values seen so far in a series
#[derive(Debug, Default)]
struct SeriesTracker {
    download: RunningMean,
    upload: RunningMean,
    ping: RunningMedian,
    completed: usize,
    skipped: usize,
}

impl SeriesTracker {
    fn record(&mut self, point: &SeriesPoint) {
        if point.skipped {
            self.skipped += 1;
            return;
        }
        self.completed += 1;
        if point.download_mbps > 0.0 {
            self.download.add_value(point.download_mbps);
        }
        if point.upload_mbps > 0.0 {
            self.upload.add_value(point.upload_mbps);
        }
        if point.ping_ms > 0.0 {
            self.ping.add_value(point.ping_ms);
        }
    }

    fn summary(&self) -> SeriesSummary {
        SeriesSummary {
            mean_download_mbps: self.download.average(),
            mean_upload_mbps: self.upload.average(),
            median_ping_ms: self.ping.median(),
            completed_cycles: self.completed,
            skipped_cycles: self.skipped,
        }
    }
}

/// Runs measurement cycles against one speed test server
pub struct SpeedTestExecutor {
    aggregator: MetricAggregator,
    config: ExecutionConfig,
    series: Series,
    sink: SharedSink,
}

impl SpeedTestExecutor {
    pub fn new(aggregator: MetricAggregator, config: ExecutionConfig, sink: SharedSink) -> Self {
        let series = Series::with_capacity(config.cycles);
        Self {
            aggregator,
            config,
            series,
            sink,
        }
    }

    /// Wire trial runner, aggregator and executor from one configuration
    pub fn from_config(config: &Config, transport: Arc<dyn SpeedTransport>, sink: SharedSink) -> Self {
        let timeouts = TrialTimeouts {
            trial: config.trial_timeout(),
            upload: config.upload_timeout(),
        };
        let runner = TrialRunner::new(transport, sink.clone(), timeouts);
        let aggregator = MetricAggregator::new(runner, AggregationPlan::from(config), sink.clone());
        Self::new(aggregator, ExecutionConfig::from(config), sink)
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Points recorded by the most recent series
    pub fn series(&self) -> &Series {
        &self.series
    }

    /// One cycle: download, upload and ping aggregates
    pub async fn measure_once(&self) -> Result<SpeedResult> {
        self.measure_cycle(&ProgressReporter::disabled()).await
    }

    /// Run the configured number of cycles, sending progress as it happens
    pub async fn run_series(&mut self, progress: Option<UnboundedSender<ProgressEvent>>) -> Result<SeriesReport> {
        let reporter = ProgressReporter::from_option(progress);
        let started_at = Utc::now();
        let session_start = Instant::now();

        self.series = Series::with_capacity(self.config.cycles);
        let mut tracker = SeriesTracker::default();
        let mut cycles = Vec::with_capacity(self.config.cycles);
        let mut skipped_cycles = Vec::new();

        self.emit(
            LogLevel::Info,
            "Series started",
            json!({ "cycles": self.config.cycles, "mode": self.config.mode.to_string() }),
        );

        for cycle in 1..=self.config.cycles {
            let cycle_progress = reporter.for_cycle(cycle);
            let result = self.measure_cycle(&cycle_progress).await?;
            let point = SeriesPoint::from_result(cycle, &result);

            self.series.push(point);
            tracker.record(&point);
            cycles.push(result);

            reporter.send(ProgressEvent::CycleCompleted {
                point,
                summary: tracker.summary(),
            });

            if point.skipped {
                skipped_cycles.push(cycle);
                let backoff = self.config.zero_cycle_backoff;
                self.emit(
                    LogLevel::Warn,
                    "All metrics zero, possible rate limit lockout",
                    json!({ "cycle": cycle, "backoff_ms": backoff.as_millis() as u64 }),
                );
                reporter.send(ProgressEvent::CycleSkipped {
                    cycle,
                    backoff_ms: backoff.as_millis() as u64,
                });

                if cycle < self.config.cycles && !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        let summary = tracker.summary();
        let duration_ms = session_start.elapsed().as_secs_f64() * 1000.0;

        self.emit(
            LogLevel::Info,
            "Series finished",
            json!({
                "completed": summary.completed_cycles,
                "skipped": summary.skipped_cycles,
                "duration_ms": duration_ms,
            }),
        );

        Ok(SeriesReport {
            points: self.series.to_vec(),
            cycles,
            skipped_cycles,
            summary,
            started_at,
            duration_ms,
        })
    }

    async fn measure_cycle(&self, progress: &ProgressReporter) -> Result<SpeedResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        let (download, upload, ping) = match self.config.mode {
            ExecutionMode::Concurrent => tokio::try_join!(
                self.measure_metric(MetricKind::Download, progress),
                self.measure_metric(MetricKind::Upload, progress),
                self.measure_metric(MetricKind::Ping, progress),
            )?,
            ExecutionMode::Sequential => (
                self.measure_metric(MetricKind::Download, progress).await?,
                self.measure_metric(MetricKind::Upload, progress).await?,
                self.measure_metric(MetricKind::Ping, progress).await?,
            ),
        };

        Ok(SpeedResult {
            download,
            upload,
            ping,
            started_at,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }

    async fn measure_metric(&self, metric: MetricKind, progress: &ProgressReporter) -> Result<MetricAggregate> {
        let aggregate = match metric {
            MetricKind::Download => self.aggregator.aggregate_download(progress).await?,
            MetricKind::Upload => self.aggregator.aggregate_upload(progress).await?,
            MetricKind::Ping => self.aggregator.aggregate_ping(progress).await?,
        };
        progress.metric(metric, aggregate.value);
        Ok(aggregate)
    }

    fn emit(&self, level: LogLevel, message: &str, data: serde_json::Value) {
        self.sink.on_event(level, "series", message, Some(data));
    }
}
