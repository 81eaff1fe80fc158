//! Reduction of many trials into one value per metric

use super::progress::ProgressReporter;
use super::trial::{generate_upload_payload, TrialRunner};
use crate::{
    error::{AppError, Result},
    logging::{LogLevel, SharedSink},
    models::{Config, MetricAggregate, SizeAggregate, TrialRecord},
    stats::{average, average_without_cold_start, median, remove_outliers, round_to},
    types::{ExecutionMode, MetricKind, TrialOutcome},
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde_json::json;

/// How many trials to run and how to reduce them
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationPlan {
    pub download_sizes_mb: Vec<f64>,
    pub upload_sizes_mb: Vec<f64>,
    pub trials_per_size: usize,
    pub ping_attempts: usize,
    pub cold_start_drop: usize,
    /// Discarded trials tolerated per size; the size yields nothing once exceeded
    pub max_failed_trials: Option<usize>,
    /// Trials of one size in flight at once when `trial_mode` is concurrent
    pub max_concurrency: usize,
    pub trial_mode: ExecutionMode,
}

impl From<&Config> for AggregationPlan {
    fn from(config: &Config) -> Self {
        Self {
            download_sizes_mb: config.download_sizes_mb.clone(),
            upload_sizes_mb: config.upload_sizes_mb.clone(),
            trials_per_size: config.trials_per_size as usize,
            ping_attempts: config.ping_attempts as usize,
            cold_start_drop: config.cold_start_drop,
            max_failed_trials: config.max_failed_trials.map(|limit| limit as usize),
            max_concurrency: config.max_concurrency.max(1),
            trial_mode: config.execution_mode,
        }
    }
}

impl Default for AggregationPlan {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Drop the first and last recorded latency when more than two exist.
///
/// The trim is positional: it removes whatever arrived first and last,
/// not the smallest and largest values.
pub fn trim_first_and_last(values: &[f64]) -> &[f64] {
    if values.len() > 2 {
        &values[1..values.len() - 1]
    } else {
        values
    }
}

/// Runs trials per the plan and reduces them with the statistics module
pub struct MetricAggregator {
    runner: TrialRunner,
    plan: AggregationPlan,
    sink: SharedSink,
}

impl MetricAggregator {
    pub fn new(runner: TrialRunner, plan: AggregationPlan, sink: SharedSink) -> Self {
        Self { runner, plan, sink }
    }

    pub fn plan(&self) -> &AggregationPlan {
        &self.plan
    }

    pub async fn aggregate_download(&self, progress: &ProgressReporter) -> Result<MetricAggregate> {
        self.aggregate_throughput(MetricKind::Download, &self.plan.download_sizes_mb, progress)
            .await
    }

    pub async fn aggregate_upload(&self, progress: &ProgressReporter) -> Result<MetricAggregate> {
        self.aggregate_throughput(MetricKind::Upload, &self.plan.upload_sizes_mb, progress)
            .await
    }

    /// Sequential ping attempts reduced to a median in milliseconds
    pub async fn aggregate_ping(&self, progress: &ProgressReporter) -> Result<MetricAggregate> {
        let mut aggregate = MetricAggregate::empty(MetricKind::Ping);
        let mut latencies = Vec::with_capacity(self.plan.ping_attempts);

        // Attempt order matters for the positional trim
        for attempt in 0..self.plan.ping_attempts {
            let record = self.run_trial(MetricKind::Ping, None, attempt, None).await?;
            progress.trial(&record);
            if record.is_successful() {
                latencies.push(record.value);
            }
            aggregate.trials.push(record);
        }

        let filtered = remove_outliers(trim_first_and_last(&latencies));
        aggregate.value = if filtered.is_empty() {
            0.0
        } else {
            round_to(median(&filtered), MetricKind::Ping.precision())
        };
        aggregate.samples = filtered;

        self.emit(
            LogLevel::Info,
            MetricKind::Ping,
            "Ping aggregated",
            json!({
                "value_ms": aggregate.value,
                "successful": latencies.len(),
                "attempts": self.plan.ping_attempts,
            }),
        );

        Ok(aggregate)
    }

    async fn aggregate_throughput(
        &self,
        metric: MetricKind,
        sizes: &[f64],
        progress: &ProgressReporter,
    ) -> Result<MetricAggregate> {
        let mut aggregate = MetricAggregate::empty(metric);

        for &size_mb in sizes {
            let trials = self.run_size_bucket(metric, size_mb, progress).await?;
            let samples: Vec<f64> = trials
                .iter()
                .filter(|trial| trial.is_successful())
                .map(|trial| trial.value)
                .collect();
            let discarded = trials.len() - samples.len();
            let over_limit = self.over_failure_limit(discarded);

            let representative = if samples.is_empty() || over_limit {
                None
            } else {
                Some(average_without_cold_start(
                    &remove_outliers(&samples),
                    self.plan.cold_start_drop,
                ))
            };

            match representative {
                Some(value) => self.emit(
                    LogLevel::Debug,
                    metric,
                    "Size aggregated",
                    json!({ "size_mb": size_mb, "value_mbps": value, "samples": samples.len(), "discarded": discarded }),
                ),
                None => self.emit(
                    LogLevel::Warn,
                    metric,
                    "Size produced no usable samples",
                    json!({ "size_mb": size_mb, "discarded": discarded, "over_failure_limit": over_limit }),
                ),
            }

            aggregate.sizes.push(SizeAggregate {
                size_mb,
                samples,
                representative,
            });
            aggregate.trials.extend(trials);
        }

        let representatives: Vec<f64> = aggregate
            .sizes
            .iter()
            .filter_map(|size| size.representative)
            .collect();

        aggregate.value = if representatives.is_empty() {
            0.0
        } else {
            round_to(average(&remove_outliers(&representatives)), metric.precision())
        };
        aggregate.samples = representatives;

        self.emit(
            LogLevel::Info,
            metric,
            "Throughput aggregated",
            json!({ "value_mbps": aggregate.value, "sizes": aggregate.samples.len() }),
        );

        Ok(aggregate)
    }

    async fn run_size_bucket(
        &self,
        metric: MetricKind,
        size_mb: f64,
        progress: &ProgressReporter,
    ) -> Result<Vec<TrialRecord>> {
        let count = self.plan.trials_per_size;
        let mut records = Vec::with_capacity(count);

        // Built once per size, before any trial of the bucket is timed
        let payload = match metric {
            MetricKind::Upload if count > 0 => Some(generate_upload_payload(size_mb).await?),
            _ => None,
        };

        match self.plan.trial_mode {
            ExecutionMode::Sequential => {
                let mut discarded = 0;
                for attempt in 0..count {
                    let record = self
                        .run_trial(metric, Some(size_mb), attempt, payload.clone())
                        .await?;
                    progress.trial(&record);
                    if !record.is_successful() {
                        discarded += 1;
                    }
                    records.push(record);

                    if self.over_failure_limit(discarded) {
                        break;
                    }
                }
            }
            ExecutionMode::Concurrent => {
                let mut trials = std::pin::pin!(stream::iter(0..count)
                    .map(|attempt| self.run_trial(metric, Some(size_mb), attempt, payload.clone()))
                    .buffered(self.plan.max_concurrency.max(1)));

                while let Some(record) = trials.next().await {
                    let record = record?;
                    progress.trial(&record);
                    records.push(record);
                }
            }
        }

        Ok(records)
    }

    /// One trial turned into a record; only fatal errors escape
    async fn run_trial(
        &self,
        metric: MetricKind,
        size_mb: Option<f64>,
        attempt: usize,
        payload: Option<Bytes>,
    ) -> Result<TrialRecord> {
        let size = size_mb.unwrap_or_default();
        let outcome = match metric {
            MetricKind::Download => self.runner.measure_download_once(size).await,
            MetricKind::Upload => {
                self.runner
                    .measure_upload_once(payload.unwrap_or_default())
                    .await
            }
            MetricKind::Ping => self.runner.measure_ping_once().await,
        };

        let record = match outcome {
            Ok(TrialOutcome::Sample(value)) => TrialRecord::success(metric, size_mb, attempt, value),
            Ok(TrialOutcome::Zero(reason)) => {
                self.emit(
                    LogLevel::Debug,
                    metric,
                    "Trial produced no sample",
                    json!({ "size_mb": size_mb, "attempt": attempt, "reason": reason.to_string() }),
                );
                TrialRecord::zero(metric, size_mb, attempt, &reason)
            }
            Err(AppError::Timeout(message)) => {
                self.emit(
                    LogLevel::Warn,
                    metric,
                    "Trial timed out",
                    json!({ "size_mb": size_mb, "attempt": attempt, "error": message }),
                );
                TrialRecord::timeout(metric, size_mb, attempt, self.runner.timeout_for(metric))
            }
            Err(error) if error.is_trial_failure() => {
                self.emit(
                    LogLevel::Warn,
                    metric,
                    "Trial failed",
                    json!({ "size_mb": size_mb, "attempt": attempt, "error": error.to_string() }),
                );
                TrialRecord::failed(metric, size_mb, attempt, error.to_string())
            }
            Err(error) => return Err(error),
        };

        Ok(record)
    }

    fn over_failure_limit(&self, discarded: usize) -> bool {
        self.plan
            .max_failed_trials
            .is_some_and(|limit| discarded > limit)
    }

    fn emit(&self, level: LogLevel, metric: MetricKind, message: &str, data: serde_json::Value) {
        self.sink.on_event(level, metric.as_str(), message, Some(data));
    }
}
