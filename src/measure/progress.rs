//! Incremental progress events for live display

use crate::models::{SeriesPoint, SeriesSummary, TrialRecord};
use crate::types::MetricKind;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Something the display layer can render while a session is running
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    TrialCompleted { cycle: usize, record: TrialRecord },
    MetricCompleted { cycle: usize, metric: MetricKind, value: f64 },
    CycleCompleted { point: SeriesPoint, summary: SeriesSummary },
    CycleSkipped { cycle: usize, backoff_ms: u64 },
}

/// Optional progress channel tagged with the running cycle.
///
/// Sending never fails: a missing or closed receiver just drops events.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
    cycle: usize,
}

impl ProgressReporter {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
            cycle: 0,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_option(sender: Option<UnboundedSender<ProgressEvent>>) -> Self {
        Self { sender, cycle: 0 }
    }

    /// Same channel, events attributed to `cycle`
    pub fn for_cycle(&self, cycle: usize) -> Self {
        Self {
            sender: self.sender.clone(),
            cycle,
        }
    }

    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn send(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn trial(&self, record: &TrialRecord) {
        if self.is_enabled() {
            self.send(ProgressEvent::TrialCompleted {
                cycle: self.cycle,
                record: record.clone(),
            });
        }
    }

    pub fn metric(&self, metric: MetricKind, value: f64) {
        self.send(ProgressEvent::MetricCompleted {
            cycle: self.cycle,
            metric,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_disabled_reporter_drops_events() {
        let reporter = ProgressReporter::disabled();
        assert!(!reporter.is_enabled());
        reporter.metric(MetricKind::Ping, 12.0);
    }

    #[test]
    fn test_events_carry_cycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(tx).for_cycle(3);

        let record = TrialRecord::success(MetricKind::Download, Some(2.0), 0, 90.0);
        reporter.trial(&record);
        reporter.metric(MetricKind::Download, 90.0);

        assert_eq!(rx.try_recv().unwrap(), ProgressEvent::TrialCompleted { cycle: 3, record });
        assert_eq!(
            rx.try_recv().unwrap(),
            ProgressEvent::MetricCompleted { cycle: 3, metric: MetricKind::Download, value: 90.0 }
        );
    }

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        ProgressReporter::new(tx).metric(MetricKind::Upload, 1.0);
    }

    #[test]
    fn test_channel_closes_when_reporters_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reporter = ProgressReporter::new(tx);
        let cycle_one = reporter.for_cycle(1);
        cycle_one.send(ProgressEvent::CycleSkipped { cycle: 1, backoff_ms: 0 });
        drop(cycle_one);
        drop(reporter);

        let events = tokio_test::block_on(async {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        });
        assert_eq!(events, vec![ProgressEvent::CycleSkipped { cycle: 1, backoff_ms: 0 }]);
    }
}
