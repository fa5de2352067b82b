//! Decision counters and a rolling latency average.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of recent durations the rolling average is computed over.
pub const DURATION_SAMPLES: usize = 100;

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_requests: u64,
    pub auto_confirmed: u64,
    pub manual_confirmed: u64,
    pub denied: u64,
    pub timeouts: u64,
    /// Mean decision time in milliseconds over the last
    /// [`DURATION_SAMPLES`] decisions.
    pub average_response_time: f64,
}

impl Metrics {
    /// Share of `count` in `total_requests`, as a percentage. Zero when no
    /// requests were seen.
    pub fn percent(&self, count: u64) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total_requests as f64
        }
    }
}

/// The categorical result of one decision, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AutoConfirmed,
    ManualRequired,
    Denied,
    TimedOut,
}

pub trait MetricsRecorder: Send {
    fn record_request(&mut self);
    fn record_outcome(&mut self, outcome: Outcome);
    /// Add one decision duration, in milliseconds.
    fn record_duration(&mut self, millis: f64);
    fn snapshot(&self) -> Metrics;
    fn reset(&mut self);
}

/// Counters plus a ring buffer of the most recent durations.
#[derive(Debug)]
pub struct RollingMetrics {
    counters: Metrics,
    durations: VecDeque<f64>,
}

impl Default for RollingMetrics {
    fn default() -> Self {
        Self {
            counters: Metrics::default(),
            durations: VecDeque::with_capacity(DURATION_SAMPLES),
        }
    }
}

impl RollingMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsRecorder for RollingMetrics {
    fn record_request(&mut self) {
        self.counters.total_requests += 1;
    }

    fn record_outcome(&mut self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::AutoConfirmed => &mut self.counters.auto_confirmed,
            Outcome::ManualRequired => &mut self.counters.manual_confirmed,
            Outcome::Denied => &mut self.counters.denied,
            Outcome::TimedOut => &mut self.counters.timeouts,
        };
        *counter += 1;
    }

    fn record_duration(&mut self, millis: f64) {
        if self.durations.len() == DURATION_SAMPLES {
            self.durations.pop_front();
        }
        self.durations.push_back(millis);
        self.counters.average_response_time =
            self.durations.iter().sum::<f64>() / self.durations.len() as f64;
    }

    fn snapshot(&self) -> Metrics {
        self.counters.clone()
    }

    fn reset(&mut self) {
        self.counters = Metrics::default();
        self.durations.clear();
    }
}
