//! Fetch / evaluate / report loop.
//!
//! [`Monitor`] polls a [`StatsSource`] on a fixed interval, writes one line
//! per threshold breach to its output, and owns the consecutive failure
//! counter that gates the "unable to fetch" message. The loop stops when
//! its [`CancellationToken`] is triggered, including while a fetch is in
//! flight.

use std::fmt::Display;
use std::io::Write;
use std::time::Duration;

use statprobe_core::{evaluate, StatsSample, Warning};
use tokio_util::sync::CancellationToken;

use crate::fetcher::{FetchError, StatsSource};

/// Consecutive failed fetches before [`FETCH_FAILURE_MESSAGE`] is written.
pub const FAILURE_REPORT_THRESHOLD: u32 = 3;

/// Line written for each failed cycle once the threshold is reached.
pub const FETCH_FAILURE_MESSAGE: &str = "Unable to fetch server statistics.";

/// Counts failed fetches in a row.
#[derive(Debug, Clone)]
pub struct FailureTracker {
    consecutive: u32,
    threshold: u32,
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(FAILURE_REPORT_THRESHOLD)
    }
}

impl FailureTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold,
        }
    }

    /// Record a failure. Returns `true` once the count reaches the threshold.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive >= self.threshold
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting for the next tick.
    Idle,
    /// A fetch or report is in progress.
    Checking,
}

/// Result of one check cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The fetch succeeded; `warnings` were written in order.
    Checked { warnings: Vec<Warning> },
    /// The fetch failed. `reported` is set when the failure message was written.
    Failed {
        consecutive_failures: u32,
        reported: bool,
    },
}

pub struct Monitor<S, W> {
    source: S,
    out: W,
    failures: FailureTracker,
    interval: Duration,
    state: MonitorState,
}

impl<S, W> Monitor<S, W>
where
    S: StatsSource,
    W: Write,
{
    pub fn new(source: S, out: W, interval: Duration) -> Self {
        Self {
            source,
            out,
            failures: FailureTracker::default(),
            interval,
            state: MonitorState::Idle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.consecutive()
    }

    /// Consume the monitor and hand back its output writer.
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run one fetch / evaluate / report cycle.
    pub async fn check_once(&mut self) -> CycleOutcome {
        self.state = MonitorState::Checking;

        let outcome = match self.source.fetch().await {
            Ok(sample) => self.report(&sample),
            Err(e) => self.record_failure(e),
        };

        if let Err(e) = self.out.flush() {
            tracing::error!(error = %e, "Failed to flush report output");
        }
        self.state = MonitorState::Idle;
        outcome
    }

    /// Check immediately, then once per interval, until `cancel` fires.
    ///
    /// Returns the number of completed cycles.
    pub async fn run(&mut self, cancel: &CancellationToken) -> u64 {
        let mut cycles = 0u64;

        tracing::info!(interval_secs = self.interval.as_secs_f64(), "Monitor loop started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.check_once() => cycles += 1,
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state = MonitorState::Idle;
        tracing::info!(cycles, "Monitor loop stopped");
        cycles
    }

    fn report(&mut self, sample: &StatsSample) -> CycleOutcome {
        let warnings: Vec<Warning> = evaluate(sample).collect();

        for warning in &warnings {
            tracing::debug!(metric = %warning.metric(), "Threshold breached");
            self.write_line(warning);
        }

        if self.failures.consecutive() > 0 {
            tracing::info!(
                previous_failures = self.failures.consecutive(),
                "Stats fetch recovered"
            );
        }
        self.failures.reset();

        tracing::debug!(warnings = warnings.len(), "Stats check complete");
        CycleOutcome::Checked { warnings }
    }

    fn record_failure(&mut self, error: FetchError) -> CycleOutcome {
        let reported = self.failures.record_failure();
        let consecutive_failures = self.failures.consecutive();

        tracing::warn!(error = %error, consecutive_failures, "Stats fetch failed");

        if reported {
            self.write_line(&FETCH_FAILURE_MESSAGE);
        }

        CycleOutcome::Failed {
            consecutive_failures,
            reported,
        }
    }

    fn write_line(&mut self, line: &dyn Display) {
        if let Err(e) = writeln!(self.out, "{line}") {
            tracing::error!(error = %e, "Failed to write report line");
        }
    }
}
