//! Refresh scheduling on top of the fetch worker

use std::collections::VecDeque;
use std::time::Duration;

use super::{FetchOutcome, TelemetryError, TelemetrySource, TelemetryWorker};

/// Polls a telemetry source every `interval_ms` and on demand.
///
/// Scheduled polls are skipped while a fetch is outstanding. A forced
/// refresh is always queued, behind any fetch already in progress. If the
/// worker thread goes away, every outstanding request is delivered as a
/// [`TelemetryError::WorkerStopped`] failure and the error is repeated once
/// per interval from then on.
pub struct TelemetryFeed {
    worker: TelemetryWorker,
    interval_ms: f64,
    last_request_ms: Option<f64>,
    next_request: u64,
    /// Request number and request time of every undelivered fetch
    pending: VecDeque<(u64, i64)>,
    stopped: bool,
}

impl TelemetryFeed {
    pub fn new(source: Box<dyn TelemetrySource>, interval_ms: f64) -> Self {
        Self::with_worker(TelemetryWorker::spawn(source), interval_ms)
    }

    fn with_worker(worker: TelemetryWorker, interval_ms: f64) -> Self {
        log::info!(
            "Polling telemetry from '{}' every {} ms",
            worker.source_name(),
            interval_ms
        );
        Self {
            worker,
            interval_ms,
            last_request_ms: None,
            next_request: 0,
            pending: VecDeque::new(),
            stopped: false,
        }
    }

    pub fn source_name(&self) -> &str {
        self.worker.source_name()
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Fetches requested but not yet delivered
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Whether the worker thread has gone away
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn interval_elapsed(&self, now_ms: f64) -> bool {
        if !now_ms.is_finite() {
            return false;
        }
        match self.last_request_ms {
            None => true,
            Some(last) => now_ms - last >= self.interval_ms,
        }
    }

    /// Whether a scheduled poll is due at `now_ms`
    pub fn is_due(&self, now_ms: f64) -> bool {
        !self.stopped && self.pending.is_empty() && self.interval_elapsed(now_ms)
    }

    /// Issue a scheduled poll if one is due. Returns the request number when
    /// a fetch was queued.
    pub fn schedule(&mut self, now_ms: f64) -> Result<Option<u64>, TelemetryError> {
        if self.stopped && self.interval_elapsed(now_ms) {
            self.last_request_ms = Some(now_ms);
            return Err(TelemetryError::WorkerStopped);
        }
        if !self.is_due(now_ms) {
            return Ok(None);
        }
        self.request(now_ms).map(Some)
    }

    /// Queue a fetch immediately regardless of the schedule
    pub fn force_refresh(&mut self, now_ms: f64) -> Result<u64, TelemetryError> {
        log::debug!("Forced telemetry refresh");
        self.request(now_ms)
    }

    fn request(&mut self, now_ms: f64) -> Result<u64, TelemetryError> {
        if self.stopped {
            return Err(TelemetryError::WorkerStopped);
        }
        let request = self.next_request;
        let requested_at_ms = if now_ms.is_finite() {
            now_ms.round() as i64
        } else {
            0
        };
        if let Err(e) = self.worker.request(request, requested_at_ms) {
            self.mark_stopped();
            return Err(e);
        }

        self.next_request += 1;
        self.pending.push_back((request, requested_at_ms));
        if now_ms.is_finite() {
            self.last_request_ms = Some(now_ms);
        }
        Ok(request)
    }

    fn mark_stopped(&mut self) {
        if !self.stopped {
            log::error!(
                "Telemetry worker for '{}' stopped with {} fetches outstanding",
                self.worker.source_name(),
                self.pending.len()
            );
            self.stopped = true;
        }
    }

    /// The oldest outstanding request, failed because the worker is gone
    fn abandon_oldest(&mut self) -> Option<FetchOutcome> {
        let (request, requested_at_ms) = self.pending.pop_front()?;
        Some(FetchOutcome {
            request,
            requested_at_ms,
            result: Err(TelemetryError::WorkerStopped),
        })
    }

    /// Completed fetches since the last poll, oldest first
    pub fn poll(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        if !self.stopped {
            let drained = self.worker.drain(&mut outcomes);
            let delivered = outcomes.len().min(self.pending.len());
            self.pending.drain(..delivered);
            if drained.is_err() {
                self.mark_stopped();
            }
        }
        if self.stopped {
            while let Some(outcome) = self.abandon_oldest() {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Block for the next completed fetch
    pub fn wait(&mut self, timeout: Duration) -> Option<FetchOutcome> {
        if self.stopped {
            return self.abandon_oldest();
        }
        if self.pending.is_empty() {
            return None;
        }
        match self.worker.wait(timeout) {
            Ok(Some(outcome)) => {
                self.pending.pop_front();
                Some(outcome)
            }
            Ok(None) => None,
            Err(_) => {
                self.mark_stopped();
                self.abandon_oldest()
            }
        }
    }
}
