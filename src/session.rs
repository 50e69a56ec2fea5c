//! A globe engine wired to a polled telemetry source

use std::time::Duration;

use crate::config::Settings;
use crate::engine::{FrameStats, GlobeEngine};
use crate::telemetry::{TelemetryFeed, TelemetrySource};

pub struct GlobeSession {
    engine: GlobeEngine,
    feed: TelemetryFeed,
}

impl GlobeSession {
    pub fn new(settings: Settings, source: Box<dyn TelemetrySource>) -> Self {
        let engine = GlobeEngine::new(settings);
        let feed = TelemetryFeed::new(source, engine.settings().refresh_interval_ms);
        Self { engine, feed }
    }

    /// One frame: ingest finished fetches, poll if due, then interpolate
    pub fn tick(&mut self, now_ms: f64) -> FrameStats {
        for outcome in self.feed.poll() {
            self.engine.apply_outcome(outcome, now_ms);
        }
        if let Err(e) = self.feed.schedule(now_ms) {
            self.engine.report_error(e);
        }
        self.engine.tick(now_ms)
    }

    /// Fetch now, outside the regular schedule
    pub fn force_refresh(&mut self, now_ms: f64) {
        if let Err(e) = self.feed.force_refresh(now_ms) {
            self.engine.report_error(e);
        }
    }

    /// Block until an outstanding fetch completes and install it.
    /// Returns false when nothing arrived within `timeout`.
    pub fn wait_for_fetch(&mut self, timeout: Duration, now_ms: f64) -> bool {
        match self.feed.wait(timeout) {
            Some(outcome) => {
                self.engine.apply_outcome(outcome, now_ms);
                true
            }
            None => false,
        }
    }

    pub fn engine(&self) -> &GlobeEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GlobeEngine {
        &mut self.engine
    }

    pub fn feed(&self) -> &TelemetryFeed {
        &self.feed
    }
}
