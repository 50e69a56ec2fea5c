//! The per-globe render state driven by the host frame loop
//!
//! `GlobeEngine` owns the current and previous snapshots, the active filter,
//! the render buffers and the selection. Every mutation happens inside one
//! `&mut self` call, so a frame never observes a half-installed catalog.

use std::sync::Arc;

use glam::Vec3;
use serde::Serialize;

use crate::config::Settings;
use crate::data::{Catalog, FilterCount, FilterRegistry, RiskLevel, TelemetrySample};
use crate::renderer::{
    risk_hex, GeodeticProjector, Interpolator, RenderBufferManager, Selection, SnapshotBuilder,
    SnapshotMap,
};
use crate::telemetry::{FetchOutcome, TelemetryError};

/// Per-frame bookkeeping returned by [`GlobeEngine::tick`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameStats {
    pub frame: u64,
    pub markers: usize,
    /// Number of catalogs installed so far
    pub generation: u64,
    pub elapsed_since_swap_ms: f64,
}

/// Detail readout for the selected object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectDetail {
    pub sample: TelemetrySample,
    pub risk_level: RiskLevel,
    /// e.g. "Elevated (0.52)"
    pub risk_summary: String,
    pub risk_reason: Option<String>,
    pub color_hex: String,
    /// Render-space position written on the last frame
    #[serde(skip)]
    pub position: Option<Vec3>,
}

pub struct GlobeEngine {
    settings: Settings,
    builder: SnapshotBuilder,

    // Installed telemetry
    catalog: Arc<Catalog>,
    current: Arc<SnapshotMap>,
    previous: Arc<SnapshotMap>,
    last_swap_ms: f64,
    generation: u64,

    filters: FilterRegistry,
    buffers: RenderBufferManager,
    selection: Selection,

    last_error: Option<TelemetryError>,
    fetch_errors: u64,
    frames: u64,
    last_frame_ms: Option<f64>,
}

impl GlobeEngine {
    pub fn new(settings: Settings) -> Self {
        let settings = settings.sanitized();
        let builder = SnapshotBuilder::new(GeodeticProjector::new(settings.altitude_scale_km));
        let buffers = RenderBufferManager::new(Interpolator::new(
            settings.refresh_interval_ms,
            settings.interpolation_epsilon_ms,
        ));

        let mut filters = FilterRegistry::default();
        if !filters.select(&settings.default_filter) {
            log::warn!(
                "Default filter '{}' not found, showing all objects",
                settings.default_filter
            );
        }

        let empty = Arc::new(SnapshotMap::new());
        Self {
            settings,
            builder,
            catalog: Arc::new(Catalog::default()),
            previous: Arc::clone(&empty),
            current: empty,
            last_swap_ms: 0.0,
            generation: 0,
            filters,
            buffers,
            selection: Selection::default(),
            last_error: None,
            fetch_errors: 0,
            frames: 0,
            last_frame_ms: None,
        }
    }

    /// Install a freshly fetched catalog.
    ///
    /// The old current snapshot becomes the previous one; on the very first
    /// catalog both point at the new snapshot. Colors and the active layout
    /// are refreshed here, never per frame; positions start from the
    /// interpolated pose at `now_ms`.
    pub fn ingest(&mut self, catalog: Catalog, now_ms: f64) {
        let snapshot = Arc::new(self.builder.build(&catalog));
        let old = std::mem::replace(&mut self.current, snapshot);
        self.previous = if self.generation == 0 {
            Arc::clone(&self.current)
        } else {
            old
        };

        self.catalog = Arc::new(catalog);
        self.last_swap_ms = now_ms;
        self.generation += 1;
        self.last_error = None;

        log::info!(
            "Installed telemetry catalog #{} with {} objects",
            self.generation,
            self.catalog.len()
        );
        self.refresh_layout(now_ms);
    }

    /// Record a failed fetch; the installed snapshots are left untouched
    pub fn report_error(&mut self, error: TelemetryError) {
        log::warn!("{}", error);
        self.fetch_errors += 1;
        self.last_error = Some(error);
    }

    /// Apply one completed fetch
    pub fn apply_outcome(&mut self, outcome: FetchOutcome, now_ms: f64) {
        match outcome.result {
            Ok(catalog) => self.ingest(catalog, now_ms),
            Err(e) => self.report_error(e),
        }
    }

    /// Write this frame's interpolated positions
    pub fn tick(&mut self, now_ms: f64) -> FrameStats {
        self.buffers
            .update(&self.previous, &self.current, now_ms, self.last_swap_ms);
        self.frames += 1;
        self.last_frame_ms = Some(now_ms);

        FrameStats {
            frame: self.frames,
            markers: self.buffers.len(),
            generation: self.generation,
            elapsed_since_swap_ms: now_ms - self.last_swap_ms,
        }
    }

    /// Re-lay out the buffers and write the pose for `now_ms` so the new
    /// layout never draws markers snapped to their targets
    fn refresh_layout(&mut self, now_ms: f64) {
        let ids = self.filters.active_ids(&self.catalog);
        self.buffers.set_active(ids, &self.current);
        self.buffers
            .update(&self.previous, &self.current, now_ms, self.last_swap_ms);

        let buffers = &self.buffers;
        self.selection.revalidate(|id| buffers.contains(id));
    }

    /// Select a registered filter by name. Unknown names change nothing.
    pub fn set_filter(&mut self, name: &str) -> bool {
        if !self.filters.select(name) {
            return false;
        }
        log::info!("Filter '{}' selected", name);
        self.refresh_layout(self.layout_time_ms());
        true
    }

    /// Show only objects whose name (or NORAD id) matches `query`
    pub fn search(&mut self, query: &str) {
        self.filters.search(query);
        log::info!("Searching for '{}'", query);
        self.refresh_layout(self.layout_time_ms());
    }

    /// Time of the last drawn frame, never earlier than the last swap
    fn layout_time_ms(&self) -> f64 {
        match self.last_frame_ms {
            Some(frame_ms) => frame_ms.max(self.last_swap_ms),
            None => self.last_swap_ms,
        }
    }

    /// Select whatever is drawn at a buffer index
    pub fn pick(&mut self, index: usize) -> Option<u32> {
        self.selection.pick(&self.buffers, index)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn detail(&self) -> Option<ObjectDetail> {
        let id = self.selection.identity()?;
        let sample = self.catalog.get(id)?.clone();

        Some(ObjectDetail {
            risk_level: sample.risk_level,
            risk_summary: sample.risk_summary(),
            risk_reason: sample.risk_reason.clone(),
            color_hex: risk_hex(sample.risk_level),
            position: self.buffers.position_of(id),
            sample,
        })
    }

    pub fn selected_position(&self) -> Option<Vec3> {
        self.buffers.position_of(self.selection.identity()?)
    }

    pub fn filter_counts(&self) -> Vec<FilterCount> {
        self.filters.counts(&self.catalog)
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn buffers(&self) -> &RenderBufferManager {
        &self.buffers
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn current_snapshot(&self) -> &SnapshotMap {
        &self.current
    }

    pub fn previous_snapshot(&self) -> &SnapshotMap {
        &self.previous
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_swap_ms(&self) -> f64 {
        self.last_swap_ms
    }

    pub fn last_error(&self) -> Option<&TelemetryError> {
        self.last_error.as_ref()
    }

    /// Failed fetches since startup
    pub fn fetch_errors(&self) -> u64 {
        self.fetch_errors
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
