//! Headless replay and catalog inspection
//!
//! `replay` drives a [`GlobeSession`] on a simulated clock, one frame at a
//! time at the configured rate, and writes a JSON summary of what the render
//! buffers saw. Every due fetch is awaited before the frame continues so a
//! run is reproducible.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::config::Settings;
use crate::data::{load_catalog, CatalogStats, FilterCount, FilterRegistry, RiskLevel};
use crate::engine::ObjectDetail;
use crate::propagation::TleTelemetrySource;
use crate::session::GlobeSession;
use crate::telemetry::{FileTelemetrySource, TelemetrySource};

/// How long a single fetch may take before the replay gives up on it
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings overrides shared by the subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Telemetry refresh interval in milliseconds
    #[arg(long)]
    pub refresh_ms: Option<f64>,
    /// Kilometres of altitude per earth radius of marker separation
    #[arg(long)]
    pub altitude_scale_km: Option<f64>,
    /// Frames per second of simulated time
    #[arg(long)]
    pub fps: Option<f32>,
    /// Filter to select (all, low, elevated, high, starlink, leo, ...)
    #[arg(long)]
    pub filter: Option<String>,
}

impl SettingsArgs {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(refresh_ms) = self.refresh_ms {
            settings.refresh_interval_ms = refresh_ms;
        }
        if let Some(scale) = self.altitude_scale_km {
            settings.altitude_scale_km = scale;
        }
        if let Some(fps) = self.fps {
            settings.max_fps = fps;
        }
        if let Some(filter) = &self.filter {
            settings.default_filter = filter.clone();
        }
        settings.sanitized()
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Catalog JSON files (optionally .gz), installed one per refresh
    pub catalogs: Vec<PathBuf>,
    /// Propagate this TLE file instead of reading catalogs
    #[arg(long, conflicts_with = "catalogs")]
    pub tle: Option<PathBuf>,
    /// Simulated start time (RFC 3339); defaults to now
    #[arg(long)]
    pub start: Option<String>,
    /// Simulated duration in seconds; defaults to one refresh per catalog
    #[arg(long)]
    pub duration_s: Option<f64>,
    /// Narrow the active set to names containing this text
    #[arg(long)]
    pub search: Option<String>,
    /// Buffer index to pick at the end of the run
    #[arg(long)]
    pub pick: Option<usize>,
    /// Output JSON file path
    #[arg(long, default_value = "out/replay_summary.json")]
    pub output: PathBuf,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    /// Catalog JSON file (optionally .gz)
    pub catalog: PathBuf,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
    #[command(flatten)]
    pub settings: SettingsArgs,
}

#[derive(Debug, Serialize)]
struct CatalogSwap {
    generation: u64,
    simulated_ms: f64,
    objects: usize,
    markers: usize,
    buffer_reallocations: u64,
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    generated_at: String,
    source: String,
    start_time_utc: String,
    simulated_ms: f64,
    frames: u64,
    filter: String,
    catalogs_installed: u64,
    fetch_errors: u64,
    last_error: Option<String>,
    max_markers: usize,
    final_markers: usize,
    swaps: Vec<CatalogSwap>,
    filter_counts: Vec<FilterCount>,
    selected: Option<ObjectDetail>,
}

fn parse_start_ms(start: Option<&str>) -> Result<i64> {
    match start {
        Some(text) => {
            let time = chrono::DateTime::parse_from_rfc3339(text)
                .with_context(|| format!("Invalid start time: {}", text))?;
            Ok(time.timestamp_millis())
        }
        None => Ok(chrono::Utc::now().timestamp_millis()),
    }
}

fn build_source(args: &ReplayArgs) -> Result<(Box<dyn TelemetrySource>, usize)> {
    if let Some(path) = &args.tle {
        let source = TleTelemetrySource::load(path)?;
        if source.propagator().is_empty() {
            return Err(anyhow!("no usable element sets in {:?}", path));
        }
        return Ok((Box::new(source), 1));
    }
    if args.catalogs.is_empty() {
        return Err(anyhow!("give at least one catalog file or --tle"));
    }
    let count = args.catalogs.len();
    Ok((
        Box::new(FileTelemetrySource::sequence(args.catalogs.clone())),
        count,
    ))
}

pub fn run_replay(args: ReplayArgs, settings: Settings) -> Result<()> {
    let settings = args.settings.apply(settings);
    let start_ms = parse_start_ms(args.start.as_deref())?;
    let (source, refreshes) = build_source(&args)?;
    let source_name = source.name().to_string();

    let duration_ms = match args.duration_s {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => seconds * 1000.0,
        Some(seconds) => return Err(anyhow!("duration-s must be > 0, got {}", seconds)),
        None => refreshes as f64 * settings.refresh_interval_ms,
    };
    let frame_ms = settings.frame_interval_ms();
    let total_frames = (duration_ms / frame_ms).ceil().max(1.0) as u64;

    log::info!(
        "Replaying '{}' for {:.1} s ({} frames at {} fps)",
        source_name,
        duration_ms / 1000.0,
        total_frames,
        settings.max_fps
    );

    let mut session = GlobeSession::new(settings, source);
    if let Some(query) = &args.search {
        session.engine_mut().search(query);
    }

    let progress = ProgressBar::new(total_frames);
    progress.set_style(
        ProgressStyle::with_template(
            "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} frames {msg}",
        )
        .map_err(|e| anyhow!("invalid progress template: {}", e))?
        .progress_chars("##-"),
    );

    let mut swaps = Vec::new();
    let mut max_markers = 0;

    for frame in 0..total_frames {
        let now_ms = start_ms as f64 + frame as f64 * frame_ms;
        session.tick(now_ms);

        while session.feed().in_flight() > 0 {
            let generation = session.engine().generation();
            if !session.wait_for_fetch(FETCH_TIMEOUT, now_ms) {
                progress.abandon();
                return Err(anyhow!("telemetry fetch timed out after {:?}", FETCH_TIMEOUT));
            }

            let engine = session.engine();
            if engine.generation() != generation {
                swaps.push(CatalogSwap {
                    generation: engine.generation(),
                    simulated_ms: now_ms - start_ms as f64,
                    objects: engine.catalog().len(),
                    markers: engine.buffers().len(),
                    buffer_reallocations: engine.buffers().reallocations(),
                });
                progress.set_message(format!("catalog #{}", engine.generation()));
            }
        }

        max_markers = max_markers.max(session.engine().buffers().len());
        progress.inc(1);
    }

    progress.finish_and_clear();

    let engine = session.engine_mut();
    if let Some(index) = args.pick {
        if engine.pick(index).is_none() {
            log::warn!("No marker at index {}", index);
        }
    }

    let summary = ReplaySummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        source: source_name,
        start_time_utc: chrono::DateTime::<chrono::Utc>::from_timestamp_millis(start_ms)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
        simulated_ms: total_frames as f64 * frame_ms,
        frames: total_frames,
        filter: engine.filters().selected().name.clone(),
        catalogs_installed: engine.generation(),
        fetch_errors: engine.fetch_errors(),
        last_error: engine.last_error().map(|e| e.to_string()),
        max_markers,
        final_markers: engine.buffers().len(),
        swaps,
        filter_counts: engine.filter_counts(),
        selected: engine.detail(),
    };

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("Failed to create {:?}", args.output))?;
    serde_json::to_writer_pretty(file, &summary)?;

    log::info!(
        "Installed {} catalogs ({} failed fetches); wrote summary to {:?}",
        summary.catalogs_installed,
        summary.fetch_errors,
        args.output
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct InspectReport {
    stats: CatalogStats,
    filter_counts: Vec<FilterCount>,
}

pub fn run_inspect(args: InspectArgs, settings: Settings) -> Result<()> {
    let settings = args.settings.apply(settings);
    let catalog = load_catalog(&args.catalog, chrono::Utc::now().timestamp_millis())?;

    let mut registry = FilterRegistry::default();
    registry.select(&settings.default_filter);

    let report = InspectReport {
        stats: CatalogStats::from_catalog(&catalog),
        filter_counts: registry.counts(&catalog),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} objects in {:?}", report.stats.total_objects, args.catalog);
    for level in RiskLevel::all() {
        let count = catalog.iter().filter(|s| s.risk_level == *level).count();
        println!("  {:<10} {:>8}", level.label(), count);
    }
    println!();
    for count in &report.filter_counts {
        let marker = if count.name == registry.selected().name {
            "*"
        } else {
            " "
        };
        println!("{} {:<10} {:>8}", marker, count.name, count.count);
    }
    Ok(())
}
