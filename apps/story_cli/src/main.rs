use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use story_core::{RuntimeOptions, StoryRuntime, StorySequencer, TapPolicy, TimerMode};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod renderer;
mod script;

use config::{load_settings, parse_tap_policy, parse_timer_mode, Settings, TableKind};
use renderer::SimulatedRenderer;
use script::{parse_reset, parse_tap, play_script, ScriptedInteraction};

/// Plays a segmented story headlessly against a simulated renderer.
#[derive(Parser, Debug)]
struct Args {
    /// TOML settings file; defaults to ./story.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    segments: Option<usize>,
    #[arg(long)]
    segment_duration: Option<f64>,
    #[arg(long)]
    fade_ms: Option<u64>,
    #[arg(long)]
    animation_ms: Option<u64>,
    #[arg(long, value_enum)]
    table: Option<TableKind>,
    #[arg(long, value_parser = parse_tap_policy)]
    tap_policy: Option<TapPolicy>,
    #[arg(long, value_parser = parse_timer_mode)]
    timer_mode: Option<TimerMode>,
    /// Tap a segment at an offset, as SECONDS:SEGMENT. Repeatable.
    #[arg(long = "tap", value_parser = parse_tap)]
    taps: Vec<ScriptedInteraction>,
    /// Reset the active segment at an offset, as SECONDS:SEGMENT. Repeatable.
    #[arg(long = "reset", value_parser = parse_reset)]
    resets: Vec<ScriptedInteraction>,
    /// Print every effect as a JSON line on stdout.
    #[arg(long)]
    emit_json: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.segments {
            settings.segment_count = v;
        }
        if let Some(v) = self.segment_duration {
            settings.segment_duration_seconds = v;
        }
        if let Some(v) = self.fade_ms {
            settings.fade_duration_millis = v;
        }
        if let Some(v) = self.animation_ms {
            settings.animation_duration_millis = v;
        }
        if let Some(v) = self.table {
            settings.table = v;
        }
        if let Some(v) = self.tap_policy {
            settings.tap_policy = v;
        }
        if let Some(v) = self.timer_mode {
            settings.timer_mode = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    args.apply(&mut settings);

    let table = settings
        .story_table()
        .context("failed to build story table")?;
    let sequencer = StorySequencer::new(table, settings.sequencer_config())
        .context("invalid sequencer configuration")?;
    let renderer = SimulatedRenderer::new(
        Duration::from_millis(settings.animation_duration_millis),
        args.emit_json,
    );
    let (runtime, sink) = StoryRuntime::new(
        sequencer,
        renderer,
        RuntimeOptions {
            timer_mode: settings.timer_mode,
            stop_on_complete: true,
        },
    );

    info!(
        segments = settings.segment_count,
        segment_duration_seconds = settings.segment_duration_seconds,
        tap_policy = ?settings.tap_policy,
        "playing story"
    );
    let started = Instant::now();
    let script = args.taps.iter().chain(&args.resets).copied().collect();
    let script = tokio::spawn(play_script(sink.clone(), started, script));

    let renderer = runtime.run().await;
    script.abort();
    drop(sink);

    let frame = renderer.frame();
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        completed = frame.completed,
        "story finished"
    );
    Ok(())
}
