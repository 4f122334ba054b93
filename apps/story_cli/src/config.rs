use std::{fs, path::Path};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use shared::error::SequencerError;
use story_core::{
    PhaseDescriptor, SequencerConfig, StoryTable, TapPolicy, TimerMode,
};

pub const DEFAULT_CONFIG_FILE: &str = "story.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// The built-in four segment story with fades between sections.
    #[default]
    Showcase,
    /// One part per segment, advancing on each segment timer.
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub segment_count: usize,
    pub segment_duration_seconds: f64,
    pub fade_duration_millis: u64,
    pub tap_policy: TapPolicy,
    pub table: TableKind,
    pub timer_mode: TimerMode,
    pub animation_duration_millis: u64,
    pub phases: Option<Vec<PhaseDescriptor>>,
}

impl Default for Settings {
    fn default() -> Self {
        let sequencer = SequencerConfig::default();
        Self {
            segment_count: 4,
            segment_duration_seconds: sequencer.segment_duration_seconds,
            fade_duration_millis: sequencer.fade_duration_millis,
            tap_policy: sequencer.tap_policy,
            table: TableKind::default(),
            timer_mode: TimerMode::default(),
            animation_duration_millis: 2_500,
            phases: None,
        }
    }
}

impl Settings {
    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            segment_duration_seconds: self.segment_duration_seconds,
            fade_duration_millis: self.fade_duration_millis,
            tap_policy: self.tap_policy,
        }
    }

    /// An explicit `phases` list wins over the named table.
    pub fn story_table(&self) -> Result<StoryTable, SequencerError> {
        if let Some(phases) = &self.phases {
            return StoryTable::new(self.segment_count, phases.clone());
        }

        match self.table {
            TableKind::Showcase => {
                let table = StoryTable::showcase();
                if table.segment_count() != self.segment_count {
                    return Err(SequencerError::invalid_config(format!(
                        "the showcase story has {} segments, configured {}",
                        table.segment_count(),
                        self.segment_count
                    )));
                }
                Ok(table)
            }
            TableKind::Uniform => StoryTable::uniform(self.segment_count),
        }
    }
}

/// Defaults, then the config file, then `APP__*` environment overrides.
///
/// A missing default `story.toml` is ignored; a missing explicit `path` is an error.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            parse_settings(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?
        }
        None => match fs::read_to_string(DEFAULT_CONFIG_FILE) {
            Ok(raw) => parse_settings(&raw)
                .with_context(|| format!("failed to parse {DEFAULT_CONFIG_FILE}"))?,
            Err(_) => Settings::default(),
        },
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

pub fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(raw)?)
}

pub fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__SEGMENT_COUNT") {
        settings.segment_count = v
            .parse::<usize>()
            .with_context(|| format!("APP__SEGMENT_COUNT is not a count: '{v}'"))?;
    }
    if let Some(v) = lookup("APP__SEGMENT_DURATION_SECONDS") {
        settings.segment_duration_seconds = v
            .parse::<f64>()
            .with_context(|| format!("APP__SEGMENT_DURATION_SECONDS is not a number: '{v}'"))?;
    }
    if let Some(v) = lookup("APP__FADE_DURATION_MILLIS") {
        settings.fade_duration_millis = v
            .parse::<u64>()
            .with_context(|| format!("APP__FADE_DURATION_MILLIS is not a duration: '{v}'"))?;
    }
    if let Some(v) = lookup("APP__ANIMATION_DURATION_MILLIS") {
        settings.animation_duration_millis = v.parse::<u64>().with_context(|| {
            format!("APP__ANIMATION_DURATION_MILLIS is not a duration: '{v}'")
        })?;
    }
    if let Some(v) = lookup("APP__TAP_POLICY") {
        settings.tap_policy = parse_tap_policy(&v).map_err(|err| anyhow!(err))?;
    }
    if let Some(v) = lookup("APP__TIMER_MODE") {
        settings.timer_mode = parse_timer_mode(&v).map_err(|err| anyhow!(err))?;
    }
    if let Some(v) = lookup("APP__TABLE") {
        settings.table = match v.to_ascii_lowercase().as_str() {
            "showcase" => TableKind::Showcase,
            "uniform" => TableKind::Uniform,
            _ => return Err(anyhow!("APP__TABLE must be 'showcase' or 'uniform', got '{v}'")),
        };
    }
    Ok(())
}

pub fn parse_tap_policy(raw: &str) -> Result<TapPolicy, String> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "direct_jump" | "direct" => Ok(TapPolicy::DirectJump),
        "fade_through" | "fade" => Ok(TapPolicy::FadeThrough),
        other => Err(format!(
            "unknown tap policy '{other}'; expected direct_jump or fade_through"
        )),
    }
}

pub fn parse_timer_mode(raw: &str) -> Result<TimerMode, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "discrete" => Ok(TimerMode::Discrete),
        "continuous" => Ok(TimerMode::Continuous),
        other => Err(format!(
            "unknown timer mode '{other}'; expected discrete or continuous"
        )),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
