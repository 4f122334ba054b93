//! Scripted indicator interactions injected while a story plays.

use std::time::Duration;

use shared::domain::SegmentIndex;
use story_core::EventSink;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Tap(SegmentIndex),
    Reset(SegmentIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedInteraction {
    pub at: Duration,
    pub interaction: Interaction,
}

fn parse_timed_segment(raw: &str) -> Result<(Duration, SegmentIndex), String> {
    let (at, segment) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected SECONDS:SEGMENT, got '{raw}'"))?;
    let at = at
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid time '{at}': {err}"))?;
    let at = Duration::try_from_secs_f64(at).map_err(|err| format!("invalid time '{at}': {err}"))?;
    let segment = segment
        .trim()
        .parse::<usize>()
        .map_err(|err| format!("invalid segment '{segment}': {err}"))?;
    Ok((at, SegmentIndex(segment)))
}

pub fn parse_tap(raw: &str) -> Result<ScriptedInteraction, String> {
    let (at, segment) = parse_timed_segment(raw)?;
    Ok(ScriptedInteraction {
        at,
        interaction: Interaction::Tap(segment),
    })
}

pub fn parse_reset(raw: &str) -> Result<ScriptedInteraction, String> {
    let (at, segment) = parse_timed_segment(raw)?;
    Ok(ScriptedInteraction {
        at,
        interaction: Interaction::Reset(segment),
    })
}

/// Sends each interaction at its offset from `started`; stops early once the runtime is gone.
pub async fn play_script(sink: EventSink, started: Instant, mut script: Vec<ScriptedInteraction>) {
    script.sort_by_key(|step| step.at);
    for step in script {
        tokio::time::sleep_until(started + step.at).await;
        info!(at = ?step.at, interaction = ?step.interaction, "scripted interaction");
        let delivered = match step.interaction {
            Interaction::Tap(segment) => sink.tap(segment),
            Interaction::Reset(segment) => sink.reset(segment),
        };
        if !delivered {
            debug!("story runtime stopped; dropping remaining script");
            return;
        }
    }
}
