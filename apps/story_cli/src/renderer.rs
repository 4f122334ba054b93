//! Headless stand-in for the story screen: keeps the visible frame in memory and
//! completes fades and animations on tokio timers.

use std::{collections::HashMap, time::Duration};

use shared::{
    domain::{ActionToken, AnimationId, DescriptionId, FadeDirection, FadeTarget, SegmentIndex},
    protocol::Effect,
};
use story_core::{EventSink, Renderer};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PROGRESS_LOG_STEP: u8 = 25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub active_segment: Option<SegmentIndex>,
    pub description: Option<DescriptionId>,
    pub animation: Option<AnimationId>,
    pub description_opacity: f32,
    pub section_opacity: f32,
    pub animation_playing: bool,
    pub completed: bool,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            active_segment: None,
            description: None,
            animation: None,
            description_opacity: 1.0,
            section_opacity: 1.0,
            animation_playing: false,
            completed: false,
        }
    }
}

impl Frame {
    fn opacity_mut(&mut self, target: FadeTarget) -> &mut f32 {
        match target {
            FadeTarget::Description => &mut self.description_opacity,
            FadeTarget::Section => &mut self.section_opacity,
        }
    }
}

struct Running {
    token: ActionToken,
    task: JoinHandle<()>,
}

pub struct SimulatedRenderer {
    animation_duration: Duration,
    emit_json: bool,
    frame: Frame,
    fades: HashMap<FadeTarget, Running>,
    animation: Option<Running>,
}

impl SimulatedRenderer {
    pub fn new(animation_duration: Duration, emit_json: bool) -> Self {
        Self {
            animation_duration,
            emit_json,
            frame: Frame::default(),
            fades: HashMap::new(),
            animation: None,
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    fn start_fade(
        &mut self,
        target: FadeTarget,
        direction: FadeDirection,
        duration: Duration,
        token: ActionToken,
        events: &EventSink,
    ) {
        if let Some(previous) = self.fades.remove(&target) {
            previous.task.abort();
        }
        // Opacity is reported at its end value; intermediate frames are not modelled.
        *self.frame.opacity_mut(target) = direction.target_opacity();
        let events = events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            events.fade_finished(target, token, true);
        });
        self.fades.insert(target, Running { token, task });
    }

    fn cancel_fade(&mut self, target: FadeTarget, events: &EventSink) {
        if let Some(running) = self.fades.remove(&target) {
            if !running.task.is_finished() {
                running.task.abort();
                events.fade_finished(target, running.token, false);
            }
        }
    }

    fn play_animation(&mut self, token: ActionToken, events: &EventSink) {
        if let Some(previous) = self.animation.take() {
            previous.task.abort();
        }
        self.frame.animation_playing = true;
        let duration = self.animation_duration;
        let events = events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            events.animation_finished(token, false);
        });
        self.animation = Some(Running { token, task });
    }

    fn cancel_animation(&mut self, events: &EventSink) {
        self.frame.animation_playing = false;
        if let Some(running) = self.animation.take() {
            if !running.task.is_finished() {
                running.task.abort();
                events.animation_finished(running.token, true);
            }
        }
    }
}

impl Renderer for SimulatedRenderer {
    fn apply(&mut self, effect: &Effect, events: &EventSink) {
        if self.emit_json {
            match serde_json::to_string(effect) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!(%err, "failed to encode effect"),
            }
        }

        match *effect {
            Effect::SetActiveSegment { segment } => {
                info!(%segment, "showing segment");
                self.frame.active_segment = Some(segment);
                self.frame.completed = false;
            }
            Effect::SetDescription { description } => {
                debug!(%description, "description swapped");
                self.frame.description = Some(description);
            }
            Effect::SetAnimation { animation } => {
                debug!(%animation, "animation source swapped");
                self.frame.animation = Some(animation);
                self.frame.animation_playing = false;
            }
            Effect::SetOpacity { target, value } => {
                *self.frame.opacity_mut(target) = value;
            }
            Effect::StartProgress {
                segment,
                duration_seconds,
                ..
            } => {
                debug!(%segment, duration_seconds, "segment progress restarted");
            }
            Effect::CancelProgress => debug!("segment progress cancelled"),
            Effect::StartFade {
                target,
                direction,
                duration_millis,
                token,
            } => {
                debug!(?target, ?direction, duration_millis, "fade started");
                self.start_fade(
                    target,
                    direction,
                    Duration::from_millis(duration_millis),
                    token,
                    events,
                );
            }
            Effect::CancelFade { target } => self.cancel_fade(target, events),
            Effect::PlayAnimation { token } => {
                debug!(animation = ?self.frame.animation, "playing animation from the start");
                self.play_animation(token, events);
            }
            Effect::CancelAnimation => self.cancel_animation(events),
            Effect::StoryCompleted => {
                info!("story complete");
                self.frame.completed = true;
                self.frame.active_segment = None;
            }
        }
    }

    fn progress(&mut self, segment: SegmentIndex, percent: u8) {
        if percent % PROGRESS_LOG_STEP == 0 {
            info!(%segment, percent, "segment progress");
        }
    }
}

impl Drop for SimulatedRenderer {
    fn drop(&mut self) {
        for (_, running) in self.fades.drain() {
            running.task.abort();
        }
        if let Some(running) = self.animation.take() {
            running.task.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
