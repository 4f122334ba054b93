//! Story part state machine: consumes [`StoryEvent`]s and emits [`Effect`]s.
//!
//! The sequencer performs no I/O and reads no clocks. Every timed operation it
//! asks the renderer to perform is armed in a [`TimerSlots`] entry under a fresh
//! [`ActionToken`]; a completion is acted on only when it carries the token that
//! is still armed, so work superseded by a tap or a reset can never advance
//! the story.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{
        ActionToken, AnimatedQuantity, FadeDirection, FadeTarget, PartIndex, SegmentIndex,
        SegmentState, TokenIssuer,
    },
    error::SequencerError,
    protocol::{Effect, StoryEvent},
};
use tracing::{debug, error, info, warn};

use crate::{
    story_table::{AdvanceTrigger, PhaseAction, StoryTable},
    timer_slot::TimerSlots,
};

pub const DEFAULT_SEGMENT_DURATION_SECONDS: f64 = 4.0;
pub const DEFAULT_FADE_DURATION_MILLIS: u64 = 750;

/// What a tap on a segment other than the active one does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapPolicy {
    /// Jump straight to the tapped segment's first part.
    #[default]
    DirectJump,
    /// Fade the section out first and jump once the fade completes.
    FadeThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub segment_duration_seconds: f64,
    pub fade_duration_millis: u64,
    pub tap_policy: TapPolicy,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            segment_duration_seconds: DEFAULT_SEGMENT_DURATION_SECONDS,
            fade_duration_millis: DEFAULT_FADE_DURATION_MILLIS,
            tap_policy: TapPolicy::default(),
        }
    }
}

impl SequencerConfig {
    pub fn validate(&self) -> Result<(), SequencerError> {
        if !self.segment_duration_seconds.is_finite() || self.segment_duration_seconds < 0.0 {
            return Err(SequencerError::invalid_config(format!(
                "segment duration must be a non-negative number of seconds, got {}",
                self.segment_duration_seconds
            )));
        }
        Duration::try_from_secs_f64(self.segment_duration_seconds).map_err(|err| {
            SequencerError::invalid_config(format!(
                "segment duration of {} seconds is out of range: {err}",
                self.segment_duration_seconds
            ))
        })?;
        Ok(())
    }
}

/// Completions observed for the active segment that the current part was not waiting on.
#[derive(Debug, Clone, Copy, Default)]
struct Observed {
    progress_finished: bool,
    animation_finished: bool,
}

#[derive(Debug)]
pub struct StorySequencer {
    table: StoryTable,
    config: SequencerConfig,
    part: PartIndex,
    tokens: TokenIssuer,
    slots: TimerSlots,
    observed: Observed,
    pending_jump: Option<PartIndex>,
    frozen: bool,
}

impl StorySequencer {
    pub fn new(table: StoryTable, config: SequencerConfig) -> Result<Self, SequencerError> {
        config.validate()?;
        Ok(Self {
            table,
            config,
            part: PartIndex(0),
            tokens: TokenIssuer::new(),
            slots: TimerSlots::default(),
            observed: Observed::default(),
            pending_jump: None,
            frozen: false,
        })
    }

    pub fn table(&self) -> &StoryTable {
        &self.table
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn part(&self) -> PartIndex {
        self.part
    }

    pub fn total_parts(&self) -> usize {
        self.table.total_parts()
    }

    pub fn is_complete(&self) -> bool {
        self.part.0 >= self.table.total_parts()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn pending_jump(&self) -> Option<PartIndex> {
        self.pending_jump
    }

    pub fn slots(&self) -> &TimerSlots {
        &self.slots
    }

    /// `None` once the story has completed.
    pub fn active_segment(&self) -> Option<SegmentIndex> {
        self.table.segment_of(self.part).ok()
    }

    pub fn segment_states(&self) -> Vec<SegmentState> {
        let active = self.active_segment();
        (0..self.table.segment_count())
            .map(|index| SegmentState::derive(SegmentIndex(index), active))
            .collect()
    }

    /// Applies the current part; used once when the story is first shown.
    pub fn start(&mut self) -> Vec<Effect> {
        info!(
            segments = self.table.segment_count(),
            parts = self.table.total_parts(),
            "starting story"
        );
        self.enter(self.part)
    }

    pub fn handle(&mut self, event: StoryEvent) -> Result<Vec<Effect>, SequencerError> {
        match event {
            StoryEvent::SegmentTapped { segment } => self.segment_tapped(segment),
            StoryEvent::SegmentReset { segment } => self.segment_reset(segment),
            StoryEvent::SegmentCompleted { segment, token } => {
                Ok(self.segment_completed(segment, token))
            }
            StoryEvent::AnimationFinished {
                token,
                was_cancelled,
            } => Ok(self.animation_finished(token, was_cancelled)),
            StoryEvent::FadeFinished {
                target,
                token,
                was_completed,
            } => Ok(self.fade_finished(target, token, was_completed)),
            StoryEvent::PartAdvanceRequested => Ok(self.advance()),
        }
    }

    pub fn segment_tapped(&mut self, segment: SegmentIndex) -> Result<Vec<Effect>, SequencerError> {
        let target = self.validate_segment(segment)?;
        let jump_from = self.active_segment();
        debug!(%segment, part = %self.part, %target, "segment tapped");

        let mut effects = self.slots.cancel_all();
        self.pending_jump = None;
        self.frozen = false;

        let fade_first = self.config.tap_policy == TapPolicy::FadeThrough
            && jump_from.is_some_and(|active| active != segment);
        if fade_first {
            let token = self
                .slots
                .arm(AnimatedQuantity::SectionFade, &mut self.tokens, &mut effects);
            effects.push(Effect::StartFade {
                target: FadeTarget::Section,
                direction: FadeDirection::Out,
                duration_millis: self.config.fade_duration_millis,
                token,
            });
            self.pending_jump = Some(target);
            return Ok(effects);
        }

        effects.extend(self.jump_to(target));
        Ok(effects)
    }

    /// Restarts the active segment from its first part without moving to another segment.
    pub fn segment_reset(&mut self, segment: SegmentIndex) -> Result<Vec<Effect>, SequencerError> {
        let target = self.validate_segment(segment)?;
        let active = self.active_segment();
        if active != Some(segment) {
            warn!(%segment, ?active, "reset requested for a segment that is not active");
            return Err(SequencerError::NotActiveSegment {
                index: segment,
                active,
            });
        }

        debug!(%segment, part = %self.part, "resetting active segment");
        let mut effects = self.slots.cancel_all();
        self.pending_jump = None;
        self.frozen = false;
        effects.extend(self.jump_to(target));
        Ok(effects)
    }

    pub fn segment_completed(&mut self, segment: SegmentIndex, token: ActionToken) -> Vec<Effect> {
        if !self
            .slots
            .get_mut(AnimatedQuantity::SegmentProgress)
            .settle(token)
        {
            debug!(%segment, %token, "discarding stale segment completion");
            return Vec::new();
        }

        info!(%segment, part = %self.part, "segment progress complete");
        self.observed.progress_finished = true;
        self.advance_if_waiting_on(AdvanceTrigger::SegmentCompleted)
    }

    pub fn animation_finished(&mut self, token: ActionToken, was_cancelled: bool) -> Vec<Effect> {
        if !self.slots.get_mut(AnimatedQuantity::Animation).settle(token) {
            debug!(%token, "discarding stale animation completion");
            return Vec::new();
        }
        if was_cancelled {
            debug!(%token, part = %self.part, "animation was cancelled; not advancing");
            return Vec::new();
        }

        self.observed.animation_finished = true;
        self.advance_if_waiting_on(AdvanceTrigger::AnimationFinished)
    }

    pub fn fade_finished(
        &mut self,
        target: FadeTarget,
        token: ActionToken,
        was_completed: bool,
    ) -> Vec<Effect> {
        if !self.slots.get_mut(target.into()).settle(token) {
            debug!(?target, %token, "discarding stale fade completion");
            return Vec::new();
        }
        if !was_completed {
            debug!(?target, %token, part = %self.part, "fade was interrupted; not advancing");
            return Vec::new();
        }

        if let Some(jump) = self.pending_jump.take() {
            debug!(%jump, "tap fade finished; jumping");
            return self.jump_to(jump);
        }

        let waits_on_this_fade = self.table.phase(self.part).is_some_and(|phase| {
            phase.advance_on == AdvanceTrigger::FadeFinished
                && phase.action.fade_target() == Some(target)
        });
        if waits_on_this_fade {
            self.advance()
        } else {
            debug!(?target, part = %self.part, "fade finished; part waits on another trigger");
            Vec::new()
        }
    }

    pub fn advance(&mut self) -> Vec<Effect> {
        if self.is_complete() {
            info!(part = %self.part, "story already complete; ignoring advance");
            return Vec::new();
        }
        if self.frozen {
            warn!(part = %self.part, "sequencer is frozen; ignoring advance");
            return Vec::new();
        }

        let next = PartIndex(self.part.0 + 1);
        debug!(from = %self.part, to = %next, "advancing story part");
        self.part = next;
        self.enter(next)
    }

    /// Cancels every armed timer, fade, and animation.
    pub fn teardown(&mut self) -> Vec<Effect> {
        debug!(part = %self.part, "tearing down sequencer");
        self.pending_jump = None;
        self.slots.cancel_all()
    }

    fn validate_segment(&self, segment: SegmentIndex) -> Result<PartIndex, SequencerError> {
        self.table.first_part_of(segment).inspect_err(|err| {
            warn!(%segment, %err, "rejecting segment interaction");
        })
    }

    /// Sets `part` and re-applies it even when it is already current, so a tap on the
    /// active segment restarts its work.
    fn jump_to(&mut self, part: PartIndex) -> Vec<Effect> {
        if part == self.part {
            debug!(%part, "re-entering current part");
        }
        self.part = part;
        self.enter(part)
    }

    fn advance_if_waiting_on(&mut self, trigger: AdvanceTrigger) -> Vec<Effect> {
        match self.table.phase(self.part) {
            Some(phase) if phase.advance_on == trigger => self.advance(),
            Some(phase) => {
                debug!(
                    part = %self.part,
                    ?trigger,
                    waiting_on = ?phase.advance_on,
                    "completion recorded; part waits on another trigger"
                );
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn trigger_already_observed(&self, trigger: AdvanceTrigger) -> bool {
        match trigger {
            AdvanceTrigger::SegmentCompleted => self.observed.progress_finished,
            AdvanceTrigger::AnimationFinished => self.observed.animation_finished,
            AdvanceTrigger::FadeFinished => false,
        }
    }

    fn enter(&mut self, part: PartIndex) -> Vec<Effect> {
        let mut effects = Vec::new();
        let mut part = part;

        loop {
            if part.0 == self.table.total_parts() {
                effects.extend(self.slots.cancel_all());
                effects.push(Effect::StoryCompleted);
                info!(%part, "story sequence completed");
                return effects;
            }

            let Some(phase) = self.table.phase(part).copied() else {
                error!(
                    %part,
                    total_parts = self.table.total_parts(),
                    "story part has no phase; freezing"
                );
                self.frozen = true;
                return effects;
            };

            match phase.action {
                PhaseAction::BeginSegment => {
                    effects.extend(self.slots.cancel_all());
                    self.observed = Observed::default();
                    info!(segment = %phase.segment, %part, "beginning segment");

                    effects.push(Effect::SetOpacity {
                        target: FadeTarget::Section,
                        value: FadeDirection::In.target_opacity(),
                    });
                    effects.push(Effect::SetOpacity {
                        target: FadeTarget::Description,
                        value: FadeDirection::In.target_opacity(),
                    });
                    effects.push(Effect::SetActiveSegment {
                        segment: phase.segment,
                    });
                    if let Some(description) = phase.description {
                        effects.push(Effect::SetDescription { description });
                    }
                    if let Some(animation) = phase.animation {
                        effects.push(Effect::SetAnimation { animation });
                    }

                    let token = self.slots.arm(
                        AnimatedQuantity::SegmentProgress,
                        &mut self.tokens,
                        &mut effects,
                    );
                    effects.push(Effect::StartProgress {
                        segment: phase.segment,
                        duration_seconds: self.config.segment_duration_seconds,
                        token,
                    });

                    let token =
                        self.slots
                            .arm(AnimatedQuantity::Animation, &mut self.tokens, &mut effects);
                    effects.push(Effect::PlayAnimation { token });
                }
                PhaseAction::FadeOut { target } => {
                    effects.push(Effect::SetOpacity {
                        target,
                        value: FadeDirection::In.target_opacity(),
                    });
                    let token = self
                        .slots
                        .arm(target.into(), &mut self.tokens, &mut effects);
                    effects.push(Effect::StartFade {
                        target,
                        direction: FadeDirection::Out,
                        duration_millis: self.config.fade_duration_millis,
                        token,
                    });
                }
                PhaseAction::SwapAndFadeIn { target } => {
                    effects.push(Effect::SetOpacity {
                        target,
                        value: FadeDirection::Out.target_opacity(),
                    });
                    if let Some(description) = phase.description {
                        effects.push(Effect::SetDescription { description });
                    }
                    if let Some(animation) = phase.animation {
                        self.slots
                            .cancel(AnimatedQuantity::Animation, &mut effects);
                        self.observed.animation_finished = false;
                        effects.push(Effect::SetAnimation { animation });
                    }
                    let token = self
                        .slots
                        .arm(target.into(), &mut self.tokens, &mut effects);
                    effects.push(Effect::StartFade {
                        target,
                        direction: FadeDirection::In,
                        duration_millis: self.config.fade_duration_millis,
                        token,
                    });
                }
            }

            if !self.trigger_already_observed(phase.advance_on) {
                return effects;
            }

            debug!(%part, trigger = ?phase.advance_on, "trigger already observed; advancing");
            part = PartIndex(part.0 + 1);
            self.part = part;
        }
    }
}

#[cfg(test)]
#[path = "tests/sequencer_tests.rs"]
mod tests;
