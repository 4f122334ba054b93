use serde::{Deserialize, Serialize};

use crate::domain::{
    ActionToken, AnimationId, DescriptionId, FadeDirection, FadeTarget, SegmentIndex,
    SegmentState,
};

/// Notifications flowing from the renderer (and the segment timer) into the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StoryEvent {
    SegmentTapped {
        segment: SegmentIndex,
    },
    SegmentReset {
        segment: SegmentIndex,
    },
    SegmentCompleted {
        segment: SegmentIndex,
        token: ActionToken,
    },
    AnimationFinished {
        token: ActionToken,
        was_cancelled: bool,
    },
    FadeFinished {
        target: FadeTarget,
        token: ActionToken,
        was_completed: bool,
    },
    PartAdvanceRequested,
}

/// One-way instructions from the sequencer to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Effect {
    SetActiveSegment {
        segment: SegmentIndex,
    },
    SetDescription {
        description: DescriptionId,
    },
    SetAnimation {
        animation: AnimationId,
    },
    SetOpacity {
        target: FadeTarget,
        value: f32,
    },
    StartProgress {
        segment: SegmentIndex,
        duration_seconds: f64,
        token: ActionToken,
    },
    CancelProgress,
    StartFade {
        target: FadeTarget,
        direction: FadeDirection,
        duration_millis: u64,
        token: ActionToken,
    },
    CancelFade {
        target: FadeTarget,
    },
    PlayAnimation {
        token: ActionToken,
    },
    CancelAnimation,
    StoryCompleted,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SetActiveSegment { .. } => "set_active_segment",
            Effect::SetDescription { .. } => "set_description",
            Effect::SetAnimation { .. } => "set_animation",
            Effect::SetOpacity { .. } => "set_opacity",
            Effect::StartProgress { .. } => "start_progress",
            Effect::CancelProgress => "cancel_progress",
            Effect::StartFade { .. } => "start_fade",
            Effect::CancelFade { .. } => "cancel_fade",
            Effect::PlayAnimation { .. } => "play_animation",
            Effect::CancelAnimation => "cancel_animation",
            Effect::StoryCompleted => "story_completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub segment: SegmentIndex,
    pub state: SegmentState,
    pub progress: u8,
}
