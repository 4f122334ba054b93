//! Declarative mapping from story parts to segments and the work each part performs.

use serde::{Deserialize, Serialize};
use shared::{
    domain::{AnimationId, DescriptionId, FadeTarget, PartIndex, SegmentIndex},
    error::SequencerError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseAction {
    /// Snap both fades visible, show the segment's content, restart progress and animation.
    BeginSegment,
    FadeOut { target: FadeTarget },
    /// Swap in the phase's description and animation while `target` is hidden, then fade it in.
    SwapAndFadeIn { target: FadeTarget },
}

impl PhaseAction {
    pub fn fade_target(self) -> Option<FadeTarget> {
        match self {
            PhaseAction::BeginSegment => None,
            PhaseAction::FadeOut { target } | PhaseAction::SwapAndFadeIn { target } => {
                Some(target)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceTrigger {
    SegmentCompleted,
    AnimationFinished,
    FadeFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDescriptor {
    pub segment: SegmentIndex,
    pub action: PhaseAction,
    #[serde(default)]
    pub description: Option<DescriptionId>,
    #[serde(default)]
    pub animation: Option<AnimationId>,
    pub advance_on: AdvanceTrigger,
}

impl PhaseDescriptor {
    pub fn begin(segment: usize, content: u32, advance_on: AdvanceTrigger) -> Self {
        Self {
            segment: SegmentIndex(segment),
            action: PhaseAction::BeginSegment,
            description: Some(DescriptionId(content)),
            animation: Some(AnimationId(content)),
            advance_on,
        }
    }

    pub fn fade_out(segment: usize, target: FadeTarget) -> Self {
        Self {
            segment: SegmentIndex(segment),
            action: PhaseAction::FadeOut { target },
            description: None,
            animation: None,
            advance_on: AdvanceTrigger::FadeFinished,
        }
    }

    pub fn swap_and_fade_in(
        segment: usize,
        target: FadeTarget,
        content: u32,
        advance_on: AdvanceTrigger,
    ) -> Self {
        Self {
            segment: SegmentIndex(segment),
            action: PhaseAction::SwapAndFadeIn { target },
            description: Some(DescriptionId(content)),
            animation: Some(AnimationId(content)),
            advance_on,
        }
    }
}

/// Serialized form of a [`StoryTable`]; validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryTableDef {
    pub segment_count: usize,
    pub phases: Vec<PhaseDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoryTableDef", into = "StoryTableDef")]
pub struct StoryTable {
    segment_count: usize,
    phases: Vec<PhaseDescriptor>,
    first_parts: Vec<PartIndex>,
}

impl TryFrom<StoryTableDef> for StoryTable {
    type Error = SequencerError;

    fn try_from(value: StoryTableDef) -> Result<Self, Self::Error> {
        Self::new(value.segment_count, value.phases)
    }
}

impl From<StoryTable> for StoryTableDef {
    fn from(value: StoryTable) -> Self {
        Self {
            segment_count: value.segment_count,
            phases: value.phases,
        }
    }
}

impl StoryTable {
    pub fn new(
        segment_count: usize,
        phases: Vec<PhaseDescriptor>,
    ) -> Result<Self, SequencerError> {
        if segment_count == 0 {
            return Err(SequencerError::invalid_config(
                "a story needs at least one segment",
            ));
        }
        if phases.is_empty() {
            return Err(SequencerError::invalid_config(
                "a story needs at least one phase",
            ));
        }

        let mut first_parts = Vec::with_capacity(segment_count);
        // Whether the segment's current animation can still report completion.
        let mut animation_playing = false;
        for (part, phase) in phases.iter().enumerate() {
            let segment = phase.segment.0;
            if segment >= segment_count {
                return Err(SequencerError::invalid_config(format!(
                    "part {part} names segment {segment} but the story has {segment_count} segments"
                )));
            }

            let opens_segment = segment == first_parts.len();
            if segment > first_parts.len() {
                return Err(SequencerError::invalid_config(format!(
                    "part {part} skips ahead to segment {segment}; segment {} has no phases",
                    first_parts.len()
                )));
            }
            if segment + 1 < first_parts.len() {
                return Err(SequencerError::invalid_config(format!(
                    "part {part} returns to segment {segment} after segment {} began",
                    first_parts.len() - 1
                )));
            }

            match (opens_segment, phase.action) {
                (true, PhaseAction::BeginSegment) => first_parts.push(PartIndex(part)),
                (true, _) => {
                    return Err(SequencerError::invalid_config(format!(
                        "part {part} opens segment {segment} but is not a begin_segment phase"
                    )))
                }
                (false, PhaseAction::BeginSegment) => {
                    return Err(SequencerError::invalid_config(format!(
                        "part {part} begins segment {segment} a second time"
                    )))
                }
                (false, _) => {}
            }

            if phase.action == PhaseAction::BeginSegment {
                if phase.description.is_none() || phase.animation.is_none() {
                    return Err(SequencerError::invalid_config(format!(
                        "part {part} begins segment {segment} without a description and animation"
                    )));
                }
                if phase.advance_on == AdvanceTrigger::FadeFinished {
                    return Err(SequencerError::invalid_config(format!(
                        "part {part} waits for a fade but begin_segment starts none"
                    )));
                }
            }

            match phase.action {
                PhaseAction::BeginSegment => animation_playing = true,
                PhaseAction::SwapAndFadeIn { .. } if phase.animation.is_some() => {
                    animation_playing = false
                }
                _ => {}
            }
            if phase.advance_on == AdvanceTrigger::AnimationFinished && !animation_playing {
                return Err(SequencerError::invalid_config(format!(
                    "part {part} waits for an animation that was swapped out and never replays"
                )));
            }
        }

        if first_parts.len() != segment_count {
            return Err(SequencerError::invalid_config(format!(
                "phases cover {} of {segment_count} segments",
                first_parts.len()
            )));
        }

        Ok(Self {
            segment_count,
            phases,
            first_parts,
        })
    }

    /// One part per segment, each advancing when its progress completes.
    pub fn uniform(segment_count: usize) -> Result<Self, SequencerError> {
        let phases = (0..segment_count)
            .map(|segment| {
                PhaseDescriptor::begin(
                    segment,
                    segment as u32,
                    AdvanceTrigger::SegmentCompleted,
                )
            })
            .collect();
        Self::new(segment_count, phases)
    }

    /// The four segment story the prototype ships with.
    pub fn showcase() -> Self {
        let phases = vec![
            PhaseDescriptor::begin(0, 0, AdvanceTrigger::SegmentCompleted),
            PhaseDescriptor::fade_out(0, FadeTarget::Description),
            PhaseDescriptor::swap_and_fade_in(
                0,
                FadeTarget::Description,
                1,
                AdvanceTrigger::FadeFinished,
            ),
            PhaseDescriptor::begin(1, 1, AdvanceTrigger::AnimationFinished),
            PhaseDescriptor::fade_out(1, FadeTarget::Section),
            PhaseDescriptor::swap_and_fade_in(
                1,
                FadeTarget::Section,
                2,
                AdvanceTrigger::SegmentCompleted,
            ),
            PhaseDescriptor::begin(2, 2, AdvanceTrigger::SegmentCompleted),
            PhaseDescriptor::begin(3, 3, AdvanceTrigger::SegmentCompleted),
        ];
        let first_parts = [0, 3, 6, 7].into_iter().map(PartIndex).collect();
        Self {
            segment_count: 4,
            phases,
            first_parts,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, SequencerError> {
        toml::from_str(raw).map_err(|err| SequencerError::invalid_config(err.to_string()))
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn total_parts(&self) -> usize {
        self.phases.len()
    }

    pub fn phases(&self) -> &[PhaseDescriptor] {
        &self.phases
    }

    pub fn phase(&self, part: PartIndex) -> Option<&PhaseDescriptor> {
        self.phases.get(part.0)
    }

    pub fn segment_of(&self, part: PartIndex) -> Result<SegmentIndex, SequencerError> {
        self.phase(part)
            .map(|phase| phase.segment)
            .ok_or(SequencerError::InvalidPart {
                part,
                total_parts: self.total_parts(),
            })
    }

    pub fn first_part_of(&self, segment: SegmentIndex) -> Result<PartIndex, SequencerError> {
        self.first_parts
            .get(segment.0)
            .copied()
            .ok_or(SequencerError::InvalidSegmentIndex {
                index: segment,
                segment_count: self.segment_count,
            })
    }

    pub fn is_segment_boundary(&self, part: PartIndex) -> bool {
        self.first_parts.binary_search(&part).is_ok()
    }

    pub fn contains_segment(&self, segment: SegmentIndex) -> bool {
        segment.0 < self.segment_count
    }
}

#[cfg(test)]
#[path = "tests/story_table_tests.rs"]
mod tests;
