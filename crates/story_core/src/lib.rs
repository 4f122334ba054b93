//! Segment progress and story sequencing engine.
//!
//! [`StorySequencer`] is a synchronous state machine; [`StoryRuntime`] runs it on
//! tokio against a [`Renderer`], owning the [`SegmentTimer`] for the active segment.

pub mod runtime;
pub mod segment_timer;
pub mod sequencer;
pub mod story_table;
pub mod timer_slot;

pub use runtime::{EventSink, Renderer, RuntimeOptions, StoryRuntime};
pub use segment_timer::{ContinuousProgress, SegmentTimer, TimerMode};
pub use sequencer::{SequencerConfig, StorySequencer, TapPolicy};
pub use story_table::{AdvanceTrigger, PhaseAction, PhaseDescriptor, StoryTable};
pub use timer_slot::{TimerSlot, TimerSlots};
