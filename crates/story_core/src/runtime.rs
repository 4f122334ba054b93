//! Runtime bridge between the sequencer, the segment timer, and a renderer.

use shared::{
    domain::{ActionToken, AnimatedQuantity, FadeTarget, SegmentIndex, SegmentState},
    protocol::{Effect, SegmentSnapshot, StoryEvent},
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tracing::{debug, info, warn};

use crate::{
    segment_timer::{SegmentTimer, TimerMode, FULL_PROGRESS},
    sequencer::StorySequencer,
};

/// The external collaborator that draws the story and reports back when its
/// fades and animations finish.
pub trait Renderer: Send {
    fn apply(&mut self, effect: &Effect, events: &EventSink);

    fn progress(&mut self, _segment: SegmentIndex, _percent: u8) {}
}

enum Inbound {
    Event(StoryEvent),
    Tick {
        segment: SegmentIndex,
        token: ActionToken,
        percent: u8,
    },
    Shutdown,
}

#[derive(Clone)]
enum SinkTx {
    Owned(UnboundedSender<Inbound>),
    /// Handed to the timer and the renderer; does not keep the runtime alive.
    Internal(WeakUnboundedSender<Inbound>),
}

/// Cloneable intake for events addressed to a running [`StoryRuntime`].
///
/// The runtime stops once every sink returned by [`StoryRuntime::new`] (and its
/// clones) is dropped. Clones of the sink passed to [`Renderer::apply`] do not count.
#[derive(Clone)]
pub struct EventSink {
    tx: SinkTx,
}

impl EventSink {
    /// Returns `false` once the runtime has stopped.
    pub fn send(&self, event: StoryEvent) -> bool {
        self.deliver(Inbound::Event(event))
    }

    fn deliver(&self, inbound: Inbound) -> bool {
        match &self.tx {
            SinkTx::Owned(tx) => tx.send(inbound).is_ok(),
            SinkTx::Internal(tx) => tx
                .upgrade()
                .is_some_and(|tx| tx.send(inbound).is_ok()),
        }
    }

    pub fn tap(&self, segment: SegmentIndex) -> bool {
        self.send(StoryEvent::SegmentTapped { segment })
    }

    pub fn reset(&self, segment: SegmentIndex) -> bool {
        self.send(StoryEvent::SegmentReset { segment })
    }

    pub fn animation_finished(&self, token: ActionToken, was_cancelled: bool) -> bool {
        self.send(StoryEvent::AnimationFinished {
            token,
            was_cancelled,
        })
    }

    pub fn fade_finished(&self, target: FadeTarget, token: ActionToken, was_completed: bool) -> bool {
        self.send(StoryEvent::FadeFinished {
            target,
            token,
            was_completed,
        })
    }

    pub fn request_advance(&self) -> bool {
        self.send(StoryEvent::PartAdvanceRequested)
    }

    pub fn shutdown(&self) -> bool {
        self.deliver(Inbound::Shutdown)
    }

    fn tick(&self, segment: SegmentIndex, token: ActionToken, percent: u8) -> bool {
        self.deliver(Inbound::Tick {
            segment,
            token,
            percent,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeOptions {
    pub timer_mode: TimerMode,
    pub stop_on_complete: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            timer_mode: TimerMode::Discrete,
            stop_on_complete: true,
        }
    }
}

pub struct StoryRuntime<R> {
    sequencer: StorySequencer,
    renderer: R,
    timer: SegmentTimer,
    options: RuntimeOptions,
    sink: EventSink,
    inbound: UnboundedReceiver<Inbound>,
}

impl<R: Renderer> StoryRuntime<R> {
    pub fn new(sequencer: StorySequencer, renderer: R, options: RuntimeOptions) -> (Self, EventSink) {
        let (tx, inbound) = mpsc::unbounded_channel();
        let internal = EventSink {
            tx: SinkTx::Internal(tx.downgrade()),
        };
        let runtime = Self {
            sequencer,
            renderer,
            timer: SegmentTimer::new(options.timer_mode),
            options,
            sink: internal,
            inbound,
        };
        (
            runtime,
            EventSink {
                tx: SinkTx::Owned(tx),
            },
        )
    }

    pub fn sequencer(&self) -> &StorySequencer {
        &self.sequencer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn snapshot(&self) -> Vec<SegmentSnapshot> {
        let active = self.sequencer.active_segment();
        (0..self.sequencer.table().segment_count())
            .map(|index| {
                let segment = SegmentIndex(index);
                let state = SegmentState::derive(segment, active);
                let progress = match state {
                    SegmentState::Complete => FULL_PROGRESS,
                    SegmentState::Active => self.timer.progress(),
                    SegmentState::Pending => 0,
                };
                SegmentSnapshot {
                    segment,
                    state,
                    progress,
                }
            })
            .collect()
    }

    /// Drives the story until it completes (with `stop_on_complete`), a shutdown is
    /// requested, or every caller-held [`EventSink`] is dropped, then tears the
    /// sequencer down and hands the renderer back.
    ///
    /// Every effect produced by one event is applied before the next event is received.
    pub async fn run(mut self) -> R {
        let effects = self.sequencer.start();
        let mut completed = self.dispatch(effects);

        while !(completed && self.options.stop_on_complete) {
            let Some(inbound) = self.inbound.recv().await else {
                info!("every event sink dropped; stopping story runtime");
                break;
            };
            match inbound {
                Inbound::Event(event) => match self.sequencer.handle(event) {
                    Ok(effects) => completed = self.dispatch(effects) || completed,
                    Err(err) => warn!(?event, %err, "story event rejected"),
                },
                Inbound::Tick {
                    segment,
                    token,
                    percent,
                } => {
                    let current = self
                        .sequencer
                        .slots()
                        .get(AnimatedQuantity::SegmentProgress)
                        .is_current(token);
                    if current {
                        self.renderer.progress(segment, percent);
                    } else {
                        debug!(%segment, %token, percent, "dropping tick from a superseded timer");
                    }
                }
                Inbound::Shutdown => {
                    info!("story runtime shutdown requested");
                    break;
                }
            }
        }

        let effects = self.sequencer.teardown();
        self.dispatch(effects);
        self.timer.cancel();
        self.renderer
    }

    /// Returns whether the story completed.
    fn dispatch(&mut self, effects: Vec<Effect>) -> bool {
        let mut completed = false;
        for effect in effects {
            debug!(effect = effect.name(), "applying effect");
            match effect {
                Effect::StartProgress {
                    segment,
                    duration_seconds,
                    token,
                } => {
                    let ticks = self.sink.clone();
                    let completion = self.sink.clone();
                    self.timer.start_with_ticks(
                        duration_seconds,
                        move |percent| {
                            ticks.tick(segment, token, percent);
                        },
                        move || {
                            completion.send(StoryEvent::SegmentCompleted { segment, token });
                        },
                    );
                }
                Effect::CancelProgress => self.timer.cancel(),
                Effect::StoryCompleted => completed = true,
                _ => {}
            }
            self.renderer.apply(&effect, &self.sink);
        }
        completed
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
