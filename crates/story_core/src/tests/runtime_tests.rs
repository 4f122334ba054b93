use super::*;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::Instant;

use crate::{
    sequencer::SequencerConfig,
    story_table::StoryTable,
};

#[derive(Clone, Default)]
struct RecordingRenderer {
    effects: Arc<Mutex<Vec<Effect>>>,
    ticks: Arc<Mutex<Vec<(SegmentIndex, u8)>>>,
    finish_instantly: bool,
}

impl RecordingRenderer {
    fn finishing_instantly() -> Self {
        Self {
            finish_instantly: true,
            ..Self::default()
        }
    }

    fn effects(&self) -> Vec<Effect> {
        self.effects.lock().expect("effects").clone()
    }

    fn active_segments(&self) -> Vec<usize> {
        self.effects()
            .into_iter()
            .filter_map(|effect| match effect {
                Effect::SetActiveSegment { segment } => Some(segment.0),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn apply(&mut self, effect: &Effect, events: &EventSink) {
        self.effects.lock().expect("effects").push(*effect);
        if !self.finish_instantly {
            return;
        }
        match *effect {
            Effect::StartFade { target, token, .. } => {
                events.fade_finished(target, token, true);
            }
            Effect::PlayAnimation { token } => {
                events.animation_finished(token, false);
            }
            _ => {}
        }
    }

    fn progress(&mut self, segment: SegmentIndex, percent: u8) {
        self.ticks.lock().expect("ticks").push((segment, percent));
    }
}

fn runtime(
    table: StoryTable,
    renderer: RecordingRenderer,
    options: RuntimeOptions,
) -> (StoryRuntime<RecordingRenderer>, EventSink) {
    let sequencer =
        StorySequencer::new(table, SequencerConfig::default()).expect("valid sequencer");
    StoryRuntime::new(sequencer, renderer, options)
}

#[tokio::test(start_paused = true)]
async fn plays_uniform_story_to_completion_on_segment_timers() {
    let started = Instant::now();
    let (runtime, _sink) = runtime(
        StoryTable::uniform(4).expect("uniform"),
        RecordingRenderer::default(),
        RuntimeOptions::default(),
    );

    let renderer = runtime.run().await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(16), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(17), "elapsed {elapsed:?}");
    assert_eq!(renderer.active_segments(), vec![0, 1, 2, 3]);
    assert_eq!(renderer.effects().last(), Some(&Effect::StoryCompleted));

    let ticks = renderer.ticks.lock().expect("ticks");
    assert!(ticks.contains(&(SegmentIndex(0), 100)));
    assert!(ticks.contains(&(SegmentIndex(3), 100)));
}

#[tokio::test(start_paused = true)]
async fn plays_showcase_story_with_renderer_completions() {
    let (runtime, _sink) = runtime(
        StoryTable::showcase(),
        RecordingRenderer::finishing_instantly(),
        RuntimeOptions::default(),
    );

    let renderer = runtime.run().await;

    assert_eq!(renderer.active_segments(), vec![0, 1, 2, 3]);
    let fades = renderer
        .effects()
        .into_iter()
        .filter(|effect| matches!(effect, Effect::StartFade { .. }))
        .count();
    assert_eq!(fades, 4);
    assert!(renderer.effects().contains(&Effect::StoryCompleted));
}

#[tokio::test(start_paused = true)]
async fn tap_mid_segment_jumps_and_discards_the_old_timer() {
    let started = Instant::now();
    let renderer = RecordingRenderer::default();
    let (runtime, sink) = runtime(
        StoryTable::uniform(4).expect("uniform"),
        renderer.clone(),
        RuntimeOptions::default(),
    );
    let handle = tokio::spawn(runtime.run());

    tokio::time::sleep(Duration::from_millis(1_600)).await;
    assert!(sink.tap(SegmentIndex(2)));
    handle.await.expect("runtime task");

    assert_eq!(renderer.active_segments(), vec![0, 2, 3]);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(9_600), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(10_600), "elapsed {elapsed:?}");

    let ticks = renderer.ticks.lock().expect("ticks");
    assert!(!ticks.contains(&(SegmentIndex(0), 100)));
}

#[tokio::test(start_paused = true)]
async fn rejected_events_do_not_stop_the_story() {
    let renderer = RecordingRenderer::default();
    let (runtime, sink) = runtime(
        StoryTable::uniform(2).expect("uniform"),
        renderer.clone(),
        RuntimeOptions::default(),
    );
    assert!(sink.tap(SegmentIndex(9)));
    assert!(sink.reset(SegmentIndex(1)));

    runtime.run().await;

    assert_eq!(renderer.active_segments(), vec![0, 1]);
    assert!(renderer.effects().contains(&Effect::StoryCompleted));
}

#[tokio::test(start_paused = true)]
async fn keeps_running_after_completion_until_shutdown() {
    let renderer = RecordingRenderer::default();
    let (runtime, sink) = runtime(
        StoryTable::uniform(1).expect("uniform"),
        renderer.clone(),
        RuntimeOptions {
            stop_on_complete: false,
            ..RuntimeOptions::default()
        },
    );
    let handle = tokio::spawn(runtime.run());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(renderer.effects().contains(&Effect::StoryCompleted));
    assert!(!handle.is_finished());

    // Replaying after completion is still possible.
    assert!(sink.tap(SegmentIndex(0)));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(renderer.active_segments(), vec![0, 0]);

    assert!(sink.shutdown());
    handle.await.expect("runtime task");
    assert_eq!(renderer.effects().last(), Some(&Effect::CancelAnimation));
}

#[tokio::test(start_paused = true)]
async fn stops_once_every_caller_sink_is_dropped() {
    let renderer = RecordingRenderer::finishing_instantly();
    let (runtime, sink) = runtime(
        StoryTable::uniform(2).expect("uniform"),
        renderer.clone(),
        RuntimeOptions {
            stop_on_complete: false,
            ..RuntimeOptions::default()
        },
    );
    drop(sink);

    tokio::time::timeout(Duration::from_secs(3_600), runtime.run())
        .await
        .expect("run returns when no sink is left");

    assert_eq!(renderer.active_segments(), vec![0]);
    assert!(!renderer.effects().contains(&Effect::StoryCompleted));
    assert!(renderer.effects().contains(&Effect::CancelProgress));
}

#[tokio::test(start_paused = true)]
async fn ticks_from_a_superseded_timer_are_not_rendered() {
    let table = StoryTable::uniform(1).expect("uniform");
    let first_token = StorySequencer::new(table.clone(), SequencerConfig::default())
        .expect("valid sequencer")
        .start()
        .into_iter()
        .find_map(|effect| match effect {
            Effect::StartProgress { token, .. } => Some(token),
            _ => None,
        })
        .expect("progress started");

    let renderer = RecordingRenderer::default();
    let (runtime, sink) = runtime(table, renderer.clone(), RuntimeOptions::default());
    // A tick from the first run is still queued behind the reset that cancels it.
    assert!(sink.reset(SegmentIndex(0)));
    assert!(sink.tick(SegmentIndex(0), first_token, 40));

    runtime.run().await;

    let ticks = renderer.ticks.lock().expect("ticks");
    assert_eq!(ticks.len(), 100);
    assert_eq!(ticks.first(), Some(&(SegmentIndex(0), 1)));
    assert!(ticks.windows(2).all(|pair| pair[0].1 < pair[1].1));
}

#[test]
fn snapshot_reports_indicator_state_before_start() {
    let (runtime, _sink) = runtime(
        StoryTable::uniform(3).expect("uniform"),
        RecordingRenderer::default(),
        RuntimeOptions::default(),
    );
    let snapshot = runtime.snapshot();
    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot[0].state, SegmentState::Active);
    assert_eq!(snapshot[0].progress, 0);
    assert_eq!(snapshot[2].state, SegmentState::Pending);
    assert_eq!(runtime.sequencer().part().0, 0);
}
