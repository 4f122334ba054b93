//! Drives the progress of the active segment from 0 to 100 percent.

use std::{
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, warn};

pub const FULL_PROGRESS: u8 = 100;
const DISCRETE_STEPS: u32 = FULL_PROGRESS as u32;
const MIN_TICK: Duration = Duration::from_nanos(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Integer percentage advanced on a fixed interval of `duration / 100`.
    #[default]
    Discrete,
    /// Progress interpolated from a monotonic clock whenever it is sampled.
    Continuous,
}

/// Linear interpolation of progress between a start instant and its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousProgress {
    pub started: Instant,
    pub duration: Duration,
}

impl ContinuousProgress {
    pub fn sample(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return f64::from(FULL_PROGRESS);
        }
        let elapsed = now.saturating_duration_since(self.started);
        let ratio = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (ratio * f64::from(FULL_PROGRESS)).clamp(0.0, f64::from(FULL_PROGRESS))
    }
}

#[derive(Debug, Default)]
struct TimerState {
    generation: AtomicU64,
    percent: AtomicU8,
    clock: Mutex<Option<ContinuousProgress>>,
}

impl TimerState {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_clock(&self, clock: Option<ContinuousProgress>) {
        if let Ok(mut guard) = self.clock.lock() {
            *guard = clock;
        }
    }

    fn clock(&self) -> Option<ContinuousProgress> {
        self.clock.lock().ok().and_then(|guard| *guard)
    }
}

/// At most one run is in flight. Starting again, cancelling, resetting, or
/// dropping the timer supersedes the previous run, whose completion callback
/// is then never invoked.
///
/// `start` spawns onto the ambient tokio runtime and must be called from
/// within one.
#[derive(Debug)]
pub struct SegmentTimer {
    mode: TimerMode,
    state: Arc<TimerState>,
    task: Option<JoinHandle<()>>,
}

impl Default for SegmentTimer {
    fn default() -> Self {
        Self::new(TimerMode::default())
    }
}

impl SegmentTimer {
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode,
            state: Arc::new(TimerState::default()),
            task: None,
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn start<C>(&mut self, duration_seconds: f64, on_complete: C)
    where
        C: FnOnce() + Send + 'static,
    {
        self.start_with_ticks(duration_seconds, |_| {}, on_complete);
    }

    pub fn start_with_ticks<T, C>(&mut self, duration_seconds: f64, on_tick: T, on_complete: C)
    where
        T: FnMut(u8) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.cancel();
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = Arc::clone(&self.state);

        if duration_seconds.is_nan() || duration_seconds <= 0.0 {
            debug!(duration_seconds, "non-positive segment duration; completing on next tick");
            state.percent.store(FULL_PROGRESS, Ordering::SeqCst);
            self.task = Some(tokio::spawn(async move {
                let mut on_tick = on_tick;
                tokio::task::yield_now().await;
                if state.is_current(generation) {
                    on_tick(FULL_PROGRESS);
                    on_complete();
                }
            }));
            return;
        }

        state.percent.store(0, Ordering::SeqCst);
        let duration = match Duration::try_from_secs_f64(duration_seconds) {
            Ok(duration) => duration,
            Err(err) => {
                warn!(duration_seconds, %err, "unrepresentable segment duration; timer not started");
                return;
            }
        };
        self.task = Some(match self.mode {
            TimerMode::Discrete => tokio::spawn(run_discrete(
                state, generation, duration, on_tick, on_complete,
            )),
            TimerMode::Continuous => {
                state.set_clock(Some(ContinuousProgress {
                    started: Instant::now(),
                    duration,
                }));
                tokio::spawn(run_continuous(
                    state, generation, duration, on_tick, on_complete,
                ))
            }
        });
    }

    /// Stops advancing; a pending completion is suppressed.
    pub fn cancel(&mut self) {
        self.state.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let Some(clock) = self.state.clock() {
            let percent = clock.sample(Instant::now()).floor() as u8;
            self.state.percent.store(percent, Ordering::SeqCst);
            self.state.set_clock(None);
        }
    }

    pub fn reset(&mut self) {
        self.cancel();
        self.state.percent.store(0, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn progress(&self) -> u8 {
        match self.state.clock() {
            Some(clock) => clock.sample(Instant::now()).floor() as u8,
            None => self.state.percent.load(Ordering::SeqCst),
        }
    }
}

impl Drop for SegmentTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_discrete<T, C>(
    state: Arc<TimerState>,
    generation: u64,
    duration: Duration,
    mut on_tick: T,
    on_complete: C,
) where
    T: FnMut(u8) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    let period = (duration / DISCRETE_STEPS).max(MIN_TICK);
    let mut ticker = tokio::time::interval(period);
    // The first tick resolves immediately.
    ticker.tick().await;

    for _ in 0..DISCRETE_STEPS {
        ticker.tick().await;
        if !state.is_current(generation) {
            return;
        }
        let percent = state
            .percent
            .fetch_add(1, Ordering::SeqCst)
            .saturating_add(1)
            .min(FULL_PROGRESS);
        on_tick(percent);
    }

    if state.is_current(generation) {
        on_complete();
    }
}

async fn run_continuous<T, C>(
    state: Arc<TimerState>,
    generation: u64,
    duration: Duration,
    mut on_tick: T,
    on_complete: C,
) where
    T: FnMut(u8) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    tokio::time::sleep(duration).await;
    if !state.is_current(generation) {
        return;
    }
    state.set_clock(None);
    state.percent.store(FULL_PROGRESS, Ordering::SeqCst);
    on_tick(FULL_PROGRESS);
    on_complete();
}

#[cfg(test)]
#[path = "tests/segment_timer_tests.rs"]
mod tests;
