//! Tween state machine
//!
//! A tween is a timed, loopable, pausable counter. It owns no value of its
//! own: every change is reported to its event sink, which decides what the
//! elapsed time means.
//!
//! ```text
//! Ready ──play──▶ Run ──pause──▶ Pause
//!   ▲              │  ◀──resume──┘
//!   │              └──stop / loop budget spent──▶ Stop
//!   └──────────── rewind (from any state)
//! ```

use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

use crate::events::{dispatch, EventSink, TweenEvent, WeakEventSink};

new_key_type! {
    /// Unique identifier for a tween stored in a [`TweenArena`]
    pub struct TweenId;
}

/// Storage for tweens addressed by [`TweenId`]
pub type TweenArena = SlotMap<TweenId, Tween>;

/// Loop count meaning "repeat forever"
pub const INFINITE_LOOPS: i32 = -1;

/// Play state shared by tweens and sequences
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TweenState {
    #[default]
    Ready,
    Run,
    Pause,
    Stop,
}

/// A single timed counter driving one event sink
#[derive(Clone)]
pub struct Tween {
    /// Length of one loop in seconds
    pub duration: f32,
    /// -1 = infinite, 0 = none, N = N completions
    pub loops: i32,
    /// Advance with raw delta time, ignoring the frame's time scale
    pub ignore_time_scale: bool,
    /// Ordering bucket inside a sequence; `None` is auto-assigned on registration
    pub index: Option<u32>,
    time: f32,
    state: TweenState,
    completed_loops: i32,
    events: Option<WeakEventSink>,
}

impl Tween {
    pub fn new(duration: f32, loops: i32) -> Self {
        Self {
            duration: duration.max(0.0),
            loops,
            ignore_time_scale: false,
            index: None,
            time: 0.0,
            state: TweenState::Ready,
            completed_loops: 0,
            events: None,
        }
    }

    /// Builder: attach an event sink (held weakly)
    pub fn with_events(mut self, sink: &EventSink) -> Self {
        self.events = Some(Rc::downgrade(sink));
        self
    }

    /// Builder: set the sequence bucket index
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Builder: ignore the frame time scale
    pub fn ignoring_time_scale(mut self) -> Self {
        self.ignore_time_scale = true;
        self
    }

    /// Replace the event sink
    pub fn set_events(&mut self, sink: &EventSink) {
        self.events = Some(Rc::downgrade(sink));
    }

    /// Replace the event sink with an existing weak handle
    pub fn set_weak_events(&mut self, sink: WeakEventSink) {
        self.events = Some(sink);
    }

    /// Get the event sink if it is still alive
    pub fn events(&self) -> Option<EventSink> {
        self.events.as_ref().and_then(|sink| sink.upgrade())
    }

    /// Detach the event sink; the tween keeps its timing state
    pub fn release(&mut self) {
        self.events = None;
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    pub fn is_run(&self) -> bool {
        self.state == TweenState::Run
    }

    pub fn is_stop(&self) -> bool {
        self.state == TweenState::Stop
    }

    pub fn is_paused(&self) -> bool {
        self.state == TweenState::Pause
    }

    /// Elapsed time within the current loop, always in `[0, duration]`
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of loops completed in the current play cycle
    pub fn completed_loops(&self) -> i32 {
        self.completed_loops
    }

    /// Elapsed time normalised by duration (0 for zero-length tweens)
    pub fn rate(&self) -> f32 {
        if self.duration > 0.0 {
            self.time / self.duration
        } else {
            0.0
        }
    }

    fn emit(&self, event: TweenEvent) {
        if let Some(sink) = &self.events {
            dispatch(sink, event);
        }
    }

    /// Return to Ready for a fresh play cycle
    pub fn reset(&mut self) {
        self.completed_loops = 0;
        self.state = TweenState::Ready;
        self.emit(TweenEvent::Ready);
    }

    /// Like [`reset`](Self::reset) but also rewinds time and fires nothing
    pub fn reset_state(&mut self) {
        self.time = 0.0;
        self.completed_loops = 0;
        self.state = TweenState::Ready;
    }

    pub fn play(&mut self) {
        self.time = 0.0;
        self.completed_loops = 0;
        self.state = TweenState::Run;
        self.emit(TweenEvent::Start);
        self.emit(TweenEvent::Update(self.time));
    }

    pub fn stop(&mut self) {
        self.time = self.duration;
        if self.loops > 0 {
            self.completed_loops = self.loops;
        }
        self.state = TweenState::Stop;
        self.emit(TweenEvent::Update(self.time));
        self.emit(TweenEvent::Stop);
    }

    /// Freeze a running tween; no-op in any other state
    pub fn pause(&mut self) {
        if self.state != TweenState::Run {
            return;
        }
        self.state = TweenState::Pause;
        self.emit(TweenEvent::Update(self.time));
        self.emit(TweenEvent::Pause);
    }

    /// Continue a paused tween; no-op in any other state
    pub fn resume(&mut self) {
        if self.state != TweenState::Pause {
            return;
        }
        self.state = TweenState::Run;
        self.emit(TweenEvent::Update(self.time));
        self.emit(TweenEvent::Resume);
    }

    pub fn rewind(&mut self) {
        self.time = 0.0;
        self.completed_loops = 0;
        self.state = TweenState::Ready;
        self.emit(TweenEvent::Update(self.time));
        self.emit(TweenEvent::Rewind);
    }

    fn loop_budget_spent(&self) -> bool {
        self.loops >= 0 && self.completed_loops >= self.loops - 1
    }

    /// Advance a running tween by one frame.
    ///
    /// The sink sees the time from *before* the advance; a tween that reaches
    /// its duration either stops or wraps to 0 for the next loop.
    pub fn tick(&mut self, delta_time: f32, time_scale: f32) {
        if self.state != TweenState::Run {
            return;
        }

        self.emit(TweenEvent::Update(self.time));

        let scale = if self.ignore_time_scale { 1.0 } else { time_scale };
        self.time = (self.time + frame_step(delta_time, scale)).clamp(0.0, self.duration);

        if self.time >= self.duration {
            if self.loop_budget_spent() {
                self.stop();
            } else {
                self.time = 0.0;
                self.completed_loops += 1;
            }
        }
    }

    /// Push an update to the sink without touching play state
    pub fn notify_update(&self, time: f32) {
        self.emit(TweenEvent::Update(time));
    }

    /// Push a start notification without touching play state
    pub fn notify_start(&self) {
        self.emit(TweenEvent::Start);
    }

    /// Push a stop notification without touching play state
    pub fn notify_stop(&self) {
        self.emit(TweenEvent::Stop);
    }
}

/// Scaled frame delta; a negative or non-finite step counts as no time
pub fn frame_step(delta_time: f32, time_scale: f32) -> f32 {
    let step = delta_time * time_scale;
    if step.is_finite() && step > 0.0 {
        step
    } else {
        0.0
    }
}

impl Default for Tween {
    fn default() -> Self {
        Self::new(0.0, 1)
    }
}

impl std::fmt::Debug for Tween {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tween")
            .field("duration", &self.duration)
            .field("loops", &self.loops)
            .field("time", &self.time)
            .field("state", &self.state)
            .field("completed_loops", &self.completed_loops)
            .field("index", &self.index)
            .field("has_events", &self.events().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use std::cell::RefCell;

    fn logged(duration: f32, loops: i32) -> (Tween, Rc<RefCell<EventLog>>) {
        let log = EventLog::shared();
        let sink: EventSink = log.clone();
        (Tween::new(duration, loops).with_events(&sink), log)
    }

    #[test]
    fn test_play_fires_start_then_zero_update() {
        let (mut tween, log) = logged(1.0, 1);
        tween.play();

        assert!(tween.is_run());
        assert_eq!(
            log.borrow().events(),
            &[TweenEvent::Start, TweenEvent::Update(0.0)]
        );
    }

    #[test]
    fn test_tick_reports_pre_advance_time() {
        let (mut tween, log) = logged(1.0, 1);
        tween.play();
        log.borrow_mut().clear();

        tween.tick(0.25, 1.0);
        tween.tick(0.25, 1.0);

        assert_eq!(log.borrow().updates().collect::<Vec<_>>(), vec![0.0, 0.25]);
        assert!((tween.time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tick_ignored_unless_running() {
        let (mut tween, log) = logged(1.0, 1);
        tween.tick(0.5, 1.0);
        assert_eq!(tween.time(), 0.0);
        assert!(log.borrow().events().is_empty());
    }

    #[test]
    fn test_finite_loops_stop_exactly_once() {
        for loops in 1..=4 {
            let (mut tween, log) = logged(1.0, loops);
            tween.play();

            let mut elapsed = 0.0;
            while elapsed < loops as f32 * 1.0 {
                tween.tick(0.25, 1.0);
                elapsed += 0.25;
            }

            assert!(tween.is_stop(), "loops={loops}");
            assert_eq!(log.borrow().count(TweenEvent::Stop), 1);
            assert_eq!(tween.completed_loops(), loops);

            // Further ticks are ignored once stopped
            tween.tick(0.25, 1.0);
            assert_eq!(log.borrow().count(TweenEvent::Stop), 1);
        }
    }

    #[test]
    fn test_infinite_loops_wrap_forever() {
        let (mut tween, log) = logged(0.5, INFINITE_LOOPS);
        tween.play();
        log.borrow_mut().clear();

        for wrap in 1..=20 {
            tween.tick(0.5, 1.0);
            assert!(tween.is_run());
            assert_eq!(tween.time(), 0.0);
            assert_eq!(tween.completed_loops(), wrap);
            assert_eq!(log.borrow().update_count(), wrap as usize);
        }
        assert_eq!(log.borrow().count(TweenEvent::Stop), 0);
    }

    #[test]
    fn test_time_scale_and_ignore_flag() {
        let (mut scaled, _log) = logged(10.0, 1);
        scaled.play();
        scaled.tick(1.0, 0.5);
        assert!((scaled.time() - 0.5).abs() < 1e-6);

        let (tween, _log2) = logged(10.0, 1);
        let mut unscaled = tween.ignoring_time_scale();
        unscaled.play();
        unscaled.tick(1.0, 0.5);
        assert!((unscaled.time() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_oversized_delta_is_clamped() {
        let (mut tween, _log) = logged(1.0, 1);
        tween.play();
        tween.tick(50.0, 1.0);
        assert!(tween.is_stop());
        assert_eq!(tween.time(), 1.0);
    }

    #[test]
    fn test_non_finite_delta_adds_no_time() {
        let (mut tween, _log) = logged(1.0, 1);
        tween.play();
        tween.tick(f32::NAN, 1.0);
        tween.tick(f32::INFINITY, 1.0);
        tween.tick(-2.0, 1.0);
        assert_eq!(tween.time(), 0.0);
        assert!(tween.is_run());

        tween.tick(1.0, f32::NAN);
        assert_eq!(tween.time(), 0.0);

        tween.tick(1.0, 1.0);
        assert!(tween.is_stop());
        assert_eq!(tween.time(), 1.0);
    }

    #[test]
    fn test_pause_resume_keep_time() {
        let (mut tween, log) = logged(2.0, 1);
        tween.play();
        tween.tick(0.75, 1.0);
        log.borrow_mut().clear();

        tween.pause();
        tween.tick(1.0, 1.0);
        assert_eq!(tween.time(), 0.75);
        tween.resume();
        assert_eq!(tween.time(), 0.75);

        assert_eq!(
            log.borrow().events(),
            &[
                TweenEvent::Update(0.75),
                TweenEvent::Pause,
                TweenEvent::Update(0.75),
                TweenEvent::Resume,
            ]
        );
    }

    #[test]
    fn test_pause_requires_run() {
        let (mut tween, log) = logged(1.0, 1);
        tween.pause();
        assert_eq!(tween.state(), TweenState::Ready);
        tween.resume();
        assert_eq!(tween.state(), TweenState::Ready);
        assert!(log.borrow().events().is_empty());
    }

    #[test]
    fn test_stop_and_rewind() {
        let (mut tween, log) = logged(1.5, 3);
        tween.play();
        tween.stop();
        assert_eq!(tween.time(), 1.5);
        assert_eq!(tween.completed_loops(), 3);

        tween.rewind();
        assert_eq!(tween.state(), TweenState::Ready);
        assert_eq!(tween.time(), 0.0);
        assert_eq!(tween.completed_loops(), 0);

        let events = log.borrow().events().to_vec();
        assert_eq!(
            &events[2..],
            &[
                TweenEvent::Update(1.5),
                TweenEvent::Stop,
                TweenEvent::Update(0.0),
                TweenEvent::Rewind,
            ]
        );
    }

    #[test]
    fn test_stop_keeps_loop_counter_for_infinite() {
        let (mut tween, _log) = logged(1.0, INFINITE_LOOPS);
        tween.play();
        tween.tick(1.0, 1.0);
        tween.tick(1.0, 1.0);
        tween.stop();
        assert_eq!(tween.completed_loops(), 2);
    }

    #[test]
    fn test_reset_fires_ready() {
        let (mut tween, log) = logged(1.0, 1);
        tween.play();
        tween.reset();
        assert_eq!(tween.state(), TweenState::Ready);
        assert_eq!(log.borrow().count(TweenEvent::Ready), 1);
    }

    #[test]
    fn test_released_tween_is_silent() {
        let (mut tween, log) = logged(1.0, 1);
        tween.release();
        tween.play();
        tween.tick(0.5, 1.0);
        assert!(log.borrow().events().is_empty());
        assert!(tween.is_run());
    }

    #[test]
    fn test_dropped_sink_is_tolerated() {
        let mut tween = {
            let (tween, _log) = logged(1.0, 1);
            tween
        };
        tween.play();
        tween.tick(1.0, 1.0);
        assert!(tween.is_stop());
        assert!(tween.events().is_none());
    }
}
