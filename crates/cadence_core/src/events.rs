//! Tween event sinks
//!
//! A tween reports its lifecycle to exactly one sink through the seven
//! callbacks of [`TweenEvents`]. Sinks are shared, single-threaded objects
//! (`Rc<RefCell<dyn TweenEvents>>`); tweens only hold a weak reference so a
//! destroyed target silently stops receiving events.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Capability set a tween invokes on its owner.
///
/// Implementations must tolerate repeated `on_update` calls with
/// non-monotonic time (scrubbing) and with `time = 0` more than once.
pub trait TweenEvents {
    fn on_ready(&mut self) {}
    fn on_start(&mut self) {}
    fn on_stop(&mut self) {}
    fn on_pause(&mut self) {}
    fn on_resume(&mut self) {}
    fn on_rewind(&mut self) {}
    fn on_update(&mut self, time: f32);
}

/// Strong, shared handle to an event sink
pub type EventSink = Rc<RefCell<dyn TweenEvents>>;

/// Weak handle to an event sink, as stored by tweens
pub type WeakEventSink = Weak<RefCell<dyn TweenEvents>>;

/// A single tween notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenEvent {
    Ready,
    Start,
    Stop,
    Pause,
    Resume,
    Rewind,
    Update(f32),
}

impl TweenEvent {
    /// Invoke the matching callback on a sink
    pub fn apply(self, sink: &mut dyn TweenEvents) {
        match self {
            TweenEvent::Ready => sink.on_ready(),
            TweenEvent::Start => sink.on_start(),
            TweenEvent::Stop => sink.on_stop(),
            TweenEvent::Pause => sink.on_pause(),
            TweenEvent::Resume => sink.on_resume(),
            TweenEvent::Rewind => sink.on_rewind(),
            TweenEvent::Update(time) => sink.on_update(time),
        }
    }
}

/// Deliver an event to a weakly held sink.
///
/// Returns `false` when the sink is gone or already borrowed. A sink that is
/// borrowed at dispatch time means a callback tried to drive its own tween
/// reentrantly; the event is dropped rather than panicking.
pub fn dispatch(sink: &WeakEventSink, event: TweenEvent) -> bool {
    let Some(sink) = sink.upgrade() else {
        return false;
    };

    let Ok(mut sink) = sink.try_borrow_mut() else {
        tracing::warn!("Dropping {:?}: event sink is already borrowed", event);
        return false;
    };

    event.apply(&mut *sink);
    true
}

/// Recording sink that keeps every event it receives.
///
/// Handy for diagnostics and for asserting callback order in tests.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<TweenEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log already wrapped for sharing with tweens
    pub fn shared() -> Rc<RefCell<EventLog>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn events(&self) -> &[TweenEvent] {
        &self.events
    }

    /// Number of recorded events equal to `event` (updates compare by time)
    pub fn count(&self, event: TweenEvent) -> usize {
        self.events.iter().filter(|e| **e == event).count()
    }

    /// Number of update events regardless of their time
    pub fn update_count(&self) -> usize {
        self.updates().count()
    }

    /// Times carried by the recorded update events, in order
    pub fn updates(&self) -> impl Iterator<Item = f32> + '_ {
        self.events.iter().filter_map(|e| match e {
            TweenEvent::Update(time) => Some(*time),
            _ => None,
        })
    }

    /// Last recorded update time
    pub fn last_update(&self) -> Option<f32> {
        self.updates().last()
    }

    /// Recorded events with updates filtered out
    pub fn lifecycle(&self) -> Vec<TweenEvent> {
        self.events
            .iter()
            .copied()
            .filter(|e| !matches!(e, TweenEvent::Update(_)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl TweenEvents for EventLog {
    fn on_ready(&mut self) {
        self.events.push(TweenEvent::Ready);
    }

    fn on_start(&mut self) {
        self.events.push(TweenEvent::Start);
    }

    fn on_stop(&mut self) {
        self.events.push(TweenEvent::Stop);
    }

    fn on_pause(&mut self) {
        self.events.push(TweenEvent::Pause);
    }

    fn on_resume(&mut self) {
        self.events.push(TweenEvent::Resume);
    }

    fn on_rewind(&mut self) {
        self.events.push(TweenEvent::Rewind);
    }

    fn on_update(&mut self, time: f32) {
        self.events.push(TweenEvent::Update(time));
    }
}
