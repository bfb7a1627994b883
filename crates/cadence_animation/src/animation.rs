//! Tween animations
//!
//! [`TweenAnimation`] is the bridge between one runner tween and the value
//! animators ([`AnimationTrack`]s) of a target. It turns the tween's elapsed
//! time into a delay-aware rate, or hands it to an [`ArrayAnimation`] when
//! the animation is expanded into a grid.
//!
//! Animations are shared through [`AnimationHandle`]. Handle operations never
//! hold a borrow of the animation while the runner dispatches events back to
//! it.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use cadence_core::{EventSink, Tween, TweenEvents, TweenId};

use crate::array::{ArrayAnimation, ArrayHost, MemberTiming};
use crate::error::Result;
use crate::runner::{Membership, TweenRunner};

/// A value animator driven by normalized rate (transform, color, material, ...)
pub trait AnimationTrack {
    fn on_start(&mut self) {}

    /// `rate` is in `[0, 1]` for a running animation
    fn on_update(&mut self, rate: f32);

    fn on_stop(&mut self) {}

    /// The owning animation is going away
    fn release(&mut self) {}
}

/// How an animation joins a named sequence
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequenceSettings {
    pub name: String,
    /// Bucket index; `None` is allocated on registration
    pub index: Option<u32>,
    pub reverse: bool,
    pub reverse_duration: f32,
}

impl SequenceSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: None,
            reverse: false,
            reverse_duration: 0.0,
        }
    }

    pub fn at(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    pub fn reversed(mut self, reverse_duration: f32) -> Self {
        self.reverse = true;
        self.reverse_duration = reverse_duration;
        self
    }
}

struct ArrayBinding {
    engine: ArrayAnimation,
    host: Box<dyn ArrayHost>,
}

/// One animated target: timing, tracks and an optional grid expansion
pub struct TweenAnimation {
    pub name: String,
    pub duration: f32,
    pub delay: f32,
    pub loops: i32,
    pub auto_play: bool,
    pub ignore_time_scale: bool,
    pub sequence: Option<SequenceSettings>,
    tracks: Vec<Box<dyn AnimationTrack>>,
    array: Option<ArrayBinding>,
    tween: Option<TweenId>,
    cur_time: f32,
    cur_delay: f32,
    cur_rate: f32,
    on_start: Option<Box<dyn FnMut()>>,
    on_stop: Option<Box<dyn FnMut()>>,
}

impl TweenAnimation {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration: duration.max(0.0),
            delay: 0.0,
            loops: 1,
            auto_play: false,
            ignore_time_scale: false,
            sequence: None,
            tracks: Vec::new(),
            array: None,
            tween: None,
            cur_time: 0.0,
            cur_delay: 0.0,
            cur_rate: 0.0,
            on_start: None,
            on_stop: None,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    pub fn with_loops(mut self, loops: i32) -> Self {
        self.loops = loops;
        self
    }

    pub fn with_track(mut self, track: impl AnimationTrack + 'static) -> Self {
        self.tracks.push(Box::new(track));
        self
    }

    pub fn with_sequence(mut self, settings: SequenceSettings) -> Self {
        self.sequence = Some(settings);
        self
    }

    /// Expand into a grid; `host` clones the template and owns the container
    pub fn with_array(mut self, engine: ArrayAnimation, host: impl ArrayHost + 'static) -> Self {
        self.array = Some(ArrayBinding {
            engine,
            host: Box::new(host),
        });
        self
    }

    pub fn auto_play(mut self) -> Self {
        self.auto_play = true;
        self
    }

    pub fn ignoring_time_scale(mut self) -> Self {
        self.ignore_time_scale = true;
        self
    }

    pub fn set_on_start(&mut self, callback: impl FnMut() + 'static) {
        self.on_start = Some(Box::new(callback));
    }

    pub fn set_on_stop(&mut self, callback: impl FnMut() + 'static) {
        self.on_stop = Some(Box::new(callback));
    }

    pub fn add_track(&mut self, track: impl AnimationTrack + 'static) {
        self.tracks.push(Box::new(track));
    }

    /// Runner tween created by the last init
    pub fn tween_id(&self) -> Option<TweenId> {
        self.tween
    }

    /// Time past the delay, from the last update
    pub fn current_time(&self) -> f32 {
        self.cur_time
    }

    /// Delay consumed so far, from the last update
    pub fn current_delay(&self) -> f32 {
        self.cur_delay
    }

    /// Rate before any reverse mirroring, from the last update
    pub fn current_rate(&self) -> f32 {
        self.cur_rate
    }

    pub fn array(&self) -> Option<&ArrayAnimation> {
        self.array.as_ref().map(|binding| &binding.engine)
    }

    pub fn array_mut(&mut self) -> Option<&mut ArrayAnimation> {
        self.array.as_mut().map(|binding| &mut binding.engine)
    }

    /// Expanded into a grid on init
    pub fn is_array(&self) -> bool {
        self.array
            .as_ref()
            .is_some_and(|binding| binding.engine.is_array())
    }

    fn is_reverse_play(&self) -> bool {
        self.sequence.as_ref().is_some_and(|seq| seq.reverse)
    }

    /// Where this animation's tween registers
    pub fn membership(&self) -> Membership {
        match &self.sequence {
            Some(seq) => Membership::Sequence {
                name: seq.name.clone(),
                reverse: seq.reverse,
                reverse_duration: seq.reverse_duration,
            },
            None => Membership::Free,
        }
    }

    fn timing(&self) -> MemberTiming {
        MemberTiming {
            delay: self.delay,
            duration: self.duration,
            loops: self.loops,
        }
    }
}

impl TweenEvents for TweenAnimation {
    fn on_ready(&mut self) {
        for track in &mut self.tracks {
            track.on_update(0.0);
        }
    }

    fn on_start(&mut self) {
        match self.array.as_mut().filter(|b| b.engine.is_array()) {
            Some(binding) => binding.engine.on_start(),
            None => {
                for track in &mut self.tracks {
                    track.on_start();
                }
            }
        }
        if let Some(callback) = &mut self.on_start {
            callback();
        }
    }

    fn on_stop(&mut self) {
        match self.array.as_mut().filter(|b| b.engine.is_array()) {
            Some(binding) => binding.engine.on_stop(),
            None => {
                for track in &mut self.tracks {
                    track.on_stop();
                }
            }
        }
        if let Some(callback) = &mut self.on_stop {
            callback();
        }
    }

    fn on_update(&mut self, time: f32) {
        let reverse = self.is_reverse_play();
        if let Some(binding) = self.array.as_mut().filter(|b| b.engine.is_array()) {
            binding.engine.on_update(time, reverse);
            return;
        }

        if time < self.delay {
            self.cur_delay = time;
            self.cur_time = 0.0;
            self.cur_rate = 0.0;
        } else {
            self.cur_delay = self.delay;
            self.cur_time = time - self.delay;
            self.cur_rate = if self.duration > 0.0 {
                self.cur_time / self.duration
            } else {
                0.0
            };
        }

        let rate = if reverse {
            (1.0 - self.cur_rate).clamp(0.0, 1.0)
        } else {
            self.cur_rate
        };
        for track in &mut self.tracks {
            track.on_update(rate);
        }
    }
}

impl std::fmt::Debug for TweenAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TweenAnimation")
            .field("name", &self.name)
            .field("duration", &self.duration)
            .field("delay", &self.delay)
            .field("loops", &self.loops)
            .field("sequence", &self.sequence)
            .field("tracks", &self.tracks.len())
            .field("array", &self.array())
            .field("tween", &self.tween)
            .finish()
    }
}

/// Shared handle to a [`TweenAnimation`]
#[derive(Clone)]
pub struct AnimationHandle(Rc<RefCell<TweenAnimation>>);

impl AnimationHandle {
    pub fn new(animation: TweenAnimation) -> Self {
        Self(Rc::new(RefCell::new(animation)))
    }

    pub fn borrow(&self) -> Ref<'_, TweenAnimation> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, TweenAnimation> {
        self.0.borrow_mut()
    }

    pub fn downgrade(&self) -> Weak<RefCell<TweenAnimation>> {
        Rc::downgrade(&self.0)
    }

    pub fn from_rc(inner: Rc<RefCell<TweenAnimation>>) -> Self {
        Self(inner)
    }

    pub fn ptr_eq(&self, other: &AnimationHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The animation as an event sink
    pub fn sink(&self) -> EventSink {
        self.0.clone()
    }

    pub fn tween_id(&self) -> Option<TweenId> {
        self.0.borrow().tween
    }

    /// (Re)initialize timing and the tween, building the grid if any.
    ///
    /// Leaves the tween Ready and deregistered; see [`create_tween`](Self::create_tween).
    pub fn init_tween(&self, runner: &mut TweenRunner) -> Result<()> {
        let sink = self.sink();
        let id = {
            let mut guard = self.0.borrow_mut();
            let anim = &mut *guard;
            if let Some(binding) = anim.array.as_ref().filter(|b| b.engine.is_array()) {
                binding.engine.validate()?;
            }

            anim.cur_time = 0.0;
            anim.cur_delay = 0.0;
            anim.cur_rate = 0.0;

            let total = anim.delay + anim.duration;
            let id = match anim.tween.filter(|id| runner.tween(*id).is_some()) {
                Some(id) => id,
                None => runner.insert(Tween::new(total, anim.loops)),
            };
            anim.tween = Some(id);

            let template = anim.timing();
            let (duration, loops) = match anim.array.as_mut().filter(|b| b.engine.is_array()) {
                Some(binding) => {
                    anim.sequence = None;
                    binding
                        .engine
                        .build(template, binding.host.as_mut(), runner)?;
                    (binding.engine.duration(), 1)
                }
                None => (total, anim.loops),
            };

            if let Some(tween) = runner.tween_mut(id) {
                tween.duration = duration.max(0.0);
                tween.loops = loops;
                tween.ignore_time_scale = anim.ignore_time_scale;
                tween.index = anim.sequence.as_ref().and_then(|seq| seq.index);
                tween.set_events(&sink);
            }
            id
        };

        runner.remove(id);
        if let Some(tween) = runner.tween_mut(id) {
            tween.reset();
        }
        Ok(())
    }

    /// Init and register with the runner.
    ///
    /// A sequence member that is already registered is left alone.
    pub fn create_tween(&self, runner: &mut TweenRunner) -> Result<()> {
        let registered = {
            let anim = self.0.borrow();
            match (&anim.sequence, anim.tween) {
                (Some(seq), Some(id)) => runner.is_sequence_child(&seq.name, id),
                _ => false,
            }
        };
        if registered {
            return Ok(());
        }

        self.init_tween(runner)?;
        let (id, membership) = {
            let anim = self.0.borrow();
            (anim.tween, anim.membership())
        };
        if let Some(id) = id {
            runner.add(id, membership);
        }
        Ok(())
    }

    /// Create the tween and start it if the animation auto-plays
    pub fn activate(&self, runner: &mut TweenRunner) -> Result<()> {
        self.create_tween(runner)?;
        if self.0.borrow().auto_play {
            self.replay(runner);
        }
        Ok(())
    }

    /// Play through the runner; a sequence member plays its whole sequence
    pub fn play(&self, runner: &mut TweenRunner) -> bool {
        match self.tween_id() {
            Some(id) => runner.play(id),
            None => false,
        }
    }

    /// Rewind silently, then play
    pub fn replay(&self, runner: &mut TweenRunner) -> bool {
        let Some(id) = self.tween_id() else {
            return false;
        };
        if let Some(tween) = runner.tween_mut(id) {
            tween.reset_state();
        }
        runner.play(id)
    }

    pub fn stop(&self, runner: &mut TweenRunner) -> bool {
        match self.tween_id() {
            Some(id) => runner.stop(id),
            None => false,
        }
    }

    /// Drop the tween, release tracks and tear down the grid
    pub fn release_tween(&self, runner: &mut TweenRunner) {
        let id = self.0.borrow_mut().tween.take();
        if let Some(id) = id {
            runner.release(id);
        }

        let mut anim = self.0.borrow_mut();
        for track in &mut anim.tracks {
            track.release();
        }
        if let Some(binding) = anim.array.as_mut() {
            binding.engine.teardown(binding.host.as_mut(), runner);
        }
        tracing::debug!("Released animation '{}'", anim.name);
    }
}

impl std::fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(anim) => std::fmt::Debug::fmt(&*anim, f),
            Err(_) => f.write_str("AnimationHandle(<borrowed>)"),
        }
    }
}
