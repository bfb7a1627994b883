//! Tween runner
//!
//! Owns every tween and named sequence and advances them each frame. A
//! registered tween is either *free* (ticked on its own) or a member of
//! exactly one sequence (ticked by that sequence). Play/stop/pause/resume on
//! a sequence member target the whole sequence.
//!
//! The runner is an explicit instance created by the host at startup; there
//! is no global registry.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use cadence_core::{Tween, TweenArena, TweenId};

use crate::config::RunnerConfig;
use crate::sequence::{allocate_indices, Sequence};

/// Where a tween is registered
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Membership {
    /// Ticked directly by the runner
    #[default]
    Free,
    /// Ticked by the named sequence, which is created on first use
    Sequence {
        name: String,
        reverse: bool,
        /// Real seconds for a reverse pass; non-positive means the forward duration
        reverse_duration: f32,
    },
}

impl Membership {
    /// Forward-playing sequence membership
    pub fn sequence(name: impl Into<String>) -> Self {
        Membership::Sequence {
            name: name.into(),
            reverse: false,
            reverse_duration: 0.0,
        }
    }

    /// Reverse-playing sequence membership
    pub fn reversed(name: impl Into<String>, reverse_duration: f32) -> Self {
        Membership::Sequence {
            name: name.into(),
            reverse: true,
            reverse_duration,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Registration {
    Free,
    Sequence(String),
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// The scheduler that ticks all registered tweens and sequences
pub struct TweenRunner {
    tweens: TweenArena,
    free: Vec<TweenId>,
    sequences: IndexMap<String, Sequence>,
    registrations: FxHashMap<TweenId, Registration>,
    config: RunnerConfig,
}

impl TweenRunner {
    /// Create a runner for one animation subsystem
    pub fn create(config: RunnerConfig) -> Self {
        tracing::debug!(
            "Tween runner created (time_scale {}, max_delta_time {:?})",
            config.time_scale,
            config.max_delta_time
        );
        Self {
            tweens: TweenArena::with_key(),
            free: Vec::new(),
            sequences: IndexMap::new(),
            registrations: FxHashMap::default(),
            config,
        }
    }

    pub fn new() -> Self {
        Self::create(RunnerConfig::default())
    }

    /// Tear the runner down, dropping every registration and tween
    pub fn shutdown(mut self) {
        self.cleanup();
        tracing::debug!("Tween runner shut down with {} tweens", self.tweens.len());
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Set the global time scale used by [`advance`](Self::advance)
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.config.time_scale = sanitize(time_scale);
    }

    // ========== Storage ==========

    /// Store a tween; it is not ticked until registered with [`add`](Self::add)
    pub fn insert(&mut self, tween: Tween) -> TweenId {
        self.tweens.insert(tween)
    }

    pub fn tween(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.get(id)
    }

    pub fn tween_mut(&mut self, id: TweenId) -> Option<&mut Tween> {
        self.tweens.get_mut(id)
    }

    /// Deregister and drop a tween, detaching its event sink
    pub fn release(&mut self, id: TweenId) -> Option<Tween> {
        self.remove(id);
        let mut tween = self.tweens.remove(id)?;
        tween.release();
        Some(tween)
    }

    /// Iterate over all stored tweens
    pub fn tweens_iter(&self) -> impl Iterator<Item = (TweenId, &Tween)> {
        self.tweens.iter()
    }

    // ========== Registration ==========

    /// Register a stored tween. Registering twice is a no-op returning `false`.
    ///
    /// Joining a sequence overwrites that sequence's reverse settings.
    pub fn add(&mut self, id: TweenId, membership: Membership) -> bool {
        if self.registrations.contains_key(&id) {
            return false;
        }
        if !self.tweens.contains_key(id) {
            tracing::warn!("Ignoring registration of unknown tween {:?}", id);
            return false;
        }

        match membership {
            Membership::Free => {
                self.free.push(id);
                self.registrations.insert(id, Registration::Free);
            }
            Membership::Sequence {
                name,
                reverse,
                reverse_duration,
            } => {
                let sequence = self.sequences.entry(name.clone()).or_insert_with(|| {
                    tracing::debug!("Created sequence '{}'", name);
                    Sequence::new()
                });
                sequence.set_reverse(reverse, reverse_duration);
                sequence.add_child(id, &mut self.tweens);
                self.registrations.insert(id, Registration::Sequence(name));
            }
        }
        true
    }

    /// Register several tweens with one sequence, allocating their indices as a batch.
    ///
    /// Returns the number of tweens newly registered.
    pub fn add_sequence_batch(
        &mut self,
        name: &str,
        ids: &[TweenId],
        reverse: bool,
        reverse_duration: f32,
    ) -> usize {
        let mut seen = FxHashSet::default();
        let pending: Vec<TweenId> = ids
            .iter()
            .copied()
            .filter(|id| {
                seen.insert(*id)
                    && !self.registrations.contains_key(id)
                    && self.tweens.contains_key(*id)
            })
            .collect();

        let claimed: Vec<u32> = self
            .sequences
            .get(name)
            .map(|seq| seq.indices().collect())
            .unwrap_or_default();
        let requested: Vec<Option<u32>> = pending
            .iter()
            .map(|id| self.tweens.get(*id).and_then(|t| t.index))
            .collect();

        for (id, index) in pending.iter().zip(allocate_indices(claimed, &requested)) {
            if let Some(tween) = self.tweens.get_mut(*id) {
                tween.index = Some(index);
            }
        }

        pending
            .into_iter()
            .filter(|id| {
                self.add(
                    *id,
                    Membership::Sequence {
                        name: name.to_string(),
                        reverse,
                        reverse_duration,
                    },
                )
            })
            .count()
    }

    /// Deregister a tween from whichever container holds it. The tween stays stored.
    pub fn remove(&mut self, id: TweenId) -> bool {
        match self.registrations.remove(&id) {
            Some(Registration::Free) => {
                self.free.retain(|free| *free != id);
                true
            }
            Some(Registration::Sequence(name)) => {
                if let Some(sequence) = self.sequences.get_mut(&name) {
                    sequence.remove_child(id, &self.tweens);
                }
                true
            }
            None => false,
        }
    }

    /// Is the tween registered anywhere
    pub fn contains(&self, id: TweenId) -> bool {
        self.registrations.contains_key(&id)
    }

    /// Name of the sequence a tween belongs to
    pub fn sequence_of(&self, id: TweenId) -> Option<&str> {
        match self.registrations.get(&id) {
            Some(Registration::Sequence(name)) => Some(name),
            _ => None,
        }
    }

    // ========== Control ==========

    pub fn play(&mut self, id: TweenId) -> bool {
        match self.registrations.get(&id).cloned() {
            Some(Registration::Free) => {
                if let Some(tween) = self.tweens.get_mut(id) {
                    tween.play();
                }
                true
            }
            Some(Registration::Sequence(name)) => self.play_sequence(&name),
            None => false,
        }
    }

    pub fn stop(&mut self, id: TweenId) -> bool {
        match self.registrations.get(&id).cloned() {
            Some(Registration::Free) => {
                if let Some(tween) = self.tweens.get_mut(id) {
                    tween.stop();
                }
                true
            }
            Some(Registration::Sequence(name)) => self.stop_sequence(&name),
            None => false,
        }
    }

    pub fn pause(&mut self, id: TweenId) -> bool {
        match self.registrations.get(&id).cloned() {
            Some(Registration::Free) => {
                if let Some(tween) = self.tweens.get_mut(id) {
                    tween.pause();
                }
                true
            }
            Some(Registration::Sequence(name)) => self
                .sequences
                .get_mut(&name)
                .map(|seq| seq.pause())
                .is_some(),
            None => false,
        }
    }

    pub fn resume(&mut self, id: TweenId) -> bool {
        match self.registrations.get(&id).cloned() {
            Some(Registration::Free) => {
                if let Some(tween) = self.tweens.get_mut(id) {
                    tween.resume();
                }
                true
            }
            Some(Registration::Sequence(name)) => self
                .sequences
                .get_mut(&name)
                .map(|seq| seq.resume())
                .is_some(),
            None => false,
        }
    }

    /// Play a sequence from the start, resetting its members
    pub fn play_sequence(&mut self, name: &str) -> bool {
        let Some(sequence) = self.sequences.get_mut(name) else {
            tracing::warn!("Cannot play unknown sequence '{}'", name);
            return false;
        };
        sequence.play(&mut self.tweens);
        true
    }

    pub fn stop_sequence(&mut self, name: &str) -> bool {
        let Some(sequence) = self.sequences.get_mut(name) else {
            tracing::warn!("Cannot stop unknown sequence '{}'", name);
            return false;
        };
        sequence.stop();
        true
    }

    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.get(name)
    }

    pub fn sequence_mut(&mut self, name: &str) -> Option<&mut Sequence> {
        self.sequences.get_mut(name)
    }

    pub fn is_sequence_child(&self, name: &str, id: TweenId) -> bool {
        self.sequences
            .get(name)
            .is_some_and(|sequence| sequence.contains(id))
    }

    /// Scrub a sequence without changing any play state
    pub fn seek_sequence(&mut self, name: &str, time: f32) -> bool {
        let Some(sequence) = self.sequences.get_mut(name) else {
            return false;
        };
        sequence.seek_to(time, &self.tweens);
        true
    }

    // ========== Frame ==========

    /// Advance all running free tweens, then all running sequences
    pub fn tick(&mut self, delta_time: f32, time_scale: f32) {
        let mut delta_time = sanitize(delta_time);
        if let Some(max) = self.config.max_delta_time {
            delta_time = delta_time.min(sanitize(max));
        }
        let time_scale = sanitize(time_scale);

        tracing::trace!(
            "Tick dt={:.4} scale={:.2}: {} free, {} sequences",
            delta_time,
            time_scale,
            self.free.len(),
            self.sequences.len()
        );

        for id in &self.free {
            if let Some(tween) = self.tweens.get_mut(*id) {
                if tween.is_run() {
                    tween.tick(delta_time, time_scale);
                }
            }
        }

        for sequence in self.sequences.values_mut() {
            if sequence.is_run() {
                sequence.tick(delta_time, time_scale, &mut self.tweens);
            }
        }
    }

    /// Advance with the configured global time scale
    pub fn advance(&mut self, delta_time: f32) {
        self.tick(delta_time, self.config.time_scale);
    }

    /// Drop every registration and sequence; stored tweens survive
    pub fn cleanup(&mut self) {
        tracing::debug!(
            "Runner cleanup: {} registrations, {} sequences",
            self.registrations.len(),
            self.sequences.len()
        );
        self.free.clear();
        self.registrations.clear();
        self.sequences.clear();
    }

    // ========== Introspection ==========

    /// Number of stored tweens, registered or not
    pub fn tween_count(&self) -> usize {
        self.tweens.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn registered_count(&self) -> usize {
        self.registrations.len()
    }

    /// Check if any free tween or sequence is still running
    pub fn has_running(&self) -> bool {
        self.free
            .iter()
            .filter_map(|id| self.tweens.get(*id))
            .any(|tween| tween.is_run())
            || self.sequences.values().any(|sequence| sequence.is_run())
    }
}

impl Default for TweenRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{EventLog, EventSink, TweenEvent, TweenEvents, TweenState};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn logged(runner: &mut TweenRunner, duration: f32) -> (TweenId, Rc<RefCell<EventLog>>) {
        let log = EventLog::shared();
        let sink: EventSink = log.clone();
        let id = runner.insert(Tween::new(duration, 1).with_events(&sink));
        (id, log)
    }

    /// Records which tagged sink saw an update, in order
    struct OrderProbe {
        tag: &'static str,
        seen: Rc<RefCell<Vec<&'static str>>>,
    }

    impl TweenEvents for OrderProbe {
        fn on_update(&mut self, _time: f32) {
            self.seen.borrow_mut().push(self.tag);
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut runner = TweenRunner::new();
        let (id, _log) = logged(&mut runner, 1.0);

        assert!(runner.add(id, Membership::Free));
        assert!(!runner.add(id, Membership::Free));
        assert!(!runner.add(id, Membership::sequence("intro")));
        assert_eq!(runner.free_count(), 1);
        assert_eq!(runner.registered_count(), 1);
        assert_eq!(runner.sequence_count(), 0);
    }

    #[test]
    fn test_unknown_tween_is_silent_noop() {
        let mut runner = TweenRunner::new();
        let (id, _log) = logged(&mut runner, 1.0);
        runner.release(id);

        assert!(!runner.add(id, Membership::Free));
        assert!(!runner.remove(id));
        assert!(!runner.play(id));
        assert!(!runner.stop(id));
        assert!(!runner.pause(id));
    }

    #[test]
    fn test_free_tween_runs_to_stop() {
        let mut runner = TweenRunner::new();
        let (id, log) = logged(&mut runner, 1.0);
        runner.add(id, Membership::Free);
        runner.play(id);

        for _ in 0..4 {
            runner.tick(0.25, 1.0);
        }
        assert!(runner.tween(id).is_some_and(|t| t.is_stop()));
        assert_eq!(log.borrow().count(TweenEvent::Stop), 1);
        assert!(!runner.has_running());
    }

    #[test]
    fn test_playing_member_plays_its_sequence() {
        let mut runner = TweenRunner::new();
        let (a, _la) = logged(&mut runner, 1.0);
        let (b, _lb) = logged(&mut runner, 1.0);
        runner.add(a, Membership::sequence("intro"));
        runner.add(b, Membership::sequence("intro"));

        assert_eq!(runner.tween(b).and_then(|t| t.index), Some(1));

        runner.play(b);
        assert!(runner.sequence("intro").is_some_and(|s| s.is_run()));
        assert_eq!(runner.sequence("intro").map(|s| s.duration()), Some(2.0));

        runner.tick(0.5, 1.0);
        assert!(runner.tween(a).is_some_and(|t| t.is_run()));
        assert_eq!(runner.tween(b).map(|t| t.state()), Some(TweenState::Ready));

        runner.pause(a);
        assert_eq!(
            runner.sequence("intro").map(|s| s.state()),
            Some(TweenState::Pause)
        );
        runner.resume(b);
        runner.stop(a);
        assert!(runner.sequence("intro").is_some_and(|s| s.is_stop()));
    }

    #[test]
    fn test_remove_routes_to_container() {
        let mut runner = TweenRunner::new();
        let (a, _la) = logged(&mut runner, 2.0);
        let (b, _lb) = logged(&mut runner, 1.0);
        let (c, _lc) = logged(&mut runner, 1.0);
        runner.add(a, Membership::sequence("intro"));
        runner.add(b, Membership::sequence("intro"));
        runner.add(c, Membership::Free);

        assert!(runner.remove(a));
        assert!(!runner.is_sequence_child("intro", a));
        assert_eq!(runner.sequence("intro").map(|s| s.duration()), Some(1.0));

        assert!(runner.remove(c));
        assert_eq!(runner.free_count(), 0);
        assert_eq!(runner.registered_count(), 1);
        // Storage is untouched by deregistration
        assert_eq!(runner.tween_count(), 3);
    }

    #[test]
    fn test_batch_allocation_avoids_claimed_indices() {
        let mut runner = TweenRunner::new();
        let a = runner.insert(Tween::new(1.0, 1).with_index(1));
        runner.add(a, Membership::sequence("grid"));

        let (b, _lb) = logged(&mut runner, 1.0);
        let (c, _lc) = logged(&mut runner, 1.0);
        let d = runner.insert(Tween::new(1.0, 1).with_index(3));

        assert_eq!(runner.add_sequence_batch("grid", &[b, c, d, b], false, 0.0), 3);
        assert_eq!(runner.tween(b).and_then(|t| t.index), Some(0));
        assert_eq!(runner.tween(c).and_then(|t| t.index), Some(2));
        assert_eq!(runner.tween(d).and_then(|t| t.index), Some(3));
        assert_eq!(runner.sequence("grid").map(|s| s.duration()), Some(4.0));
    }

    #[test]
    fn test_last_registration_sets_reverse() {
        let mut runner = TweenRunner::new();
        let (a, _la) = logged(&mut runner, 1.0);
        let (b, _lb) = logged(&mut runner, 2.0);
        runner.add(a, Membership::sequence("outro"));
        runner.add(b, Membership::reversed("outro", 1.5));

        let seq = runner.sequence("outro").unwrap();
        assert!(seq.is_reverse());
        assert_eq!(seq.reverse_scale(), 2.0);
    }

    #[test]
    fn test_free_tweens_tick_before_sequences() {
        let mut runner = TweenRunner::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seq_sink: EventSink = Rc::new(RefCell::new(OrderProbe {
            tag: "sequence",
            seen: seen.clone(),
        }));
        let free_sink: EventSink = Rc::new(RefCell::new(OrderProbe {
            tag: "free",
            seen: seen.clone(),
        }));

        let member = runner.insert(Tween::new(1.0, 1).with_events(&seq_sink));
        runner.add(member, Membership::sequence("s"));
        let free = runner.insert(Tween::new(1.0, 1).with_events(&free_sink));
        runner.add(free, Membership::Free);

        runner.play(free);
        runner.play(member);
        seen.borrow_mut().clear();

        runner.tick(0.1, 1.0);
        let seen = seen.borrow();
        assert_eq!(seen.first(), Some(&"free"));
        assert_eq!(seen.last(), Some(&"sequence"));
    }

    #[test]
    fn test_delta_sanitising() {
        let mut runner = TweenRunner::create(RunnerConfig {
            time_scale: 1.0,
            max_delta_time: Some(0.1),
        });
        let (id, _log) = logged(&mut runner, 1.0);
        runner.add(id, Membership::Free);
        runner.play(id);

        runner.advance(5.0);
        assert!((runner.tween(id).unwrap().time() - 0.1).abs() < 1e-6);

        runner.tick(-1.0, 1.0);
        runner.tick(f32::NAN, 1.0);
        runner.tick(0.1, -3.0);
        assert!((runner.tween(id).unwrap().time() - 0.1).abs() < 1e-6);

        runner.set_time_scale(0.5);
        runner.advance(0.1);
        assert!((runner.tween(id).unwrap().time() - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_seek_sequence_scrubs_without_playing() {
        let mut runner = TweenRunner::new();
        let (a, la) = logged(&mut runner, 1.0);
        let (b, lb) = logged(&mut runner, 1.0);
        runner.add(a, Membership::sequence("s"));
        runner.add(b, Membership::sequence("s"));

        assert!(runner.seek_sequence("s", 1.5));
        assert_eq!(la.borrow().last_update(), Some(1.5));
        assert_eq!(lb.borrow().last_update(), Some(0.5));
        assert!(!runner.has_running());
        assert!(!runner.seek_sequence("missing", 0.0));
    }

    #[test]
    fn test_release_detaches_sink() {
        let mut runner = TweenRunner::new();
        let (id, log) = logged(&mut runner, 1.0);
        runner.add(id, Membership::Free);

        let mut tween = runner.release(id).unwrap();
        assert!(!runner.contains(id));
        assert_eq!(runner.tween_count(), 0);

        tween.play();
        assert!(log.borrow().events().is_empty());
    }

    #[test]
    fn test_cleanup_clears_registries() {
        let mut runner = TweenRunner::new();
        let (a, _la) = logged(&mut runner, 1.0);
        let (b, _lb) = logged(&mut runner, 1.0);
        runner.add(a, Membership::Free);
        runner.add(b, Membership::sequence("s"));

        runner.cleanup();
        assert_eq!(runner.registered_count(), 0);
        assert_eq!(runner.free_count(), 0);
        assert_eq!(runner.sequence_count(), 0);
        assert!(!runner.play(a));

        // Re-registration after cleanup works
        assert!(runner.add(a, Membership::Free));
        runner.shutdown();
    }
}
