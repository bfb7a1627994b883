//! Name-indexed animation library
//!
//! Groups live animations by name so hosts can trigger every animation
//! called "intro" at once, or (re)register all members of a sequence as one
//! batch. Animations are held weakly and vanish once their owner drops them.

use std::cell::RefCell;
use std::rc::Weak;

use indexmap::IndexMap;

use crate::animation::{AnimationHandle, TweenAnimation};
use crate::error::Result;
use crate::runner::TweenRunner;

#[derive(Default)]
pub struct AnimationLibrary {
    animations: IndexMap<String, Vec<Weak<RefCell<TweenAnimation>>>>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an animation under its name; registering twice is a no-op
    pub fn register(&mut self, handle: &AnimationHandle) {
        let name = handle.borrow().name.clone();
        let entries = self.animations.entry(name).or_default();
        entries.retain(|weak| weak.strong_count() > 0);

        let weak = handle.downgrade();
        if !entries.iter().any(|entry| entry.ptr_eq(&weak)) {
            entries.push(weak);
        }
    }

    pub fn unregister(&mut self, handle: &AnimationHandle) {
        let name = handle.borrow().name.clone();
        let weak = handle.downgrade();
        if let Some(entries) = self.animations.get_mut(&name) {
            entries.retain(|entry| !entry.ptr_eq(&weak) && entry.strong_count() > 0);
        }
    }

    /// Live animations registered under `name`
    pub fn animations(&self, name: &str) -> Vec<AnimationHandle> {
        self.animations
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|weak| weak.upgrade().map(AnimationHandle::from_rc))
            .collect()
    }

    fn all(&self) -> impl Iterator<Item = AnimationHandle> + '_ {
        self.animations
            .values()
            .flatten()
            .filter_map(|weak| weak.upgrade().map(AnimationHandle::from_rc))
    }

    /// Live animations belonging to the named sequence, in registration order
    pub fn sequence_members(&self, sequence: &str) -> Vec<AnimationHandle> {
        self.all()
            .filter(|handle| {
                handle
                    .borrow()
                    .sequence
                    .as_ref()
                    .is_some_and(|seq| seq.name == sequence)
            })
            .collect()
    }

    /// Replay every animation registered under `name`
    pub fn play_all(&self, name: &str, runner: &mut TweenRunner) -> usize {
        let handles = self.animations(name);
        for handle in &handles {
            handle.replay(runner);
        }
        handles.len()
    }

    /// Re-register the named sequence in the given direction and play it
    pub fn play_sequence(&self, sequence: &str, reverse: bool, runner: &mut TweenRunner) -> Result<bool> {
        let members = self.sequence_members(sequence);
        let Some(first) = members.first() else {
            tracing::warn!("No animations belong to sequence '{}'", sequence);
            return Ok(false);
        };

        for handle in &members {
            if let Some(seq) = handle.borrow_mut().sequence.as_mut() {
                seq.reverse = reverse;
            }
        }

        self.add_to_runner(first, runner)?;
        Ok(runner.play_sequence(sequence))
    }

    /// Init and register an animation.
    ///
    /// A sequence member brings every library sibling of its sequence along,
    /// registered as one batch with the member's reverse settings. Returns
    /// the number of tweens newly registered.
    pub fn add_to_runner(&self, handle: &AnimationHandle, runner: &mut TweenRunner) -> Result<usize> {
        let settings = if handle.borrow().is_array() {
            None
        } else {
            handle.borrow().sequence.clone()
        };

        let Some(settings) = settings else {
            handle.init_tween(runner)?;
            let (id, membership) = {
                let anim = handle.borrow();
                (anim.tween_id(), anim.membership())
            };
            return Ok(id.is_some_and(|id| runner.add(id, membership)) as usize);
        };

        let mut members = self.sequence_members(&settings.name);
        if !members.iter().any(|member| member.ptr_eq(handle)) {
            members.insert(0, handle.clone());
        }

        let mut ids = Vec::with_capacity(members.len());
        for member in &members {
            if let Some(seq) = member.borrow_mut().sequence.as_mut() {
                seq.reverse = settings.reverse;
                seq.reverse_duration = settings.reverse_duration;
            }
            member.init_tween(runner)?;
            ids.extend(member.tween_id());
        }

        let added = runner.add_sequence_batch(
            &settings.name,
            &ids,
            settings.reverse,
            settings.reverse_duration,
        );
        tracing::debug!(
            "Registered {} of {} members of sequence '{}'",
            added,
            members.len(),
            settings.name
        );
        Ok(added)
    }

    /// Number of live animations across all names
    pub fn len(&self) -> usize {
        self.all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
