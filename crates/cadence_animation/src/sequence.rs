//! Tween sequences
//!
//! A sequence buckets its member tweens by index. Buckets play one after
//! another in ascending index order (or descending, for reverse play); all
//! members of a bucket play together and the bucket lasts as long as its
//! longest member.
//!
//! ```text
//! index 0: [== a ==]
//!          [===== b =====]
//! index 1:                [== c ==]
//!          0             2.0      3.0
//! ```

use std::collections::BTreeMap;

use cadence_core::{frame_step, TweenArena, TweenId, TweenState};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Resolve bucket indices for one registration batch.
///
/// `claimed` are indices already in use by siblings. Explicit requests keep
/// their index; each `None` takes the lowest free non-negative index, in
/// order, so a batch packs densely without caller coordination.
pub fn allocate_indices(
    claimed: impl IntoIterator<Item = u32>,
    requested: &[Option<u32>],
) -> Vec<u32> {
    let mut taken: FxHashSet<u32> = claimed.into_iter().collect();
    taken.extend(requested.iter().flatten().copied());

    let mut next = 0;
    requested
        .iter()
        .map(|request| match request {
            Some(index) => *index,
            None => {
                while taken.contains(&next) {
                    next += 1;
                }
                taken.insert(next);
                next
            }
        })
        .collect()
}

/// Members sharing one index
#[derive(Clone, Debug, Default)]
struct Bucket {
    members: SmallVec<[TweenId; 4]>,
    /// Longest member duration, refreshed on membership change
    duration: f32,
}

fn tick_bucket(bucket: &Bucket, delta_time: f32, time_scale: f32, tweens: &mut TweenArena) {
    for id in &bucket.members {
        let Some(tween) = tweens.get_mut(*id) else {
            continue;
        };
        if tween.is_stop() {
            continue;
        }
        if !tween.is_run() {
            tween.play();
        }
        tween.tick(delta_time, time_scale);
    }
}

/// An ordered composition of tweens
#[derive(Clone, Debug)]
pub struct Sequence {
    duration: f32,
    time: f32,
    reverse_play: bool,
    reverse_time: f32,
    reverse_duration: f32,
    reverse_scale: f32,
    buckets: BTreeMap<u32, Bucket>,
    state: TweenState,
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            duration: 0.0,
            time: 0.0,
            reverse_play: false,
            reverse_time: 0.0,
            reverse_duration: 0.0,
            reverse_scale: 1.0,
            buckets: BTreeMap::new(),
            state: TweenState::Ready,
        }
    }

    /// Builder: play buckets in descending order over `reverse_duration` seconds
    pub fn with_reverse(mut self, reverse_duration: f32) -> Self {
        self.set_reverse(true, reverse_duration);
        self
    }

    /// Configure reverse play.
    ///
    /// A non-positive `reverse_duration` means "as long as the forward pass".
    pub fn set_reverse(&mut self, reverse_play: bool, reverse_duration: f32) {
        self.reverse_play = reverse_play;
        self.reverse_duration = reverse_duration;
        self.reverse_scale = self.compute_reverse_scale();
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

    /// Sum of every bucket's longest member
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Forward-equivalent elapsed time
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse_play
    }

    /// Real time elapsed in the current reverse pass
    pub fn reverse_time(&self) -> f32 {
        self.reverse_time
    }

    /// Authored reverse duration, with non-positive values resolved to `duration`
    pub fn reverse_duration(&self) -> f32 {
        if self.reverse_duration > 0.0 {
            self.reverse_duration
        } else {
            self.duration
        }
    }

    /// Forward seconds covered per reverse second
    pub fn reverse_scale(&self) -> f32 {
        self.reverse_scale
    }

    fn compute_reverse_scale(&self) -> f32 {
        let reverse_duration = self.reverse_duration();
        if reverse_duration > 0.0 {
            self.duration / reverse_duration
        } else {
            1.0
        }
    }

    // ========== Membership ==========

    /// Add a tween to the bucket named by its index.
    ///
    /// A tween without an index gets the lowest index not yet used by a
    /// sibling; the chosen index is written back to the tween. Returns
    /// `false` for unknown tweens and for tweens already in the sequence.
    pub fn add_child(&mut self, id: TweenId, tweens: &mut TweenArena) -> bool {
        if self.contains(id) {
            return false;
        }
        let Some(tween) = tweens.get_mut(id) else {
            return false;
        };

        let index = match tween.index {
            Some(index) => index,
            None => {
                let index = allocate_indices(self.buckets.keys().copied(), &[None])[0];
                tween.index = Some(index);
                index
            }
        };

        self.buckets.entry(index).or_default().members.push(id);
        self.refresh_duration(tweens);
        true
    }

    /// Remove a tween from whichever bucket holds it
    pub fn remove_child(&mut self, id: TweenId, tweens: &TweenArena) -> bool {
        let mut found = false;
        for bucket in self.buckets.values_mut() {
            if let Some(pos) = bucket.members.iter().position(|m| *m == id) {
                bucket.members.remove(pos);
                found = true;
            }
        }
        self.refresh_duration(tweens);
        found
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.buckets.values().any(|b| b.members.contains(&id))
    }

    /// Number of member tweens across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(|b| b.members.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Distinct bucket indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.buckets.keys().copied()
    }

    /// All members, bucket by bucket in ascending index order
    pub fn members(&self) -> impl Iterator<Item = TweenId> + '_ {
        self.buckets.values().flat_map(|b| b.members.iter().copied())
    }

    /// Members of one bucket
    pub fn bucket(&self, index: u32) -> Option<&[TweenId]> {
        self.buckets.get(&index).map(|b| b.members.as_slice())
    }

    /// Duration of one bucket (its longest member)
    pub fn bucket_duration(&self, index: u32) -> Option<f32> {
        self.buckets.get(&index).map(|b| b.duration)
    }

    /// Forward time at which a bucket starts playing
    pub fn bucket_offset(&self, index: u32) -> Option<f32> {
        if !self.buckets.contains_key(&index) {
            return None;
        }
        Some(self.buckets.range(..index).map(|(_, b)| b.duration).sum())
    }

    /// Recompute bucket and total durations and the reverse scale.
    ///
    /// Empty buckets are dropped; members missing from `tweens` count as 0.
    pub fn refresh_duration(&mut self, tweens: &TweenArena) {
        self.buckets.retain(|_, bucket| !bucket.members.is_empty());

        self.duration = 0.0;
        for bucket in self.buckets.values_mut() {
            bucket.duration = bucket
                .members
                .iter()
                .filter_map(|id| tweens.get(*id))
                .map(|tween| tween.duration)
                .fold(0.0, f32::max);
            self.duration += bucket.duration;
        }

        self.reverse_scale = self.compute_reverse_scale();
    }

    /// Drop every member
    pub fn release(&mut self) {
        self.buckets.clear();
        self.duration = 0.0;
        self.reverse_scale = self.compute_reverse_scale();
    }

    // ========== Playback ==========

    /// Start from the beginning; every member is reset to Ready
    pub fn play(&mut self, tweens: &mut TweenArena) {
        self.time = 0.0;
        self.reverse_time = 0.0;
        self.state = TweenState::Run;

        for id in self.buckets.values().flat_map(|b| b.members.iter()) {
            if let Some(tween) = tweens.get_mut(*id) {
                tween.reset();
            }
        }

        self.refresh_duration(tweens);
        tracing::debug!(
            "Sequence playing: {} members, duration {:.3}s, reverse {}",
            self.len(),
            self.duration,
            self.reverse_play
        );
    }

    pub fn stop(&mut self) {
        self.time = self.duration;
        self.reverse_time = self.reverse_duration();
        self.state = TweenState::Stop;
    }

    pub fn pause(&mut self) {
        if self.state == TweenState::Run {
            self.state = TweenState::Pause;
        }
    }

    pub fn resume(&mut self) {
        if self.state == TweenState::Pause {
            self.state = TweenState::Run;
        }
    }

    pub fn rewind(&mut self) {
        self.time = 0.0;
        self.reverse_time = 0.0;
        self.state = TweenState::Ready;
    }

    /// Back to Ready; members keep their own state until the next `play`
    pub fn reset(&mut self) {
        self.rewind();
    }

    /// Advance a running sequence by one frame
    pub fn tick(&mut self, delta_time: f32, time_scale: f32, tweens: &mut TweenArena) {
        if self.state != TweenState::Run {
            return;
        }

        if self.reverse_play {
            self.tick_reverse(delta_time, time_scale, tweens);
        } else {
            self.tick_forward(delta_time, time_scale, tweens);
        }
    }

    fn tick_forward(&mut self, delta_time: f32, time_scale: f32, tweens: &mut TweenArena) {
        self.time = (self.time + frame_step(delta_time, time_scale)).clamp(0.0, self.duration);

        let mut passed = 0.0;
        for bucket in self.buckets.values() {
            if self.time < passed {
                break;
            }
            tick_bucket(bucket, delta_time, time_scale, tweens);
            passed += bucket.duration;
        }

        if self.time >= self.duration {
            self.stop();
        }
    }

    fn tick_reverse(&mut self, delta_time: f32, time_scale: f32, tweens: &mut TweenArena) {
        let reverse_duration = self.reverse_duration();
        self.reverse_time =
            (self.reverse_time + frame_step(delta_time, time_scale)).clamp(0.0, reverse_duration);
        self.time = (self.reverse_time * self.reverse_scale).min(self.duration);

        let child_delta = delta_time * self.reverse_scale;
        let mut passed = 0.0;
        for bucket in self.buckets.values().rev() {
            if self.time < passed {
                break;
            }
            tick_bucket(bucket, child_delta, time_scale, tweens);
            passed += bucket.duration;
        }

        if self.reverse_time >= reverse_duration {
            self.stop();
        }
    }

    /// Scrub to `time` without changing any play state.
    ///
    /// Each bucket's members receive the time left once earlier buckets have
    /// consumed theirs; buckets not reached yet receive 0. In reverse mode
    /// `time` is reverse time and is scaled to its forward equivalent.
    pub fn seek_to(&mut self, time: f32, tweens: &TweenArena) {
        let time = time.max(0.0);
        if self.reverse_play {
            self.reverse_time = time.min(self.reverse_duration());
            self.time = (self.reverse_time * self.reverse_scale).min(self.duration);
        } else {
            self.time = time.min(self.duration);
        }

        let ordered: SmallVec<[&Bucket; 8]> = if self.reverse_play {
            self.buckets.values().rev().collect()
        } else {
            self.buckets.values().collect()
        };

        let mut left = self.time;
        for bucket in ordered {
            for id in &bucket.members {
                if let Some(tween) = tweens.get(*id) {
                    tween.notify_update(left);
                }
            }
            left = (left - bucket.duration).max(0.0);
        }
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{EventLog, EventSink, Tween, TweenEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        tweens: TweenArena,
        logs: Vec<Rc<RefCell<EventLog>>>,
        ids: Vec<TweenId>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tweens: TweenArena::with_key(),
                logs: Vec::new(),
                ids: Vec::new(),
            }
        }

        fn tween(&mut self, duration: f32, index: Option<u32>) -> TweenId {
            let log = EventLog::shared();
            let sink: EventSink = log.clone();
            let mut tween = Tween::new(duration, 1).with_events(&sink);
            tween.index = index;
            let id = self.tweens.insert(tween);
            self.logs.push(log);
            self.ids.push(id);
            id
        }
    }

    /// Two tweens at index 0 (1.0s and 2.0s) and one at index 1 (1.0s)
    fn three_member_sequence() -> (Sequence, Fixture) {
        let mut fx = Fixture::new();
        let mut seq = Sequence::new();
        let a = fx.tween(1.0, Some(0));
        let b = fx.tween(2.0, Some(0));
        let c = fx.tween(1.0, Some(1));
        for id in [a, b, c] {
            assert!(seq.add_child(id, &mut fx.tweens));
        }
        (seq, fx)
    }

    #[test]
    fn test_allocate_indices_packs_densely() {
        let indices = allocate_indices([0, 2], &[None, Some(5), None, None]);
        assert_eq!(indices, vec![1, 5, 3, 4]);
    }

    #[test]
    fn test_duration_sums_bucket_maxima() {
        let (seq, _fx) = three_member_sequence();
        assert_eq!(seq.duration(), 3.0);
        assert_eq!(seq.bucket_duration(0), Some(2.0));
        assert_eq!(seq.bucket_offset(1), Some(2.0));
        assert_eq!(seq.indices().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_auto_index_avoids_siblings() {
        let mut fx = Fixture::new();
        let mut seq = Sequence::new();
        let a = fx.tween(1.0, Some(0));
        let b = fx.tween(1.0, None);
        let c = fx.tween(1.0, None);
        seq.add_child(a, &mut fx.tweens);
        seq.add_child(b, &mut fx.tweens);
        seq.add_child(c, &mut fx.tweens);

        assert_eq!(fx.tweens[b].index, Some(1));
        assert_eq!(fx.tweens[c].index, Some(2));
        assert_eq!(seq.duration(), 3.0);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let mut fx = Fixture::new();
        let mut seq = Sequence::new();
        let a = fx.tween(1.0, Some(0));
        assert!(seq.add_child(a, &mut fx.tweens));
        assert!(!seq.add_child(a, &mut fx.tweens));
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_forward_buckets_start_in_order() {
        let (mut seq, mut fx) = three_member_sequence();
        let c = fx.ids[2];
        seq.play(&mut fx.tweens);

        for _ in 0..3 {
            seq.tick(0.5, 1.0, &mut fx.tweens);
            assert_eq!(fx.tweens[c].state(), TweenState::Ready);
        }

        // time reaches 2.0: bucket 1 starts
        seq.tick(0.5, 1.0, &mut fx.tweens);
        assert!(fx.tweens[c].is_run());
        assert_eq!(fx.logs[2].borrow().count(TweenEvent::Start), 1);

        seq.tick(0.5, 1.0, &mut fx.tweens);
        seq.tick(0.5, 1.0, &mut fx.tweens);
        assert!(seq.is_stop());
        assert_eq!(seq.time(), 3.0);
    }

    #[test]
    fn test_bucket_members_play_together() {
        let (mut seq, mut fx) = three_member_sequence();
        seq.play(&mut fx.tweens);
        seq.tick(0.5, 1.0, &mut fx.tweens);

        assert!(fx.tweens[fx.ids[0]].is_run());
        assert!(fx.tweens[fx.ids[1]].is_run());
        assert_eq!(fx.tweens[fx.ids[0]].time(), 0.5);
        assert_eq!(fx.tweens[fx.ids[1]].time(), 0.5);
    }

    #[test]
    fn test_reverse_scale_compresses_playback() {
        let (mut seq, mut fx) = three_member_sequence();
        seq.set_reverse(true, 1.5);
        assert_eq!(seq.reverse_scale(), 2.0);

        seq.play(&mut fx.tweens);
        seq.tick(0.25, 1.0, &mut fx.tweens);

        // Highest index plays first
        assert!(fx.tweens[fx.ids[2]].is_run());
        assert_eq!(fx.tweens[fx.ids[0]].state(), TweenState::Ready);
        assert_eq!(seq.time(), 0.5);

        for _ in 0..5 {
            seq.tick(0.25, 1.0, &mut fx.tweens);
        }
        assert!(seq.is_stop());
        assert_eq!(seq.reverse_time(), 1.5);
        assert_eq!(seq.time(), 3.0);
        assert!(fx.tweens[fx.ids[0]].is_run() || fx.tweens[fx.ids[0]].is_stop());
    }

    #[test]
    fn test_reverse_without_duration_matches_forward() {
        let (mut seq, _fx) = three_member_sequence();
        seq.set_reverse(true, 0.0);
        assert_eq!(seq.reverse_scale(), 1.0);
        assert_eq!(seq.reverse_duration(), 3.0);
    }

    #[test]
    fn test_remove_refreshes_duration() {
        let (mut seq, fx) = three_member_sequence();
        assert!(seq.remove_child(fx.ids[1], &fx.tweens));
        assert_eq!(seq.duration(), 2.0);

        assert!(seq.remove_child(fx.ids[2], &fx.tweens));
        assert_eq!(seq.duration(), 1.0);
        assert_eq!(seq.indices().collect::<Vec<_>>(), vec![0]);

        assert!(!seq.remove_child(fx.ids[2], &fx.tweens));
    }

    #[test]
    fn test_replay_resets_members() {
        let (mut seq, mut fx) = three_member_sequence();
        seq.play(&mut fx.tweens);
        for _ in 0..6 {
            seq.tick(0.5, 1.0, &mut fx.tweens);
        }
        assert!(seq.is_stop());

        seq.play(&mut fx.tweens);
        assert!(seq.is_run());
        assert_eq!(fx.tweens[fx.ids[2]].state(), TweenState::Ready);
        seq.tick(0.5, 1.0, &mut fx.tweens);
        assert!(fx.tweens[fx.ids[0]].is_run());
    }

    #[test]
    fn test_pause_freezes_sequence() {
        let (mut seq, mut fx) = three_member_sequence();
        seq.play(&mut fx.tweens);
        seq.tick(0.5, 1.0, &mut fx.tweens);
        seq.pause();
        seq.tick(0.5, 1.0, &mut fx.tweens);
        assert_eq!(seq.time(), 0.5);
        seq.resume();
        seq.tick(0.5, 1.0, &mut fx.tweens);
        assert_eq!(seq.time(), 1.0);
    }

    #[test]
    fn test_seek_pushes_time_left_per_bucket() {
        let (mut seq, fx) = three_member_sequence();
        seq.seek_to(2.5, &fx.tweens);

        assert_eq!(fx.logs[0].borrow().last_update(), Some(2.5));
        assert_eq!(fx.logs[1].borrow().last_update(), Some(2.5));
        assert_eq!(fx.logs[2].borrow().last_update(), Some(0.5));
        assert_eq!(seq.state(), TweenState::Ready);

        seq.seek_to(1.0, &fx.tweens);
        assert_eq!(fx.logs[2].borrow().last_update(), Some(0.0));
    }

    #[test]
    fn test_reverse_seek_scales_and_walks_backward() {
        let (mut seq, fx) = three_member_sequence();
        seq.set_reverse(true, 1.5);

        seq.seek_to(0.5, &fx.tweens);
        assert_eq!(seq.reverse_time(), 0.5);
        assert_eq!(seq.time(), 1.0);
        let last: Vec<_> = fx.logs.iter().map(|l| l.borrow().last_update()).collect();
        assert_eq!(last, vec![Some(0.0), Some(0.0), Some(1.0)]);

        seq.seek_to(1.25, &fx.tweens);
        let last: Vec<_> = fx.logs.iter().map(|l| l.borrow().last_update()).collect();
        assert_eq!(last, vec![Some(1.5), Some(1.5), Some(2.5)]);
        assert_eq!(seq.state(), TweenState::Ready);
    }

    #[test]
    fn test_non_finite_delta_leaves_sequence_time() {
        let (mut seq, mut fx) = three_member_sequence();
        seq.play(&mut fx.tweens);
        seq.tick(f32::NAN, 1.0, &mut fx.tweens);
        assert_eq!(seq.time(), 0.0);
        assert!(seq.is_run());

        seq.set_reverse(true, 1.5);
        seq.tick(1.0, f32::INFINITY, &mut fx.tweens);
        assert_eq!(seq.reverse_time(), 0.0);
        assert!(seq.is_run());
    }

    #[test]
    fn test_missing_member_is_skipped() {
        let (mut seq, mut fx) = three_member_sequence();
        fx.tweens.remove(fx.ids[1]);
        seq.refresh_duration(&fx.tweens);
        assert_eq!(seq.duration(), 2.0);

        seq.play(&mut fx.tweens);
        seq.tick(0.5, 1.0, &mut fx.tweens);
        assert!(fx.tweens[fx.ids[0]].is_run());
    }
}
