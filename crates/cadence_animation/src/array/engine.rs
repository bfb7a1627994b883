//! Array animation engine
//!
//! Expands one animation into a grid of staggered members. Member `i`
//! starts `i × interval` seconds into the array clock and, once started,
//! receives its own local time on every update:
//!
//! ```text
//! interval = 0.5, member duration = 1.0, count = 3
//!
//! member 0  [==========]
//! member 1       [==========]
//! member 2            [==========]
//!           0    0.5  1.0  1.5  2.0   array duration = 2.0
//! ```

use std::rc::Rc;

use cadence_core::{dispatch, LayoutRect, Size, TweenEvent, Vec2, WeakEventSink};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use super::host::{ArrayHost, ArrayMember, MemberTiming, SharedNode, WeakMember, WeakNode};
use super::layout::{index_permutation, FillOrder, GridLayout, GridSlot, LayoutDirection};
use crate::config::ArrayConfig;
use crate::error::{CadenceError, Result};
use crate::runner::TweenRunner;
use crate::timeline::TimelineCurve;

struct ArrayEntry {
    events: WeakEventSink,
    node: WeakNode,
    /// Clones made by the host; `None` for caller-owned members
    owned: Option<ArrayMember>,
    slot: GridSlot,
    start_time: f32,
}

fn node_rect(node: &SharedNode) -> Option<LayoutRect> {
    node.try_borrow().ok().map(|node| node.layout_rect())
}

/// Grid expansion state for one animation
pub struct ArrayAnimation {
    config: ArrayConfig,
    timeline: Option<Rc<dyn TimelineCurve>>,
    specified: Vec<WeakMember>,
    grid: Option<GridLayout>,
    spacing: Vec2,
    container_size: Size,
    member_size: Size,
    duration: f32,
    time: f32,
    rate: f32,
    permutation: Vec<usize>,
    entries: Vec<ArrayEntry>,
}

impl ArrayAnimation {
    pub fn new(config: ArrayConfig) -> Self {
        Self {
            config,
            timeline: None,
            specified: Vec::new(),
            grid: None,
            spacing: Vec2::ZERO,
            container_size: Size::ZERO,
            member_size: Size::ZERO,
            duration: 0.0,
            time: 0.0,
            rate: 0.0,
            permutation: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Builder: remap array progress through a timeline curve
    pub fn with_timeline(mut self, curve: Rc<dyn TimelineCurve>) -> Self {
        self.timeline = Some(curve);
        self
    }

    pub fn set_timeline(&mut self, curve: Option<Rc<dyn TimelineCurve>>) {
        self.timeline = curve;
    }

    pub fn config(&self) -> &ArrayConfig {
        &self.config
    }

    /// Settings take effect on the next build
    pub fn config_mut(&mut self) -> &mut ArrayConfig {
        &mut self.config
    }

    pub fn is_array(&self) -> bool {
        self.config.as_array
    }

    /// Use caller-owned members instead of clones (with `use_specify`).
    ///
    /// Members are held weakly; ones dropped before a build are skipped.
    pub fn set_specified(&mut self, members: &[ArrayMember]) {
        self.specified = members.iter().map(ArrayMember::downgrade).collect();
    }

    /// Caller-owned members still alive
    pub fn specified_count(&self) -> usize {
        self.specified.iter().filter(|m| m.is_alive()).count()
    }

    /// Total array clock length for a template with the given timing.
    ///
    /// Clones: `(count − 1) × interval + template`. Caller-owned members:
    /// the latest `i × interval + delay + duration` among live members.
    pub fn compute_duration(&self, template: MemberTiming) -> f32 {
        let interval = self.config.interval;
        if self.config.use_specify {
            self.specified
                .iter()
                .filter(|m| m.is_alive())
                .enumerate()
                .map(|(i, m)| i as f32 * interval + m.timing.total())
                .fold(0.0, f32::max)
        } else {
            self.config.count.saturating_sub(1) as f32 * interval + template.total()
        }
    }

    fn grid_layout(&self) -> GridLayout {
        GridLayout {
            fill: self.config.fill,
            row_layout: self.config.row_layout,
            col_layout: self.config.col_layout,
            columns: self.config.columns,
            rows: self.config.rows,
            count: self.config.count,
        }
    }

    /// Check the stagger interval and the fixed grid axis
    pub fn validate(&self) -> Result<()> {
        let interval = self.config.interval;
        if !interval.is_finite() || interval < 0.0 {
            return Err(CadenceError::InvalidInterval(interval));
        }
        self.grid_layout().validate()
    }

    fn rng(&self) -> Xoshiro256StarStar {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        Xoshiro256StarStar::seed_from_u64(seed)
    }

    /// Tear down any previous members and lay out a fresh set.
    ///
    /// Returns the number of members built. A disabled array or an empty
    /// caller-owned list builds nothing.
    pub fn build(
        &mut self,
        template: MemberTiming,
        host: &mut dyn ArrayHost,
        runner: &mut TweenRunner,
    ) -> Result<usize> {
        if !self.config.as_array {
            return Ok(0);
        }

        self.validate()?;
        let interval = self.config.interval;
        let mut grid = self.grid_layout();

        self.release(host, runner);

        let mut rng = self.rng();
        if self.config.fill == FillOrder::Random && self.config.randomize_directions {
            grid.row_layout = LayoutDirection::random(&mut rng);
            grid.col_layout = LayoutDirection::random(&mut rng);
        }

        let sources: Vec<(WeakMember, Option<ArrayMember>)> = if self.config.use_specify {
            self.specified.retain(WeakMember::is_alive);
            if self.specified.is_empty() {
                tracing::debug!("Array has no caller-owned members; nothing to build");
                return Ok(0);
            }
            self.config.count = self.specified.len();
            grid.count = self.specified.len();
            self.specified.iter().map(|m| (m.clone(), None)).collect()
        } else {
            host.hide_template();
            (0..self.config.count)
                .filter_map(|ordinal| host.instantiate(ordinal, runner))
                .map(|member| (member.downgrade(), Some(member)))
                .collect()
        };

        self.duration = self.compute_duration(template);
        self.permutation = index_permutation(grid.count, grid.fill, &mut rng);

        self.container_size = host.container_size().unwrap_or(Size::ZERO);
        self.member_size = sources
            .iter()
            .find_map(|(member, _)| member.node.upgrade().as_ref().and_then(node_rect))
            .map(|rect| rect.size)
            .unwrap_or(Size::ZERO);
        self.spacing = grid.solve_spacing(self.container_size, self.member_size);

        for (i, (member, owned)) in sources.into_iter().enumerate() {
            let slot = grid.slot(self.permutation.get(i).copied().unwrap_or(i));

            if let Some(node) = member.node.upgrade() {
                if let Ok(mut node) = node.try_borrow_mut() {
                    let rect = node.layout_rect();
                    let position =
                        grid.position(slot, self.container_size, self.member_size, &rect, self.spacing);
                    let offset = position - node.rest_position();
                    node.shift_position(offset);
                    node.set_active(true);
                }
            }

            self.entries.push(ArrayEntry {
                events: member.events,
                node: member.node,
                owned,
                slot,
                start_time: i as f32 * interval,
            });
        }

        self.grid = Some(grid);
        tracing::debug!(
            "Array built: {} members, {:?} fill, spacing ({:.1}, {:.1}), duration {:.3}s",
            self.entries.len(),
            grid.fill,
            self.spacing.x,
            self.spacing.y,
            self.duration
        );
        Ok(self.entries.len())
    }

    /// Destroy every clone and deregister its runner tween.
    ///
    /// Caller-owned members are left as they are.
    pub fn release(&mut self, host: &mut dyn ArrayHost, runner: &mut TweenRunner) {
        let released = self.entries.len();
        for entry in self.entries.drain(..) {
            if let Some(member) = entry.owned {
                if let Some(id) = member.runner_tween {
                    runner.release(id);
                }
                host.destroy(&member);
            }
        }

        self.permutation.clear();
        self.grid = None;
        self.time = 0.0;
        self.rate = 0.0;

        if released > 0 {
            tracing::debug!("Array released {} members", released);
        }
    }

    /// Release members and forget the caller-owned list and timeline
    pub fn teardown(&mut self, host: &mut dyn ArrayHost, runner: &mut TweenRunner) {
        self.release(host, runner);
        self.specified.clear();
        self.timeline = None;
    }

    /// Drive members from the array clock.
    ///
    /// Member `i` is shown once the (possibly reversed and remapped) rate
    /// reaches its start, and is then fed `time − start`.
    pub fn on_update(&mut self, time: f32, reverse: bool) {
        self.time = time;
        self.rate = if self.duration > 0.0 {
            time / self.duration
        } else {
            0.0
        };

        let mut rate = if reverse {
            (1.0 - self.rate).clamp(0.0, 1.0)
        } else {
            self.rate
        };
        if let Some(curve) = self.timeline.as_ref().filter(|c| c.covers_unit_range()) {
            rate = curve.evaluate(rate);
        }

        for entry in &self.entries {
            let Some(node) = entry.node.upgrade() else {
                continue;
            };
            if entry.events.strong_count() == 0 {
                continue;
            }

            let active = if self.duration > 0.0 {
                rate >= entry.start_time / self.duration
            } else {
                true
            };

            if let Ok(mut node) = node.try_borrow_mut() {
                node.set_active(active);
            }
            if active {
                let local = (self.time - entry.start_time).max(0.0);
                dispatch(&entry.events, TweenEvent::Update(local));
            }
        }

        tracing::trace!("Array update t={:.3} rate={:.3}", self.time, rate);
    }

    pub fn on_start(&mut self) {
        for entry in &self.entries {
            dispatch(&entry.events, TweenEvent::Start);
        }
    }

    pub fn on_stop(&mut self) {
        for entry in &self.entries {
            dispatch(&entry.events, TweenEvent::Stop);
        }
    }

    // ========== Accessors ==========

    /// Array clock length from the last build
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Raw array progress before reversal or timeline remapping
    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Grid used by the last build, with any randomized directions
    pub fn grid(&self) -> Option<&GridLayout> {
        self.grid.as_ref()
    }

    pub fn spacing(&self) -> Vec2 {
        self.spacing
    }

    pub fn container_size(&self) -> Size {
        self.container_size
    }

    pub fn member_size(&self) -> Size {
        self.member_size
    }

    /// Member ordinal → grid ordinal
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Grid slots of the members, in member order
    pub fn slots(&self) -> impl Iterator<Item = GridSlot> + '_ {
        self.entries.iter().map(|entry| entry.slot)
    }

    /// Stagger start of member `i`
    pub fn start_time(&self, i: usize) -> Option<f32> {
        self.entries.get(i).map(|entry| entry.start_time)
    }
}

impl std::fmt::Debug for ArrayAnimation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayAnimation")
            .field("config", &self.config)
            .field("members", &self.entries.len())
            .field("duration", &self.duration)
            .field("time", &self.time)
            .field("has_timeline", &self.timeline.is_some())
            .finish()
    }
}
