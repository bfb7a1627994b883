//! Host seams for array animations
//!
//! The array engine never creates or positions visual objects itself. It
//! asks an [`ArrayHost`] for clones and drives each member through two
//! handles: the member's event sink (timing) and its [`LayoutNode`]
//! (visibility and position).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use cadence_core::{EventSink, LayoutRect, Size, TweenId, Vec2, WeakEventSink};

use crate::runner::TweenRunner;

/// A visual object the array engine can show, hide and move
pub trait LayoutNode {
    fn set_active(&mut self, active: bool);

    fn is_active(&self) -> bool;

    /// Size, pivot and anchor of the node
    fn layout_rect(&self) -> LayoutRect;

    /// Position the node's own animation comes to rest at
    fn rest_position(&self) -> Vec2;

    /// Offset applied to every position the node's animation produces
    fn shift_position(&mut self, offset: Vec2);
}

/// Strong, shared handle to a layout node
pub type SharedNode = Rc<RefCell<dyn LayoutNode>>;

/// Weak handle to a layout node
pub type WeakNode = Weak<RefCell<dyn LayoutNode>>;

/// Timing of one member's own animation
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemberTiming {
    pub delay: f32,
    pub duration: f32,
    pub loops: i32,
}

impl MemberTiming {
    pub fn new(delay: f32, duration: f32) -> Self {
        Self {
            delay,
            duration,
            loops: 1,
        }
    }

    /// Delay plus duration
    pub fn total(&self) -> f32 {
        self.delay + self.duration
    }
}

/// One member of an array animation
#[derive(Clone)]
pub struct ArrayMember {
    /// Receives the member's local time
    pub events: EventSink,
    pub node: SharedNode,
    pub timing: MemberTiming,
    /// Tween the member registered with the runner, released with the member
    pub runner_tween: Option<TweenId>,
}

impl ArrayMember {
    pub fn new(events: EventSink, node: SharedNode, timing: MemberTiming) -> Self {
        Self {
            events,
            node,
            timing,
            runner_tween: None,
        }
    }

    /// Builder: record the runner tween owned by this member
    pub fn with_runner_tween(mut self, id: TweenId) -> Self {
        self.runner_tween = Some(id);
        self
    }

    pub(crate) fn downgrade(&self) -> WeakMember {
        WeakMember {
            events: Rc::downgrade(&self.events),
            node: Rc::downgrade(&self.node),
            timing: self.timing,
        }
    }
}

impl std::fmt::Debug for ArrayMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayMember")
            .field("timing", &self.timing)
            .field("runner_tween", &self.runner_tween)
            .finish_non_exhaustive()
    }
}

/// A caller-owned member, held without keeping it alive
#[derive(Clone)]
pub(crate) struct WeakMember {
    pub events: WeakEventSink,
    pub node: WeakNode,
    pub timing: MemberTiming,
}

impl WeakMember {
    pub fn is_alive(&self) -> bool {
        self.events.strong_count() > 0 && self.node.strong_count() > 0
    }
}

/// Clone factory and container for template-clone arrays
pub trait ArrayHost {
    /// Create the clone for grid ordinal `ordinal`.
    ///
    /// Returning `None` skips the member. A clone that registers its own
    /// tween with `runner` reports it through [`ArrayMember::runner_tween`].
    fn instantiate(&mut self, ordinal: usize, runner: &mut TweenRunner) -> Option<ArrayMember>;

    /// Destroy a clone created by [`instantiate`](Self::instantiate)
    fn destroy(&mut self, member: &ArrayMember);

    /// Size of the container members are laid out in, if there is one
    fn container_size(&self) -> Option<Size>;

    /// Hide the template the clones were made from
    fn hide_template(&mut self) {}
}
