//! Cadence Animation System
//!
//! Frame-driven tween scheduling on top of [`cadence_core`].
//!
//! # Features
//!
//! - **Runner**: owns tweens and named sequences, advanced once per frame
//! - **Sequences**: index-bucketed tweens played back to back, forward or reversed
//! - **Array Animations**: one animation staggered across a grid of members
//! - **Animation Library**: name-indexed groups for batch playback
//!
//! # Example
//!
//! ```rust
//! use cadence_animation::{Membership, TweenRunner};
//! use cadence_core::Tween;
//!
//! let mut runner = TweenRunner::new();
//! let first = runner.insert(Tween::new(1.0, 1).with_index(0));
//! let second = runner.insert(Tween::new(2.0, 1).with_index(1));
//! runner.add(first, Membership::sequence("intro"));
//! runner.add(second, Membership::sequence("intro"));
//!
//! runner.play_sequence("intro");
//! runner.advance(1.5);
//!
//! assert_eq!(runner.sequence("intro").map(|s| s.duration()), Some(3.0));
//! assert!(runner.tween(first).is_some_and(|t| t.is_stop()));
//! ```

pub mod animation;
pub mod array;
pub mod config;
pub mod error;
pub mod library;
pub mod runner;
pub mod sequence;
pub mod timeline;

pub use animation::{AnimationHandle, AnimationTrack, SequenceSettings, TweenAnimation};
pub use array::{
    ArrayAnimation, ArrayHost, ArrayMember, FillOrder, GridLayout, GridSlot, LayoutDirection,
    LayoutNode, MemberTiming, SharedNode, WeakNode,
};
pub use config::{ArrayConfig, CadenceConfig, RunnerConfig};
pub use error::{CadenceError, Result};
pub use library::AnimationLibrary;
pub use runner::{Membership, TweenRunner};
pub use sequence::{allocate_indices, Sequence};
pub use timeline::{CurveKey, Easing, KeyframeCurve, TimelineCurve};

pub use cadence_core::{
    EventLog, EventSink, LayoutRect, Size, Tween, TweenEvent, TweenEvents, TweenId, TweenState,
    Vec2, INFINITE_LOOPS,
};
