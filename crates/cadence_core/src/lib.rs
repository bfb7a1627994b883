//! Cadence Core
//!
//! Leaf primitives for the Cadence tween scheduler:
//!
//! - **Tweens**: timed, loopable, pausable counters with a small state machine
//! - **Event Sinks**: the seven-callback contract a tween invokes on its owner
//! - **Geometry**: anchored-rect types used by grid layout
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{EventLog, EventSink, Tween, TweenEvent};
//!
//! let log = EventLog::shared();
//! let sink: EventSink = log.clone();
//!
//! let mut tween = Tween::new(1.0, 1).with_events(&sink);
//! tween.play();
//! tween.tick(1.0, 1.0);
//!
//! assert!(tween.is_stop());
//! assert_eq!(log.borrow().count(TweenEvent::Stop), 1);
//! ```

pub mod events;
pub mod geometry;
pub mod tween;

pub use events::{dispatch, EventLog, EventSink, TweenEvent, TweenEvents, WeakEventSink};
pub use geometry::{LayoutRect, Size, Vec2};
pub use tween::{frame_step, Tween, TweenArena, TweenId, TweenState, INFINITE_LOOPS};
