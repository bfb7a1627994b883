//! Array animations
//!
//! One animation expanded into a grid of staggered members, either by
//! cloning a template through an [`ArrayHost`] or over a caller-owned list.

mod engine;
mod host;
mod layout;

pub use engine::ArrayAnimation;
pub use host::{ArrayHost, ArrayMember, LayoutNode, MemberTiming, SharedNode, WeakNode};
pub use layout::{index_permutation, FillOrder, GridLayout, GridSlot, LayoutDirection};
