//! Layout geometry
//!
//! Minimal 2D types shared by the array layout engine and the host
//! objects it positions. Coordinates follow an anchored-rect model: a
//! node has a size, a pivot (fraction of its own size) and an anchor
//! (fraction of its container's size).

use std::ops::{Add, Sub};

/// 2D vector
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };
    pub const HALF: Vec2 = Vec2 { x: 0.5, y: 0.5 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rect metrics a layout engine needs from a positioned node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutRect {
    /// Size of the node
    pub size: Size,
    /// Pivot as a fraction of the node's own size (0,0 = bottom-left)
    pub pivot: Vec2,
    /// Lower anchor as a fraction of the container's size
    pub anchor_min: Vec2,
}

impl LayoutRect {
    pub const fn new(size: Size) -> Self {
        Self {
            size,
            pivot: Vec2::HALF,
            anchor_min: Vec2::HALF,
        }
    }

    /// Builder: set pivot
    pub const fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    /// Builder: set lower anchor
    pub const fn with_anchor_min(mut self, anchor_min: Vec2) -> Self {
        self.anchor_min = anchor_min;
        self
    }
}

impl Default for LayoutRect {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}
