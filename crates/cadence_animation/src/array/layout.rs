//! Grid layout math for array animations
//!
//! Members occupy slots of a conceptual grid. The fill order decides how a
//! member's (possibly shuffled) ordinal maps to a slot, and the per-axis
//! directions decide which container edge the grid grows from:
//!
//! ```text
//! row_layout = Increase       row_layout = Decrease
//! col_layout = Increase       col_layout = Increase
//! ┌───────────┐               ┌───────────┐
//! │ 0  1  2   │               │   2  1  0 │
//! │ 3  4  5   │               │   5  4  3 │
//! └───────────┘               └───────────┘
//! ```

use cadence_core::{LayoutRect, Size, Vec2};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// Direction an axis grows in
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutDirection {
    /// Axis is not laid out
    None,
    /// From the container's min edge
    #[default]
    Increase,
    /// From the container's max edge
    Decrease,
}

impl LayoutDirection {
    /// Pick Increase or Decrease uniformly
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            LayoutDirection::Increase
        } else {
            LayoutDirection::Decrease
        }
    }
}

/// How member ordinals map onto grid slots
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillOrder {
    /// Fill each row before the next
    #[default]
    RowFirst,
    /// Fill each column before the next
    ColFirst,
    /// Row-major grid with members assigned to slots at random
    Random,
}

/// A grid cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridSlot {
    pub row: usize,
    pub col: usize,
}

impl GridSlot {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Build the member → grid-ordinal permutation.
///
/// Identity unless `fill` is [`FillOrder::Random`], which applies a
/// Fisher–Yates shuffle drawn from `rng`.
pub fn index_permutation<R: Rng + ?Sized>(count: usize, fill: FillOrder, rng: &mut R) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..count).collect();
    if fill == FillOrder::Random {
        indices.shuffle(rng);
    }
    indices
}

/// Grid shape and directions for one array build
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub fill: FillOrder,
    pub row_layout: LayoutDirection,
    pub col_layout: LayoutDirection,
    pub columns: usize,
    pub rows: usize,
    pub count: usize,
}

impl GridLayout {
    /// Reject grids whose fill order walks an empty axis
    pub fn validate(&self) -> Result<()> {
        match self.fill {
            FillOrder::RowFirst | FillOrder::Random if self.columns == 0 => {
                Err(CadenceError::EmptyGridAxis { axis: "column" })
            }
            FillOrder::ColFirst if self.rows == 0 => Err(CadenceError::EmptyGridAxis { axis: "row" }),
            _ => Ok(()),
        }
    }

    /// Slot of a grid ordinal (an entry of the permutation)
    pub fn slot(&self, ordinal: usize) -> GridSlot {
        match self.fill {
            FillOrder::RowFirst | FillOrder::Random => {
                let columns = self.columns.max(1);
                GridSlot::new(ordinal / columns, ordinal % columns)
            }
            FillOrder::ColFirst => {
                let rows = self.rows.max(1);
                GridSlot::new(ordinal % rows, ordinal / rows)
            }
        }
    }

    /// Occupied extents as `(rows, columns)`.
    ///
    /// The walked axis is ceil(count / fixed axis); the fixed axis keeps its
    /// configured size, or 0 for an empty grid.
    pub fn extents(&self) -> (usize, usize) {
        match self.fill {
            FillOrder::RowFirst | FillOrder::Random => {
                let rows = self.count.div_ceil(self.columns.max(1));
                let columns = if rows > 0 { self.columns } else { 0 };
                (rows, columns)
            }
            FillOrder::ColFirst => {
                let columns = self.count.div_ceil(self.rows.max(1));
                let rows = if columns > 0 { self.rows } else { 0 };
                (rows, columns)
            }
        }
    }

    /// Spacing that makes edge-packed members exactly span the container.
    ///
    /// An axis with fewer than two members gets zero spacing.
    pub fn solve_spacing(&self, container: Size, member: Size) -> Vec2 {
        let (rows, columns) = self.extents();
        let solve = |span: f32, extent: f32, count: usize| {
            if count > 1 {
                (span - extent * count as f32) / (count - 1) as f32
            } else {
                0.0
            }
        };
        Vec2::new(
            solve(container.width, member.width, columns),
            solve(container.height, member.height, rows),
        )
    }

    /// Anchored position of a slot inside the container.
    ///
    /// `row_layout` drives x through the column, `col_layout` drives y
    /// through the row. The result is relative to the member's min anchor.
    pub fn position(
        &self,
        slot: GridSlot,
        container: Size,
        member_size: Size,
        member: &LayoutRect,
        spacing: Vec2,
    ) -> Vec2 {
        let x = axis_position(
            self.row_layout,
            slot.col as f32,
            container.width,
            member_size.width,
            member.pivot.x,
            spacing.x,
        );
        let y = axis_position(
            self.col_layout,
            slot.row as f32,
            container.height,
            member_size.height,
            member.pivot.y,
            spacing.y,
        );

        Vec2::new(
            x - container.width * member.anchor_min.x,
            y - container.height * member.anchor_min.y,
        )
    }
}

fn axis_position(
    direction: LayoutDirection,
    index: f32,
    container: f32,
    extent: f32,
    pivot: f32,
    spacing: f32,
) -> f32 {
    match direction {
        LayoutDirection::None => 0.0,
        LayoutDirection::Increase => (index + pivot) * extent + index * spacing,
        LayoutDirection::Decrease => container - (index + 1.0 - pivot) * extent - index * spacing,
    }
}
