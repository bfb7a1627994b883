//! Timeline curves
//!
//! A timeline curve remaps the normalized progress of an array animation
//! before member gating, so the stagger sweep itself can ease in or out.
//! Curve math is deliberately small here; hosts with richer curves implement
//! [`TimelineCurve`] themselves.

use serde::{Deserialize, Serialize};

/// Maps normalized progress to normalized progress
pub trait TimelineCurve {
    fn evaluate(&self, t: f32) -> f32;

    /// Whether the curve is defined up to `t = 1`.
    ///
    /// Curves that end early are ignored and the raw progress is used.
    fn covers_unit_range(&self) -> bool {
        true
    }
}

/// Built-in easing shapes
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    /// Holds 0 until the end, then jumps to 1
    Step,
}

impl Easing {
    /// Apply the easing function to a progress value, clamped to `[0, 1]`
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t).powi(2),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (2.0 - 2.0 * t).powi(2) / 2.0
                }
            }
            Easing::EaseInCubic => t.powi(3),
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (2.0 - 2.0 * t).powi(3) / 2.0
                }
            }
            Easing::Step => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl TimelineCurve for Easing {
    fn evaluate(&self, t: f32) -> f32 {
        self.apply(t)
    }
}

/// A key of a [`KeyframeCurve`]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
    /// Easing used on the segment that ends at this key
    #[serde(default)]
    pub easing: Easing,
}

impl CurveKey {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            easing: Easing::Linear,
        }
    }

    pub fn eased(time: f32, value: f32, easing: Easing) -> Self {
        Self { time, value, easing }
    }
}

/// Piecewise curve through keys sorted by time.
///
/// Outside the key range the curve holds its first or last value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyframeCurve {
    keys: Vec<CurveKey>,
}

impl KeyframeCurve {
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Straight line from (0, 0) to (1, 1)
    pub fn linear() -> Self {
        Self::new(vec![CurveKey::new(0.0, 0.0), CurveKey::new(1.0, 1.0)])
    }

    /// Builder: add a key, keeping keys sorted
    pub fn key(mut self, key: CurveKey) -> Self {
        let at = self.keys.partition_point(|k| k.time <= key.time);
        self.keys.insert(at, key);
        self
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }
}

impl TimelineCurve for KeyframeCurve {
    fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return t;
        };
        // NaN holds at the first key
        if t.is_nan() || t <= first.time {
            return first.value;
        }
        if t >= last.time {
            return last.value;
        }

        // First key strictly after t; t > first.time guarantees at >= 1
        let at = self.keys.partition_point(|k| k.time <= t);
        let from = &self.keys[at - 1];
        let to = &self.keys[at];
        let span = to.time - from.time;
        if span <= f32::EPSILON {
            return to.value;
        }

        let local = to.easing.apply((t - from.time) / span);
        from.value + (to.value - from.value) * local
    }

    fn covers_unit_range(&self) -> bool {
        self.keys.last().is_some_and(|k| k.time >= 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::EaseInQuad,
            Easing::EaseOutQuad,
            Easing::EaseInOutQuad,
            Easing::EaseInCubic,
            Easing::EaseOutCubic,
            Easing::EaseInOutCubic,
            Easing::Step,
        ] {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert_eq!(easing.apply(1.0), 1.0, "{easing:?}");
        }
    }

    #[test]
    fn test_easing_shapes() {
        assert!(Easing::EaseInQuad.apply(0.5) < 0.5);
        assert!(Easing::EaseOutCubic.apply(0.5) > 0.5);
        assert_eq!(Easing::EaseInOutQuad.apply(0.5), 0.5);
        assert_eq!(Easing::Step.apply(0.99), 0.0);
        assert_eq!(Easing::Linear.apply(2.0), 1.0);
    }

    #[test]
    fn test_keyframe_interpolation() {
        let curve = KeyframeCurve::new(vec![
            CurveKey::new(1.0, 1.0),
            CurveKey::new(0.0, 0.0),
            CurveKey::new(0.5, 0.2),
        ]);
        assert_eq!(curve.keys()[1].time, 0.5);
        assert!((curve.evaluate(0.25) - 0.1).abs() < 1e-6);
        assert!((curve.evaluate(0.75) - 0.6).abs() < 1e-6);
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert_eq!(curve.evaluate(3.0), 1.0);
    }

    #[test]
    fn test_keyframe_segment_easing() {
        let curve = KeyframeCurve::linear().key(CurveKey::eased(1.0, 1.0, Easing::Step));
        // Duplicate key at t=1 collapses the last segment
        assert_eq!(curve.keys().len(), 3);
        assert_eq!(curve.evaluate(1.0), 1.0);
    }

    #[test]
    fn test_keyframe_nan_holds_first_key() {
        let curve = KeyframeCurve::new(vec![CurveKey::new(0.0, 0.25), CurveKey::new(1.0, 1.0)]);
        assert_eq!(curve.evaluate(f32::NAN), 0.25);
    }

    #[test]
    fn test_unit_range_coverage() {
        assert!(KeyframeCurve::linear().covers_unit_range());
        assert!(!KeyframeCurve::new(vec![CurveKey::new(0.0, 0.0), CurveKey::new(0.8, 1.0)])
            .covers_unit_range());
        assert!(!KeyframeCurve::default().covers_unit_range());
        assert!(Easing::EaseInQuad.covers_unit_range());
    }
}
