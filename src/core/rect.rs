//! Axis-Aligned Fixed-Point Rectangles
//!
//! Hitboxes, hurtboxes and pushboxes. `x`/`y` is the minimum corner.

use serde::{Serialize, Deserialize};

use super::fixed::{Fixed, fixed_max, fixed_min, to_float, from_float};
use super::vec2::FixedVec2;

/// Axis-aligned rectangle in Q16.16.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RectRepr", into = "RectRepr")]
pub struct FixedRect {
    /// Minimum x
    pub x: Fixed,
    /// Minimum y
    pub y: Fixed,
    /// Width (non-negative)
    pub width: Fixed,
    /// Height (non-negative)
    pub height: Fixed,
}

impl FixedRect {
    /// Create from minimum corner and size.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed, width: Fixed, height: Fixed) -> Self {
        Self { x, y, width, height }
    }

    /// Create from its x and y extents.
    #[inline]
    pub fn from_extents(x_min: Fixed, x_max: Fixed, y_min: Fixed, y_max: Fixed) -> Self {
        Self::new(x_min, y_min, x_max.wrapping_sub(x_min), y_max.wrapping_sub(y_min))
    }

    /// Left edge.
    #[inline]
    pub fn x_min(&self) -> Fixed {
        self.x
    }

    /// Right edge.
    #[inline]
    pub fn x_max(&self) -> Fixed {
        self.x.wrapping_add(self.width)
    }

    /// Bottom edge.
    #[inline]
    pub fn y_min(&self) -> Fixed {
        self.y
    }

    /// Top edge.
    #[inline]
    pub fn y_max(&self) -> Fixed {
        self.y.wrapping_add(self.height)
    }

    /// Strict overlap test: rectangles that merely touch do not overlap.
    #[inline]
    pub fn overlaps(&self, other: &FixedRect) -> bool {
        other.x_max() > self.x_min()
            && other.x_min() < self.x_max()
            && other.y_max() > self.y_min()
            && other.y_min() < self.y_max()
    }

    /// Center of the region shared by both rectangles.
    ///
    /// Computed from the intersection extents on each axis, so it does not
    /// depend on which rectangle is passed first. Only meaningful when the
    /// rectangles overlap.
    pub fn intersection_center(&self, other: &FixedRect) -> FixedVec2 {
        let x1 = fixed_min(self.x_max(), other.x_max());
        let x2 = fixed_max(self.x_min(), other.x_min());
        let y1 = fixed_min(self.y_max(), other.y_max());
        let y2 = fixed_max(self.y_min(), other.y_min());
        FixedVec2::new(
            ((x1 as i64 + x2 as i64) / 2) as Fixed,
            ((y1 as i64 + y2 as i64) / 2) as Fixed,
        )
    }

    /// Translate along x.
    #[inline]
    pub fn shifted_x(&self, dx: Fixed) -> Self {
        Self { x: self.x.wrapping_add(dx), ..*self }
    }
}

/// Wire form: `{x, y, width, height}` floats.
#[derive(Clone, Copy, Serialize, Deserialize)]
struct RectRepr {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl From<RectRepr> for FixedRect {
    fn from(r: RectRepr) -> Self {
        Self::new(from_float(r.x), from_float(r.y), from_float(r.width), from_float(r.height))
    }
}

impl From<FixedRect> for RectRepr {
    fn from(r: FixedRect) -> Self {
        Self {
            x: to_float(r.x),
            y: to_float(r.y),
            width: to_float(r.width),
            height: to_float(r.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    fn rect(x0: f64, x1: f64, y0: f64, y1: f64) -> FixedRect {
        FixedRect::from_extents(to_fixed(x0), to_fixed(x1), to_fixed(y0), to_fixed(y1))
    }

    #[test]
    fn test_overlap_is_strict() {
        let a = rect(0.0, 1.0, 0.0, 1.0);
        assert!(a.overlaps(&rect(0.5, 1.5, 0.5, 1.5)));
        assert!(!a.overlaps(&rect(1.0, 2.0, 0.0, 1.0)));
        assert!(!a.overlaps(&rect(0.0, 1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_intersection_center_is_order_independent() {
        let hit = rect(0.0, 2.0, 0.0, 1.0);
        let hurt = rect(1.0, 3.0, 0.5, 2.0);
        let c = hit.intersection_center(&hurt);
        assert_eq!(c, FixedVec2::new(to_fixed(1.5), to_fixed(0.75)));
        assert_eq!(c, hurt.intersection_center(&hit));
    }

    #[test]
    fn test_rect_json_fields() {
        let r = rect(4.0, 5.0, -1.0, 1.0);
        let json = serde_json::to_value(r).unwrap();
        assert_eq!(json["x"], 4.0);
        assert_eq!(json["width"], 1.0);
        assert_eq!(json["height"], 2.0);
        let back: FixedRect = serde_json::from_value(json).unwrap();
        assert_eq!(back, r);
    }
}
