//! Fixed-Point 2D Vector
//!
//! Fighter positions and velocities. All operations use fixed-point
//! arithmetic; floats only appear when converting for the wire.

use std::fmt;
use serde::{Serialize, Deserialize};

use super::fixed::{Fixed, to_float, from_float};

/// 2D vector with fixed-point components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FixedVec2 {
    /// X component (Q16.16 fixed-point)
    pub x: Fixed,
    /// Y component (Q16.16 fixed-point)
    pub y: Fixed,
}

impl FixedVec2 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new vector from fixed-point components.
    #[inline]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Convert to floats for display and the wire.
    #[inline]
    pub fn to_floats(self) -> (f64, f64) {
        (to_float(self.x), to_float(self.y))
    }

    /// Build from wire floats.
    #[inline]
    pub fn from_floats(x: f64, y: f64) -> Self {
        Self::new(from_float(x), from_float(y))
    }
}

impl fmt::Debug for FixedVec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.to_floats();
        write!(f, "Vec2({:.4}, {:.4})", x, y)
    }
}

// Serialized as `[x, y]` floats, matching the snapshot wire format.
impl Serialize for FixedVec2 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (x, y) = self.to_floats();
        [x, y].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FixedVec2 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y] = <[f64; 2]>::deserialize(deserializer)?;
        Ok(Self::from_floats(x, y))
    }
}
