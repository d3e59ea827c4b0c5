//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the battle simulation.
//! All gameplay arithmetic uses integers only; floats appear solely at the
//! wire boundary (state messages and snapshots).
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 units                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every Q16.16 value is exactly representable as an `f64`, so a value
//! that leaves the simulation through [`to_float`] and comes back through
//! [`from_float`] is restored bit-for-bit. Snapshot restore relies on this.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

// =============================================================================
// STAGE CONSTANTS (All as integer literals - NO float conversion!)
// =============================================================================

/// Battle area width: 10.0 = 10 * 65536
pub const STAGE_WIDTH: Fixed = 655360;

/// Battle area half width: 5.0 = 5 * 65536
pub const STAGE_HALF_WIDTH: Fixed = STAGE_WIDTH / 2;

/// Player 1 spawn x: -2.0
pub const P1_START_X: Fixed = -131072;

/// Player 2 spawn x: +2.0
pub const P2_START_X: Fixed = 131072;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in the frame pipeline.
///
/// # Example
/// ```
/// use footsies::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for the wire.
///
/// Exact: every `i32 / 65536` fits in an f64 mantissa.
#[inline]
pub fn to_float(f: Fixed) -> f64 {
    f as f64 / FIXED_ONE as f64
}

/// Convert a wire float back to fixed-point, rounding to the nearest step.
///
/// Inverse of [`to_float`] for every value [`to_float`] produces.
/// Non-finite input maps to 0.
#[inline]
pub fn from_float(f: f64) -> Fixed {
    if !f.is_finite() {
        return 0;
    }
    let scaled = (f * FIXED_ONE as f64).round();
    scaled.clamp(i32::MIN as f64, i32::MAX as f64) as Fixed
}

/// Half of a fixed-point value, truncating toward zero.
///
/// `fixed_half(x)` and `-fixed_half(x)` always sum to zero, which is what
/// the push resolver needs for displacement to be conserved.
#[inline]
pub fn fixed_half(x: Fixed) -> Fixed {
    x / 2
}

/// Minimum of two fixed-point numbers.
#[inline]
pub fn fixed_min(a: Fixed, b: Fixed) -> Fixed {
    if a < b { a } else { b }
}

/// Maximum of two fixed-point numbers.
#[inline]
pub fn fixed_max(a: Fixed, b: Fixed) -> Fixed {
    if a > b { a } else { b }
}

/// Serde adapter writing a [`Fixed`] as a plain float.
///
/// Use with `#[serde(with = "crate::core::fixed::as_float")]`.
pub mod as_float {
    use serde::{Deserialize, Deserializer, Serializer};
    use super::{Fixed, to_float, from_float};

    /// Serialize as f64.
    pub fn serialize<S: Serializer>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(to_float(*value))
    }

    /// Deserialize from f64.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Fixed, D::Error> {
        f64::deserialize(deserializer).map(from_float)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_constants() {
        assert_eq!(FIXED_ONE, 65536);
        assert_eq!(FIXED_HALF, 32768);
        assert_eq!(STAGE_WIDTH, to_fixed(10.0));
        assert_eq!(STAGE_HALF_WIDTH, to_fixed(5.0));
        assert_eq!(P1_START_X, -P2_START_X);
    }

    #[test]
    fn test_float_roundtrip_is_exact() {
        for raw in [0, 1, -1, 7, FIXED_HALF, -FIXED_ONE * 5 + 3, i32::MAX, i32::MIN] {
            assert_eq!(from_float(to_float(raw)), raw);
        }
        assert_eq!(from_float(f64::NAN), 0);
        assert_eq!(from_float(4.5), to_fixed(4.5));
    }

    #[test]
    fn test_half_is_symmetric() {
        for x in [0, 1, -1, 3, -3, 32769, -65537] {
            assert_eq!(fixed_half(x) + fixed_half(-x), 0);
        }
    }
}
