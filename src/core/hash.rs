//! State Hashing for Verification
//!
//! Deterministic hashing of battle state for:
//! - Replay validation (a replayed round must hash like the live one)
//! - Snapshot integrity checks after a remote `STATE_LOAD`

use sha2::{Sha256, Digest};
use super::fixed::Fixed;
use super::rect::FixedRect;
use super::vec2::FixedVec2;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for battle state.
///
/// Wraps SHA-256 with helpers for fixed-point types.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a battle snapshot.
    pub fn for_battle_state() -> Self {
        Self::new(b"FOOTSIES_BATTLE_STATE_V1")
    }

    /// Create hasher for an input history.
    pub fn for_input_history() -> Self {
        Self::new(b"FOOTSIES_INPUTS_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a Fixed value.
    #[inline]
    pub fn update_fixed(&mut self, value: Fixed) {
        self.update_i32(value);
    }

    /// Update with a FixedVec2.
    #[inline]
    pub fn update_vec2(&mut self, value: FixedVec2) {
        self.update_fixed(value.x);
        self.update_fixed(value.y);
    }

    /// Update with a rectangle.
    #[inline]
    pub fn update_rect(&mut self, rect: &FixedRect) {
        self.update_fixed(rect.x);
        self.update_fixed(rect.y);
        self.update_fixed(rect.width);
        self.update_fixed(rect.height);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with a length-prefixed i32 slice.
    pub fn update_i32_slice(&mut self, values: &[i32]) {
        self.update_u32(values.len() as u32);
        for v in values {
            self.update_i32(*v);
        }
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}
