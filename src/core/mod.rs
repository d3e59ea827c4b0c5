//! Core deterministic primitives.
//!
//! All types in this module are designed for cross-platform determinism.
//! They form the foundation for bit-exact replay and snapshot restore.

pub mod fixed;
pub mod vec2;
pub mod rect;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use vec2::FixedVec2;
pub use rect::FixedRect;
pub use rng::DeterministicRng;
pub use hash::{StateHash, StateHasher};
