//! # FOOTSIES Training Server
//!
//! Deterministic 1v1 footsies battle simulation with a TCP protocol that
//! lets external agents drive or observe it frame by frame.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  FOOTSIES TRAINING SERVER                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rect.rs     - Axis-aligned boxes                        │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Battle logic (deterministic)              │
//! │  ├── input.rs    - Input bits, recording and replay          │
//! │  ├── fighter.rs  - Fighter contract and state                │
//! │  ├── collision.rs- Push and hit resolution                   │
//! │  ├── battle.rs   - Round state machine, frame pipeline       │
//! │  ├── snapshot.rs - Save/restore                              │
//! │  └── bot.rs      - Scripted opponents                        │
//! │                                                              │
//! │  network/        - Training channels (non-deterministic)     │
//! │  ├── protocol.rs - Framing, actions, control commands        │
//! │  ├── actor.rs    - Actor contract, human and bot actors      │
//! │  ├── remote.rs   - Remote agent actor                        │
//! │  ├── training.rs - Training coordinator                      │
//! │  └── server.rs   - Fixed-step server loop                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in battle logic
//! - No system time dependencies (the battle clock counts frames)
//! - All randomness from seeded Xorshift128+
//!
//! Given identical inputs and bot seed, the simulation produces
//! **identical results** on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::battle::{Battle, BattleConfig};
pub use game::input::InputBits;
pub use game::state::{EnvironmentState, RoundState, Side};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
