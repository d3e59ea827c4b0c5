//! Game Logic Module
//!
//! All battle simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `input`: Input bits, local input sources, recording and replay
//! - `state`: Sides, round states, environment state
//! - `fighter`: Fighter contract, fighter state, hitboxes
//! - `basic_fighter`: Reference fighter with a small action table
//! - `collision`: Push resolution and hit resolution
//! - `battle`: Round state machine and frame pipeline
//! - `snapshot`: Save/restore of a whole battle
//! - `bot`: Seeded scripted opponents
//! - `events`: Battle events returned from each tick

pub mod input;
pub mod state;
pub mod fighter;
pub mod basic_fighter;
pub mod collision;
pub mod battle;
pub mod snapshot;
pub mod bot;
pub mod events;

// Re-export key types
pub use input::{InputBits, InputSample, InputHistory, InputRecorder, InputSource};
pub use state::{EnvironmentState, RoundState, Side};
pub use fighter::{Fighter, FighterState, DamageResult};
pub use basic_fighter::BasicFighter;
pub use battle::{Battle, BattleConfig, FrameDriver, LocalDriver, TickResult};
pub use snapshot::BattleSnapshot;
pub use events::{BattleEvent, BattleEventData};
