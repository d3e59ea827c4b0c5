//! Battle Events
//!
//! Events generated during simulation, returned from each tick.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::fighter::DamageResult;
use crate::game::state::{RoundState, Side};

/// Synchronous damage callback: `(defender, contact point, result)`.
///
/// Invoked once per resolved hit, during the frame it resolves.
pub type DamageHandler = Box<dyn FnMut(Side, FixedVec2, DamageResult) + Send>;

/// Battle event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BattleEventData {
    /// Round state machine moved
    RoundStateChanged {
        /// Previous state
        from: RoundState,
        /// New state
        to: RoundState,
    },

    /// An attack connected
    Hit {
        /// Side that landed the hit
        attacker: Side,
        /// Side that was hit
        defender: Side,
        /// Connecting attack
        attack_id: i32,
        /// Contact point
        point: FixedVec2,
        /// Defender's reaction
        result: DamageResult,
    },

    /// A fighter was knocked out
    KnockOut {
        /// Side knocked out
        loser: Side,
    },

    /// A round was decided
    RoundWon {
        /// Round winner
        winner: Side,
        /// Rounds won so far
        wins: u32,
    },

    /// A side reached the match target
    MatchOver {
        /// Match winner
        winner: Side,
    },

    /// Last-round input replay started
    ReplayStarted {
        /// Recorded frames to replay
        frames: u32,
    },

    /// A snapshot was loaded
    SnapshotLoaded {
        /// Loaded frame count
        frame: i32,
    },
}

/// A battle event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    /// Fight frame counter when the event occurred
    pub frame: i32,

    /// Side involved, if any
    pub side: Option<Side>,

    /// Event data
    pub data: BattleEventData,
}

impl BattleEvent {
    /// Create a new event.
    pub fn new(frame: i32, data: BattleEventData) -> Self {
        let side = match &data {
            BattleEventData::Hit { attacker, .. } => Some(*attacker),
            BattleEventData::KnockOut { loser } => Some(*loser),
            BattleEventData::RoundWon { winner, .. } => Some(*winner),
            BattleEventData::MatchOver { winner } => Some(*winner),
            _ => None,
        };

        Self { frame, side, data }
    }

    /// Create round state change event.
    pub fn round_state_changed(frame: i32, from: RoundState, to: RoundState) -> Self {
        Self::new(frame, BattleEventData::RoundStateChanged { from, to })
    }

    /// Create hit event.
    pub fn hit(
        frame: i32,
        attacker: Side,
        attack_id: i32,
        point: FixedVec2,
        result: DamageResult,
    ) -> Self {
        Self::new(
            frame,
            BattleEventData::Hit {
                attacker,
                defender: attacker.opponent(),
                attack_id,
                point,
                result,
            },
        )
    }

    /// Create knockout event.
    pub fn knock_out(frame: i32, loser: Side) -> Self {
        Self::new(frame, BattleEventData::KnockOut { loser })
    }

    /// Create round won event.
    pub fn round_won(frame: i32, winner: Side, wins: u32) -> Self {
        Self::new(frame, BattleEventData::RoundWon { winner, wins })
    }

    /// Create match over event.
    pub fn match_over(frame: i32, winner: Side) -> Self {
        Self::new(frame, BattleEventData::MatchOver { winner })
    }
}
