//! Battle State Definitions
//!
//! Sides, round states and the per-frame environment state sent to actors.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// SIDE
// =============================================================================

/// One of the two fighters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Player 1, starts on the left facing right
    P1 = 0,
    /// Player 2, starts on the right facing left
    P2 = 1,
}

impl Side {
    /// Both sides in processing order.
    pub const BOTH: [Side; 2] = [Side::P1, Side::P2];

    /// Index into per-side arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The other side.
    #[inline]
    pub const fn opponent(self) -> Side {
        match self {
            Side::P1 => Side::P2,
            Side::P2 => Side::P1,
        }
    }

    /// Side from array index.
    pub const fn from_index(index: usize) -> Option<Side> {
        match index {
            0 => Some(Side::P1),
            1 => Some(Side::P2),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::P1 => write!(f, "p1"),
            Side::P2 => write!(f, "p2"),
        }
    }
}

// =============================================================================
// ROUND STATE
// =============================================================================

/// Round state machine phase.
///
/// `Stop -> Intro -> Fight -> KO -> End -> Stop`. Fight only moves to KO
/// when a fighter dies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoundState {
    /// Between rounds; re-enters Intro on the next frame
    #[default]
    Stop,
    /// Fighters placed, countdown running, no hits
    Intro,
    /// Live round, gated on the training coordinator
    Fight,
    /// A fighter died; frozen until the timer runs out
    KO,
    /// Winner declared; skippable after a delay
    End,
}

impl RoundState {
    /// Whether hit resolution runs in this state.
    pub fn resolves_hits(self) -> bool {
        matches!(self, RoundState::Fight)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoundState::Stop => "Stop",
            RoundState::Intro => "Intro",
            RoundState::Fight => "Fight",
            RoundState::KO => "KO",
            RoundState::End => "End",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ENVIRONMENT STATE
// =============================================================================

/// Externally visible facts about one frame.
///
/// Built fresh after each pipeline pass; every actor gets its own copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentState {
    /// P1 vital health
    pub p1_vital: i32,
    /// P2 vital health
    pub p2_vital: i32,
    /// P1 guard health
    pub p1_guard: i32,
    /// P2 guard health
    pub p2_guard: i32,
    /// P1 action id
    pub p1_move: i32,
    /// P1 frame within its action
    pub p1_move_frame: i32,
    /// P2 action id
    pub p2_move: i32,
    /// P2 frame within its action
    pub p2_move_frame: i32,
    /// P1 x position
    pub p1_position: f64,
    /// P2 x position
    pub p2_position: f64,
    /// Fight frame counter (-1 before the first Fight frame)
    pub global_frame: i32,
    /// Input bits recorded last (0 before the first recorded frame)
    pub p1_most_recent_action: i32,
    /// Same for p2
    pub p2_most_recent_action: i32,
    /// P1 hitstun frames remaining
    pub p1_hitstun: i32,
    /// P2 hitstun frames remaining
    pub p2_hitstun: i32,
}

impl Default for EnvironmentState {
    fn default() -> Self {
        Self {
            p1_vital: 0,
            p2_vital: 0,
            p1_guard: 0,
            p2_guard: 0,
            p1_move: 0,
            p1_move_frame: 0,
            p2_move: 0,
            p2_move_frame: 0,
            p1_position: 0.0,
            p2_position: 0.0,
            global_frame: -1,
            p1_most_recent_action: 0,
            p2_most_recent_action: 0,
            p1_hitstun: 0,
            p2_hitstun: 0,
        }
    }
}

impl EnvironmentState {
    /// Position of `side`, in stage units.
    pub fn position(&self, side: Side) -> f64 {
        match side {
            Side::P1 => self.p1_position,
            Side::P2 => self.p2_position,
        }
    }

    /// Current action id of `side`.
    pub fn move_id(&self, side: Side) -> i32 {
        match side {
            Side::P1 => self.p1_move,
            Side::P2 => self.p2_move,
        }
    }

    /// Horizontal distance between the fighters.
    pub fn distance(&self) -> f64 {
        (self.p2_position - self.p1_position).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_helpers() {
        assert_eq!(Side::P1.opponent(), Side::P2);
        assert_eq!(Side::P2.index(), 1);
        assert_eq!(Side::from_index(0), Some(Side::P1));
        assert_eq!(Side::from_index(2), None);
        assert_eq!(Side::P2.to_string(), "p2");
    }

    #[test]
    fn test_environment_state_fields() {
        let state = EnvironmentState {
            global_frame: 120,
            p1_position: -2.0,
            p1_most_recent_action: 5,
            ..EnvironmentState::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        let object = json.as_object().unwrap();

        for field in [
            "p1Vital", "p2Vital", "p1Guard", "p2Guard", "p1Move", "p1MoveFrame",
            "p2Move", "p2MoveFrame", "p1Position", "p2Position", "globalFrame",
            "p1MostRecentAction", "p2MostRecentAction", "p1Hitstun", "p2Hitstun",
        ] {
            assert!(object.contains_key(field), "missing {}", field);
        }
        assert_eq!(object.len(), 15);
        assert_eq!(json["globalFrame"], 120);
        assert_eq!(json["p1Position"], -2.0);
        assert_eq!(json["p1MostRecentAction"], 5);
    }

    #[test]
    fn test_round_state_hits() {
        assert!(RoundState::Fight.resolves_hits());
        assert!(!RoundState::Intro.resolves_hits());
        assert_eq!(RoundState::KO.to_string(), "KO");
    }
}
