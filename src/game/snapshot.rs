//! Battle Snapshots
//!
//! Full save/restore of both fighters plus round timing. A snapshot alone
//! is enough to resume the simulation bit-for-bit; input history and the
//! replay cursor are not part of it.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::core::fixed::{to_float, Fixed, STAGE_HALF_WIDTH};
use crate::core::hash::{StateHash, StateHasher};
use crate::game::fighter::FighterState;
use crate::game::state::Side;

/// Snapshot decoding and validation errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Payload is not a snapshot.
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame count below -1 or at the counter limit.
    #[error("invalid frame count {0}")]
    InvalidFrameCount(i32),

    /// A fighter has no held-button history.
    #[error("{side} fighter has no input buffer")]
    EmptyInputBuffer {
        /// Offending fighter
        side: Side,
    },

    /// A fighter stands outside the stage.
    #[error("{side} fighter position ({x}, {y}) is outside the stage")]
    PositionOutOfBounds {
        /// Offending fighter
        side: Side,
        /// Loaded x
        x: f64,
        /// Loaded y
        y: f64,
    },

    /// A frame counter or health value is negative.
    #[error("{side} fighter has negative {field} ({value})")]
    NegativeCounter {
        /// Offending fighter
        side: Side,
        /// Wire name of the field
        field: &'static str,
        /// Loaded value
        value: i32,
    },
}

/// Both fighters' state plus round timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleSnapshot {
    /// Player 1
    pub p1_state: FighterState,
    /// Player 2
    pub p2_state: FighterState,
    /// Battle clock (seconds) when the current Fight began
    pub round_start_time: f64,
    /// Fight frames since the round began (-1 before the first)
    pub frame_count: i32,
}

impl BattleSnapshot {
    /// State of `side`.
    pub fn fighter(&self, side: Side) -> &FighterState {
        match side {
            Side::P1 => &self.p1_state,
            Side::P2 => &self.p2_state,
        }
    }

    /// Parse and validate a snapshot received on the wire.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: BattleSnapshot = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject snapshots the simulation cannot resume from.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if !(-1..i32::MAX).contains(&self.frame_count) {
            return Err(SnapshotError::InvalidFrameCount(self.frame_count));
        }
        for side in Side::BOTH {
            validate_fighter(side, self.fighter(side))?;
        }
        Ok(())
    }

    /// Deterministic hash of the snapshot.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_battle_state();
        self.p1_state.hash_into(&mut hasher);
        self.p2_state.hash_into(&mut hasher);
        hasher.update_u64(self.round_start_time.to_bits());
        hasher.update_i32(self.frame_count);
        hasher.finalize()
    }
}

fn validate_fighter(side: Side, state: &FighterState) -> Result<(), SnapshotError> {
    if state.input.is_empty() {
        return Err(SnapshotError::EmptyInputBuffer { side });
    }

    let on_stage = |v: Fixed| (-STAGE_HALF_WIDTH..=STAGE_HALF_WIDTH).contains(&v);
    let position = state.position;
    if !on_stage(position.x) || !on_stage(position.y) {
        return Err(SnapshotError::PositionOutOfBounds {
            side,
            x: to_float(position.x),
            y: to_float(position.y),
        });
    }

    let counters = [
        ("vitalHealth", state.vital_health),
        ("guardHealth", state.guard_health),
        ("currentActionFrame", state.current_action_frame),
        ("currentActionHitCount", state.current_action_hit_count),
        ("currentHitStunFrame", state.current_hit_stun_frame),
        ("maxSpriteShakeFrame", state.max_sprite_shake_frame),
    ];
    for (field, value) in counters {
        if value < 0 {
            return Err(SnapshotError::NegativeCounter { side, field, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, P1_START_X, P2_START_X};
    use crate::core::vec2::FixedVec2;
    use crate::game::basic_fighter::BasicFighter;
    use crate::game::fighter::Fighter;

    fn snapshot() -> BattleSnapshot {
        let mut f1 = BasicFighter::new();
        let mut f2 = BasicFighter::new();
        f1.setup_battle_start(FixedVec2::new(P1_START_X, 0), true);
        f2.setup_battle_start(FixedVec2::new(P2_START_X, 0), false);
        BattleSnapshot {
            p1_state: f1.save_state(),
            p2_state: f2.save_state(),
            round_start_time: 1.5,
            frame_count: 42,
        }
    }

    #[test]
    fn test_snapshot_json_fields() {
        let json = serde_json::to_value(snapshot()).unwrap();
        assert!(json.get("p1State").is_some());
        assert!(json.get("p2State").is_some());
        assert_eq!(json["roundStartTime"], 1.5);
        assert_eq!(json["frameCount"], 42);

        let p1 = &json["p1State"];
        assert_eq!(p1["position"][0], -2.0);
        assert_eq!(p1["isFaceRight"], true);
        assert_eq!(p1["currentActionID"], 0);
        assert!(p1.get("velocity_x").is_some());
        assert!(p1["pushbox"].get("width").is_some());
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_hash() {
        let mut original = snapshot();
        original.p2_state.position.x = to_fixed(1.234567);
        original.p2_state.position.x += 1;

        let json = original.to_json().unwrap();
        let restored = BattleSnapshot::from_json(&json).unwrap();
        assert_eq!(restored, original);
        assert_eq!(restored.compute_hash(), original.compute_hash());
    }

    #[test]
    fn test_hash_sees_every_fighter() {
        let a = snapshot();
        let mut b = snapshot();
        b.p2_state.guard_health -= 1;
        assert_ne!(a.compute_hash(), b.compute_hash());
    }

    #[test]
    fn test_invalid_snapshots() {
        assert!(matches!(BattleSnapshot::from_json("{"), Err(SnapshotError::Json(_))));

        let mut bad = snapshot();
        bad.frame_count = -5;
        assert!(matches!(bad.validate(), Err(SnapshotError::InvalidFrameCount(-5))));

        let mut bad = snapshot();
        bad.p2_state.input.clear();
        assert!(matches!(
            bad.validate(),
            Err(SnapshotError::EmptyInputBuffer { side: Side::P2 })
        ));
    }

    #[test]
    fn test_rejects_position_off_stage() {
        let mut json = serde_json::to_value(snapshot()).unwrap();
        json["p1State"]["position"] = serde_json::json!([32767.9, 0.0]);
        let err = BattleSnapshot::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, SnapshotError::PositionOutOfBounds { side: Side::P1, .. }));

        let mut edge = snapshot();
        edge.p2_state.position.x = STAGE_HALF_WIDTH;
        assert!(edge.validate().is_ok());
        edge.p2_state.position.x = STAGE_HALF_WIDTH + 1;
        assert!(edge.validate().is_err());
        edge.p2_state.position.x = 0;
        edge.p2_state.position.y = i32::MIN;
        assert!(edge.validate().is_err());
    }

    #[test]
    fn test_rejects_frame_count_at_limit() {
        let mut json = serde_json::to_value(snapshot()).unwrap();
        json["frameCount"] = serde_json::json!(i32::MAX);
        let err = BattleSnapshot::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidFrameCount(i32::MAX)));

        let mut start = snapshot();
        start.frame_count = -1;
        assert!(start.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_counters() {
        let mut bad = snapshot();
        bad.p1_state.current_action_frame = i32::MIN;
        assert!(matches!(
            bad.validate(),
            Err(SnapshotError::NegativeCounter { side: Side::P1, field: "currentActionFrame", .. })
        ));

        let mut bad = snapshot();
        bad.p2_state.guard_health = -1;
        assert!(matches!(
            bad.validate(),
            Err(SnapshotError::NegativeCounter { side: Side::P2, field: "guardHealth", value: -1 })
        ));
    }
}
