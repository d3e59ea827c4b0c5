//! Fighter Contract
//!
//! The battle drives fighters only through the [`Fighter`] trait. The
//! per-fighter move list, animation and box data live behind it; the
//! battle owns the frame order, push physics and hit resolution.
//!
//! [`FighterState`] is the serializable deep copy of everything a fighter
//! mutates, so a snapshot restores it bit-for-bit.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::rect::FixedRect;
use crate::core::vec2::FixedVec2;
use crate::game::input::InputSample;

/// Action ids shared by every fighter and reported on the wire.
pub mod action {
    /// Idle
    pub const STAND: i32 = 0;
    /// Walk toward the opponent
    pub const FORWARD: i32 = 1;
    /// Walk away from the opponent
    pub const BACKWARD: i32 = 2;
    /// Neutral attack
    pub const N_ATTACK: i32 = 100;
    /// Hit reaction
    pub const DAMAGE: i32 = 200;
    /// Blocking a hit
    pub const GUARD_STAND: i32 = 305;
    /// Guard meter broken
    pub const GUARD_BREAK: i32 = 310;
    /// Holding back inside an attack's proximity range
    pub const GUARD_PROXIMITY: i32 = 350;
    /// Knocked out
    pub const DEAD: i32 = 500;
    /// Round won
    pub const WIN: i32 = 510;
}

// =============================================================================
// DAMAGE
// =============================================================================

/// Outcome of a hit landing on a defender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DamageResult {
    /// Nothing happened
    #[default]
    None,
    /// Clean hit, vital health lost
    Damage,
    /// Blocked, guard health lost
    Guard,
    /// Blocked, but the guard meter ran out
    GuardBreak,
}

/// Properties of one attack id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct AttackData {
    /// Attack id the hitboxes carry
    pub attack_id: i32,
    /// Vital damage on a clean hit
    pub vital_damage: i32,
    /// Guard damage when blocked
    pub guard_damage: i32,
    /// Hitstun frames on a clean hit
    pub hit_stun_on_hit: i32,
    /// Hitstun frames when blocked
    pub hit_stun_on_guard: i32,
    /// Hitstun frames on a guard break
    pub guard_break_stun: i32,
}

impl AttackData {
    /// Hitstun frames for a given damage outcome.
    pub fn hit_stun_for(&self, result: DamageResult) -> i32 {
        match result {
            DamageResult::None => 0,
            DamageResult::Damage => self.hit_stun_on_hit,
            DamageResult::Guard => self.hit_stun_on_guard,
            DamageResult::GuardBreak => self.guard_break_stun,
        }
    }
}

// =============================================================================
// BOXES
// =============================================================================

/// An attack box. Proximity boxes never hit; they only warn the defender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hitbox {
    /// World-space rectangle
    pub rect: FixedRect,
    /// Proximity-guard trigger instead of a real hit
    pub proximity: bool,
    /// Attack this box belongs to
    #[serde(rename = "attackID")]
    pub attack_id: i32,
}

impl Hitbox {
    /// Check overlap with a hurtbox.
    #[inline]
    pub fn overlaps(&self, hurtbox: &FixedRect) -> bool {
        self.rect.overlaps(hurtbox)
    }
}

// =============================================================================
// FIGHTER STATE
// =============================================================================

/// Deep copy of one fighter's mutable state.
///
/// Field names follow the snapshot wire format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterState {
    /// Feet position
    pub position: FixedVec2,
    /// Horizontal speed applied this frame
    #[serde(rename = "velocity_x", with = "crate::core::fixed::as_float")]
    pub velocity_x: Fixed,
    /// Facing direction
    pub is_face_right: bool,

    /// Active attack boxes
    pub hitboxes: Vec<Hitbox>,
    /// Vulnerable boxes
    pub hurtboxes: Vec<FixedRect>,
    /// Body box used for pushing
    pub pushbox: FixedRect,

    /// Remaining vital health; 0 is dead
    pub vital_health: i32,
    /// Remaining guard health
    pub guard_health: i32,

    /// Current action
    #[serde(rename = "currentActionID")]
    pub current_action_id: i32,
    /// Frames spent in the current action
    pub current_action_frame: i32,
    /// Hits landed by the current action
    pub current_action_hit_count: i32,

    /// Hitstun frames remaining
    pub current_hit_stun_frame: i32,

    /// Held buttons, newest first
    pub input: Vec<i32>,
    /// Press edges, newest first
    pub input_down: Vec<i32>,
    /// Release edges, newest first
    pub input_up: Vec<i32>,

    /// Holding away from the opponent
    pub is_input_backward: bool,
    /// Inside an opponent's proximity box this frame
    pub is_reserve_proximity_guard: bool,

    /// Action to start once the current one allows it
    #[serde(rename = "bufferActionID")]
    pub buffer_action_id: i32,
    /// Reaction queued by the last hit
    #[serde(rename = "reserveDamageActionID")]
    pub reserve_damage_action_id: i32,

    /// Sprite shake offset sign
    pub sprite_shake_position: i32,
    /// Shake length set by the last hit
    pub max_sprite_shake_frame: i32,

    /// Won the round
    pub has_won: bool,
}

impl FighterState {
    /// Feed every field into a state hasher, in declaration order.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_vec2(self.position);
        hasher.update_fixed(self.velocity_x);
        hasher.update_bool(self.is_face_right);

        hasher.update_u32(self.hitboxes.len() as u32);
        for hitbox in &self.hitboxes {
            hasher.update_rect(&hitbox.rect);
            hasher.update_bool(hitbox.proximity);
            hasher.update_i32(hitbox.attack_id);
        }
        hasher.update_u32(self.hurtboxes.len() as u32);
        for hurtbox in &self.hurtboxes {
            hasher.update_rect(hurtbox);
        }
        hasher.update_rect(&self.pushbox);

        hasher.update_i32(self.vital_health);
        hasher.update_i32(self.guard_health);
        hasher.update_i32(self.current_action_id);
        hasher.update_i32(self.current_action_frame);
        hasher.update_i32(self.current_action_hit_count);
        hasher.update_i32(self.current_hit_stun_frame);

        hasher.update_i32_slice(&self.input);
        hasher.update_i32_slice(&self.input_down);
        hasher.update_i32_slice(&self.input_up);

        hasher.update_bool(self.is_input_backward);
        hasher.update_bool(self.is_reserve_proximity_guard);
        hasher.update_i32(self.buffer_action_id);
        hasher.update_i32(self.reserve_damage_action_id);
        hasher.update_i32(self.sprite_shake_position);
        hasher.update_i32(self.max_sprite_shake_frame);
        hasher.update_bool(self.has_won);
    }
}

// =============================================================================
// FIGHTER TRAIT
// =============================================================================

/// Everything the battle needs from a fighter.
///
/// Called once per frame in pipeline order: `update_input`,
/// `increment_action_frame`, `update_action_request` (or
/// `update_intro_action`), `update_movement`, `update_boxes`. Push and
/// hit resolution then use the box accessors and the notify methods.
pub trait Fighter {
    /// Reset for a new round at `position`.
    fn setup_battle_start(&mut self, position: FixedVec2, face_right: bool);

    /// Push this frame's sample into the edge detector.
    fn update_input(&mut self, sample: &InputSample);

    /// Forget all buffered input.
    fn clear_input(&mut self);

    /// Advance the current action by one frame.
    fn increment_action_frame(&mut self);

    /// Resolve the next action from input and reservations.
    fn update_action_request(&mut self);

    /// Intro-only action resolution (no attacks).
    fn update_intro_action(&mut self);

    /// Integrate velocity into position.
    fn update_movement(&mut self);

    /// Recompute world-space boxes for the current action frame.
    fn update_boxes(&mut self);

    fn hitboxes(&self) -> &[Hitbox];
    fn hurtboxes(&self) -> &[FixedRect];
    fn pushbox(&self) -> FixedRect;
    fn position(&self) -> FixedVec2;

    /// Shift along x (push resolution).
    fn apply_position_change(&mut self, dx: Fixed);

    /// False once `attack_id` has connected during the current action.
    fn can_attack_hit(&self, attack_id: i32) -> bool;

    fn attack_data(&self, attack_id: i32) -> AttackData;

    /// This fighter's attack connected at `point`.
    fn notify_attack_hit(&mut self, point: FixedVec2);

    /// This fighter was hit. Returns what happened.
    fn notify_damaged(&mut self, attack: &AttackData, point: FixedVec2) -> DamageResult;

    /// Hitstun both fighters take after one of this fighter's attacks resolves.
    fn hit_stun_frame(&self, result: DamageResult, attack_id: i32) -> i32;

    fn set_hit_stun(&mut self, frames: i32);

    fn set_sprite_shake_frame(&mut self, frames: i32);

    /// An opponent's proximity box overlaps this fighter.
    fn notify_in_proximity_guard_range(&mut self);

    fn save_state(&self) -> FighterState;

    fn load_state(&mut self, state: &FighterState);

    /// Switch to the win action once the current one allows it.
    fn request_win_action(&mut self);

    fn vital_health(&self) -> i32;
    fn guard_health(&self) -> i32;
    fn current_action_id(&self) -> i32;
    fn current_action_frame(&self) -> i32;
    fn current_action_frame_count(&self) -> i32;
    fn current_hit_stun_frame(&self) -> i32;

    fn is_dead(&self) -> bool {
        self.vital_health() <= 0
    }

    /// Whether the current action can be interrupted on any frame.
    fn is_always_cancelable(&self) -> bool;

    /// Frames until the current action ends (0 when always cancelable).
    fn action_frames_left(&self) -> i32 {
        if self.is_always_cancelable() {
            0
        } else {
            self.current_action_frame_count().saturating_sub(self.current_action_frame())
        }
    }
}
