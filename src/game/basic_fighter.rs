//! Reference Fighter
//!
//! A small fixed move set: stand, walk forward/backward, one normal
//! attack with a proximity box, guard (stand, proximity, break), damage,
//! dead and win. Box geometry is relative to the fighter's feet and
//! mirrored by facing.

use crate::core::fixed::Fixed;
use crate::core::rect::FixedRect;
use crate::core::vec2::FixedVec2;
use crate::game::fighter::{
    action, AttackData, DamageResult, Fighter, FighterState, Hitbox,
};
use crate::game::input::{InputBits, InputSample};

// =============================================================================
// CONSTANTS (integer literals, Q16.16)
// =============================================================================

/// Vital health at round start. One clean hit is a knockout.
pub const VITAL_HEALTH_MAX: i32 = 1;

/// Guard health at round start.
pub const GUARD_HEALTH_MAX: i32 = 3;

/// Length of the held/pressed/released input rings.
pub const INPUT_RECORD_FRAMES: usize = 180;

/// Frames an attack press stays buffered.
pub const ATTACK_BUFFER_FRAMES: usize = 5;

/// Attack id of the neutral attack's boxes.
pub const NORMAL_ATTACK_ID: i32 = 1;

const NO_ACTION: i32 = -1;

/// Pushbox half width: 0.375
const PUSHBOX_HALF_WIDTH: Fixed = 24576;
/// Pushbox height: 1.5
const PUSHBOX_HEIGHT: Fixed = 98304;
/// Hurtbox half width: 0.4375
const HURTBOX_HALF_WIDTH: Fixed = 28672;
/// Lower/upper hurtbox split: 0.75
const HURTBOX_SPLIT: Fixed = 49152;
/// Hurtbox top: 1.625
const HURTBOX_TOP: Fixed = 106496;

/// Walk forward speed per frame: 0.0625
const FORWARD_SPEED: Fixed = 4096;
/// Walk backward speed per frame: 0.046875
const BACKWARD_SPEED: Fixed = 3072;

/// Neutral attack hitbox: 0.25..1.25 in front, 0.5..1.125 high
const ATTACK_NEAR: Fixed = 16384;
const ATTACK_FAR: Fixed = 81920;
const ATTACK_BOTTOM: Fixed = 32768;
const ATTACK_TOP: Fixed = 73728;
/// Proximity box reaches 2.5 in front
const PROXIMITY_FAR: Fixed = 163840;

const ATTACK_ACTIVE_START: i32 = 5;
const ATTACK_ACTIVE_END: i32 = 7;
const ATTACK_PROXIMITY_END: i32 = 9;

const NORMAL_ATTACK: AttackData = AttackData {
    attack_id: NORMAL_ATTACK_ID,
    vital_damage: 1,
    guard_damage: 1,
    hit_stun_on_hit: 8,
    hit_stun_on_guard: 6,
    guard_break_stun: 12,
};

// =============================================================================
// ACTION TABLE
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct ActionDef {
    id: i32,
    frame_count: i32,
    looping: bool,
    always_cancelable: bool,
    /// Signed speed toward the opponent
    speed: Fixed,
}

static ACTIONS: [ActionDef; 10] = [
    ActionDef { id: action::STAND, frame_count: 60, looping: true, always_cancelable: true, speed: 0 },
    ActionDef { id: action::FORWARD, frame_count: 60, looping: true, always_cancelable: true, speed: FORWARD_SPEED },
    ActionDef { id: action::BACKWARD, frame_count: 60, looping: true, always_cancelable: true, speed: -BACKWARD_SPEED },
    ActionDef { id: action::N_ATTACK, frame_count: 22, looping: false, always_cancelable: false, speed: 0 },
    ActionDef { id: action::DAMAGE, frame_count: 18, looping: false, always_cancelable: false, speed: 0 },
    ActionDef { id: action::GUARD_STAND, frame_count: 12, looping: false, always_cancelable: false, speed: 0 },
    ActionDef { id: action::GUARD_BREAK, frame_count: 30, looping: false, always_cancelable: false, speed: 0 },
    ActionDef { id: action::GUARD_PROXIMITY, frame_count: 60, looping: true, always_cancelable: true, speed: 0 },
    ActionDef { id: action::DEAD, frame_count: 60, looping: true, always_cancelable: false, speed: 0 },
    ActionDef { id: action::WIN, frame_count: 60, looping: true, always_cancelable: false, speed: 0 },
];

fn action_def(id: i32) -> &'static ActionDef {
    ACTIONS.iter().find(|a| a.id == id).unwrap_or(&ACTIONS[0])
}

// =============================================================================
// BASIC FIGHTER
// =============================================================================

/// Reference [`Fighter`] implementation.
#[derive(Clone, Debug)]
pub struct BasicFighter {
    state: FighterState,
}

impl Default for BasicFighter {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicFighter {
    /// Create a fighter standing at the origin facing right.
    pub fn new() -> Self {
        let mut fighter = Self {
            state: FighterState {
                position: FixedVec2::ZERO,
                velocity_x: 0,
                is_face_right: true,
                hitboxes: Vec::with_capacity(2),
                hurtboxes: Vec::with_capacity(2),
                pushbox: FixedRect::default(),
                vital_health: VITAL_HEALTH_MAX,
                guard_health: GUARD_HEALTH_MAX,
                current_action_id: action::STAND,
                current_action_frame: 0,
                current_action_hit_count: 0,
                current_hit_stun_frame: 0,
                input: vec![0; INPUT_RECORD_FRAMES],
                input_down: vec![0; INPUT_RECORD_FRAMES],
                input_up: vec![0; INPUT_RECORD_FRAMES],
                is_input_backward: false,
                is_reserve_proximity_guard: false,
                buffer_action_id: NO_ACTION,
                reserve_damage_action_id: NO_ACTION,
                sprite_shake_position: 0,
                max_sprite_shake_frame: 0,
                has_won: false,
            },
        };
        fighter.update_boxes();
        fighter
    }

    /// Current state, read-only.
    pub fn state(&self) -> &FighterState {
        &self.state
    }

    fn forward_bits(&self) -> InputBits {
        if self.state.is_face_right { InputBits::RIGHT } else { InputBits::LEFT }
    }

    fn backward_bits(&self) -> InputBits {
        if self.state.is_face_right { InputBits::LEFT } else { InputBits::RIGHT }
    }

    fn held(&self) -> InputBits {
        InputBits::from_bits(self.state.input[0] as u8)
    }

    fn is_holding_forward(&self) -> bool {
        let held = self.held();
        held.contains(self.forward_bits()) && !held.contains(self.backward_bits())
    }

    fn attack_recently_pressed(&self) -> bool {
        self.state
            .input_down
            .iter()
            .take(ATTACK_BUFFER_FRAMES)
            .any(|bits| InputBits::from_bits(*bits as u8).contains(InputBits::ATTACK))
    }

    fn change_action(&mut self, id: i32) {
        self.state.current_action_id = id;
        self.state.current_action_frame = 0;
        self.state.current_action_hit_count = 0;
    }

    /// Rectangle `near..far` in front of the fighter.
    fn facing_rect(&self, near: Fixed, far: Fixed, bottom: Fixed, top: Fixed) -> FixedRect {
        let FixedVec2 { x, y } = self.state.position;
        if self.state.is_face_right {
            FixedRect::from_extents(
                x.wrapping_add(near),
                x.wrapping_add(far),
                y.wrapping_add(bottom),
                y.wrapping_add(top),
            )
        } else {
            FixedRect::from_extents(
                x.wrapping_sub(far),
                x.wrapping_sub(near),
                y.wrapping_add(bottom),
                y.wrapping_add(top),
            )
        }
    }
}

impl Fighter for BasicFighter {
    fn setup_battle_start(&mut self, position: FixedVec2, face_right: bool) {
        let s = &mut self.state;
        s.position = position;
        s.velocity_x = 0;
        s.is_face_right = face_right;
        s.vital_health = VITAL_HEALTH_MAX;
        s.guard_health = GUARD_HEALTH_MAX;
        s.current_hit_stun_frame = 0;
        s.is_input_backward = false;
        s.is_reserve_proximity_guard = false;
        s.buffer_action_id = NO_ACTION;
        s.reserve_damage_action_id = NO_ACTION;
        s.sprite_shake_position = 0;
        s.max_sprite_shake_frame = 0;
        s.has_won = false;
        self.clear_input();
        self.change_action(action::STAND);
        self.update_boxes();
    }

    fn update_input(&mut self, sample: &InputSample) {
        let bits = sample.input.bits() as i32;
        let (forward, backward) = (self.forward_bits(), self.backward_bits());
        let s = &mut self.state;
        let previous = s.input[0];

        s.input.rotate_right(1);
        s.input_down.rotate_right(1);
        s.input_up.rotate_right(1);
        s.input[0] = bits;
        s.input_down[0] = bits & !previous;
        s.input_up[0] = !bits & previous;

        let held = InputBits::from_bits(bits as u8);
        s.is_input_backward = held.contains(backward) && !held.contains(forward);
    }

    fn clear_input(&mut self) {
        let s = &mut self.state;
        s.input.iter_mut().for_each(|v| *v = 0);
        s.input_down.iter_mut().for_each(|v| *v = 0);
        s.input_up.iter_mut().for_each(|v| *v = 0);
        s.is_input_backward = false;
    }

    fn increment_action_frame(&mut self) {
        let s = &mut self.state;
        if s.current_hit_stun_frame > 0 {
            s.current_hit_stun_frame -= 1;
            if s.max_sprite_shake_frame > 0 && s.current_hit_stun_frame > 0 {
                s.sprite_shake_position = if s.sprite_shake_position > 0 { -1 } else { 1 };
            } else {
                s.sprite_shake_position = 0;
                s.max_sprite_shake_frame = 0;
            }
            return;
        }

        s.current_action_frame = s.current_action_frame.saturating_add(1);
        let def = action_def(s.current_action_id);
        if def.looping && s.current_action_frame >= def.frame_count {
            s.current_action_frame = 0;
        }
    }

    fn update_action_request(&mut self) {
        let in_proximity = std::mem::take(&mut self.state.is_reserve_proximity_guard);

        let reserved = std::mem::replace(&mut self.state.reserve_damage_action_id, NO_ACTION);
        if reserved != NO_ACTION {
            self.change_action(reserved);
            return;
        }

        if self.state.current_hit_stun_frame > 0 {
            return;
        }

        let current = self.state.current_action_id;
        if current == action::DEAD || current == action::WIN {
            return;
        }

        let def = action_def(current);
        let finished = !def.looping && self.state.current_action_frame >= def.frame_count;
        if finished && current == action::GUARD_BREAK {
            self.state.guard_health = GUARD_HEALTH_MAX;
        }

        self.state.buffer_action_id = if self.attack_recently_pressed() {
            action::N_ATTACK
        } else {
            NO_ACTION
        };

        if !(def.always_cancelable || finished) {
            return;
        }

        if self.state.has_won {
            self.change_action(action::WIN);
            return;
        }

        if self.state.buffer_action_id != NO_ACTION {
            let buffered = std::mem::replace(&mut self.state.buffer_action_id, NO_ACTION);
            self.change_action(buffered);
            return;
        }

        let next = if in_proximity && self.state.is_input_backward {
            action::GUARD_PROXIMITY
        } else if self.is_holding_forward() {
            action::FORWARD
        } else if self.state.is_input_backward {
            action::BACKWARD
        } else {
            action::STAND
        };

        if next != current || finished {
            self.change_action(next);
        }
    }

    fn update_intro_action(&mut self) {
        self.state.is_reserve_proximity_guard = false;
        if self.state.current_action_id != action::STAND {
            self.change_action(action::STAND);
        }
    }

    fn update_movement(&mut self) {
        let s = &mut self.state;
        s.velocity_x = if s.current_hit_stun_frame > 0 {
            0
        } else {
            let speed = action_def(s.current_action_id).speed;
            if s.is_face_right { speed } else { -speed }
        };
        s.position.x = s.position.x.wrapping_add(s.velocity_x);
    }

    fn update_boxes(&mut self) {
        let FixedVec2 { x, y } = self.state.position;

        self.state.pushbox = FixedRect::from_extents(
            x.wrapping_sub(PUSHBOX_HALF_WIDTH),
            x.wrapping_add(PUSHBOX_HALF_WIDTH),
            y,
            y.wrapping_add(PUSHBOX_HEIGHT),
        );

        let hurt_min = x.wrapping_sub(HURTBOX_HALF_WIDTH);
        let hurt_max = x.wrapping_add(HURTBOX_HALF_WIDTH);
        let split = y.wrapping_add(HURTBOX_SPLIT);
        self.state.hurtboxes.clear();
        self.state.hurtboxes.push(FixedRect::from_extents(hurt_min, hurt_max, y, split));
        self.state.hurtboxes.push(FixedRect::from_extents(
            hurt_min,
            hurt_max,
            split,
            y.wrapping_add(HURTBOX_TOP),
        ));

        let mut hitboxes = std::mem::take(&mut self.state.hitboxes);
        hitboxes.clear();
        if self.state.current_action_id == action::N_ATTACK {
            let frame = self.state.current_action_frame;
            if (ATTACK_ACTIVE_START..=ATTACK_ACTIVE_END).contains(&frame) {
                hitboxes.push(Hitbox {
                    rect: self.facing_rect(ATTACK_NEAR, ATTACK_FAR, ATTACK_BOTTOM, ATTACK_TOP),
                    proximity: false,
                    attack_id: NORMAL_ATTACK_ID,
                });
            }
            if frame <= ATTACK_PROXIMITY_END {
                hitboxes.push(Hitbox {
                    rect: self.facing_rect(ATTACK_NEAR, PROXIMITY_FAR, 0, PUSHBOX_HEIGHT),
                    proximity: true,
                    attack_id: NORMAL_ATTACK_ID,
                });
            }
        }
        self.state.hitboxes = hitboxes;
    }

    fn hitboxes(&self) -> &[Hitbox] {
        &self.state.hitboxes
    }

    fn hurtboxes(&self) -> &[FixedRect] {
        &self.state.hurtboxes
    }

    fn pushbox(&self) -> FixedRect {
        self.state.pushbox
    }

    fn position(&self) -> FixedVec2 {
        self.state.position
    }

    fn apply_position_change(&mut self, dx: Fixed) {
        self.state.position.x = self.state.position.x.wrapping_add(dx);
        self.state.pushbox = self.state.pushbox.shifted_x(dx);
    }

    // One attack id per action, each connecting at most once.
    fn can_attack_hit(&self, _attack_id: i32) -> bool {
        self.state.current_action_hit_count == 0
    }

    fn attack_data(&self, attack_id: i32) -> AttackData {
        if attack_id == NORMAL_ATTACK_ID {
            NORMAL_ATTACK
        } else {
            AttackData { attack_id, ..AttackData::default() }
        }
    }

    fn notify_attack_hit(&mut self, _point: FixedVec2) {
        self.state.current_action_hit_count = self.state.current_action_hit_count.saturating_add(1);
    }

    fn notify_damaged(&mut self, attack: &AttackData, _point: FixedVec2) -> DamageResult {
        let s = &mut self.state;
        let current = action_def(s.current_action_id);
        let guarding = s.current_action_id == action::GUARD_STAND
            || s.current_action_id == action::GUARD_PROXIMITY
            || (s.is_input_backward && current.always_cancelable);

        if guarding {
            s.guard_health = s.guard_health.saturating_sub(attack.guard_damage);
            if s.guard_health <= 0 {
                s.guard_health = 0;
                s.reserve_damage_action_id = action::GUARD_BREAK;
                DamageResult::GuardBreak
            } else {
                s.reserve_damage_action_id = action::GUARD_STAND;
                DamageResult::Guard
            }
        } else {
            s.vital_health = s.vital_health.saturating_sub(attack.vital_damage).max(0);
            s.reserve_damage_action_id = if s.vital_health == 0 { action::DEAD } else { action::DAMAGE };
            DamageResult::Damage
        }
    }

    fn hit_stun_frame(&self, result: DamageResult, attack_id: i32) -> i32 {
        self.attack_data(attack_id).hit_stun_for(result)
    }

    fn set_hit_stun(&mut self, frames: i32) {
        self.state.current_hit_stun_frame = frames;
    }

    fn set_sprite_shake_frame(&mut self, frames: i32) {
        self.state.max_sprite_shake_frame = frames;
    }

    fn notify_in_proximity_guard_range(&mut self) {
        self.state.is_reserve_proximity_guard = true;
    }

    fn save_state(&self) -> FighterState {
        self.state.clone()
    }

    fn load_state(&mut self, state: &FighterState) {
        self.state.clone_from(state);
        for ring in [
            &mut self.state.input,
            &mut self.state.input_down,
            &mut self.state.input_up,
        ] {
            ring.resize(INPUT_RECORD_FRAMES, 0);
        }
    }

    fn request_win_action(&mut self) {
        self.state.has_won = true;
    }

    fn vital_health(&self) -> i32 {
        self.state.vital_health
    }

    fn guard_health(&self) -> i32 {
        self.state.guard_health
    }

    fn current_action_id(&self) -> i32 {
        self.state.current_action_id
    }

    fn current_action_frame(&self) -> i32 {
        self.state.current_action_frame
    }

    fn current_action_frame_count(&self) -> i32 {
        action_def(self.state.current_action_id).frame_count
    }

    fn current_hit_stun_frame(&self) -> i32 {
        self.state.current_hit_stun_frame
    }

    fn is_always_cancelable(&self) -> bool {
        action_def(self.state.current_action_id).always_cancelable
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{to_fixed, P1_START_X};

    fn press(fighter: &mut BasicFighter, bits: InputBits) {
        fighter.update_input(&InputSample::new(bits, 0.0));
    }

    /// One frame of the action part of the pipeline.
    fn frame(fighter: &mut BasicFighter, bits: InputBits) {
        press(fighter, bits);
        fighter.increment_action_frame();
        fighter.update_action_request();
        fighter.update_movement();
        fighter.update_boxes();
    }

    fn started() -> BasicFighter {
        let mut f = BasicFighter::new();
        f.setup_battle_start(FixedVec2::new(P1_START_X, 0), true);
        f
    }

    #[test]
    fn test_setup_battle_start() {
        let f = started();
        assert_eq!(f.position().x, P1_START_X);
        assert_eq!(f.vital_health(), VITAL_HEALTH_MAX);
        assert_eq!(f.guard_health(), GUARD_HEALTH_MAX);
        assert_eq!(f.current_action_id(), action::STAND);
        assert_eq!(f.hurtboxes().len(), 2);
        assert!(f.hitboxes().is_empty());
        assert_eq!(f.pushbox().x_min(), P1_START_X - PUSHBOX_HALF_WIDTH);
    }

    #[test]
    fn test_edge_detection() {
        let mut f = started();
        press(&mut f, InputBits::ATTACK);
        assert_eq!(f.state().input_down[0], 4);
        press(&mut f, InputBits::ATTACK);
        assert_eq!(f.state().input_down[0], 0);
        press(&mut f, InputBits::NONE);
        assert_eq!(f.state().input_up[0], 4);
    }

    #[test]
    fn test_walk_forward_and_back() {
        let mut f = started();
        frame(&mut f, InputBits::RIGHT);
        assert_eq!(f.current_action_id(), action::FORWARD);
        assert_eq!(f.position().x, P1_START_X + FORWARD_SPEED);

        frame(&mut f, InputBits::LEFT);
        assert_eq!(f.current_action_id(), action::BACKWARD);
        assert!(f.state().is_input_backward);
        assert_eq!(f.position().x, P1_START_X + FORWARD_SPEED - BACKWARD_SPEED);
    }

    #[test]
    fn test_facing_left_mirrors_input() {
        let mut f = BasicFighter::new();
        f.setup_battle_start(FixedVec2::new(to_fixed(2.0), 0), false);
        frame(&mut f, InputBits::LEFT);
        assert_eq!(f.current_action_id(), action::FORWARD);
        assert!(f.position().x < to_fixed(2.0));
    }

    #[test]
    fn test_attack_boxes_follow_frames() {
        let mut f = started();
        frame(&mut f, InputBits::ATTACK);
        assert_eq!(f.current_action_id(), action::N_ATTACK);
        assert!(!f.is_always_cancelable());
        assert_eq!(f.hitboxes().len(), 1);
        assert!(f.hitboxes()[0].proximity);

        for _ in 0..ATTACK_ACTIVE_START {
            frame(&mut f, InputBits::NONE);
        }
        assert_eq!(f.current_action_frame(), ATTACK_ACTIVE_START);
        assert_eq!(f.hitboxes().len(), 2);
        assert!(!f.hitboxes()[0].proximity);
        assert!(f.hitboxes()[0].rect.x_min() > f.position().x);

        for _ in 0..30 {
            frame(&mut f, InputBits::NONE);
        }
        assert_eq!(f.current_action_id(), action::STAND);
        assert!(f.hitboxes().is_empty());
    }

    #[test]
    fn test_attack_hits_once_per_action() {
        let mut f = started();
        frame(&mut f, InputBits::ATTACK);
        assert!(f.can_attack_hit(NORMAL_ATTACK_ID));
        f.notify_attack_hit(FixedVec2::ZERO);
        assert!(!f.can_attack_hit(NORMAL_ATTACK_ID));
    }

    #[test]
    fn test_clean_hit_kills() {
        let mut f = started();
        let result = f.notify_damaged(&NORMAL_ATTACK, FixedVec2::ZERO);
        assert_eq!(result, DamageResult::Damage);
        assert!(f.is_dead());
        f.update_action_request();
        assert_eq!(f.current_action_id(), action::DEAD);
    }

    #[test]
    fn test_guard_then_break() {
        let mut f = started();
        press(&mut f, InputBits::LEFT);
        for _ in 0..GUARD_HEALTH_MAX - 1 {
            assert_eq!(f.notify_damaged(&NORMAL_ATTACK, FixedVec2::ZERO), DamageResult::Guard);
        }
        assert_eq!(f.notify_damaged(&NORMAL_ATTACK, FixedVec2::ZERO), DamageResult::GuardBreak);
        assert_eq!(f.guard_health(), 0);
        assert!(!f.is_dead());

        f.update_action_request();
        assert_eq!(f.current_action_id(), action::GUARD_BREAK);
        for _ in 0..40 {
            frame(&mut f, InputBits::NONE);
        }
        assert_eq!(f.guard_health(), GUARD_HEALTH_MAX);
    }

    #[test]
    fn test_proximity_guard() {
        let mut f = started();
        press(&mut f, InputBits::LEFT);
        f.notify_in_proximity_guard_range();
        f.increment_action_frame();
        f.update_action_request();
        assert_eq!(f.current_action_id(), action::GUARD_PROXIMITY);
        assert!(f.is_always_cancelable());
    }

    #[test]
    fn test_hitstun_freezes() {
        let mut f = started();
        frame(&mut f, InputBits::ATTACK);
        f.set_hit_stun(3);
        f.set_sprite_shake_frame(1);
        let frame_before = f.current_action_frame();
        let x_before = f.position().x;
        frame(&mut f, InputBits::RIGHT);
        assert_eq!(f.current_action_frame(), frame_before);
        assert_eq!(f.position().x, x_before);
        assert_eq!(f.current_hit_stun_frame(), 2);
    }

    #[test]
    fn test_win_action_waits_for_cancel() {
        let mut f = started();
        frame(&mut f, InputBits::ATTACK);
        f.request_win_action();
        frame(&mut f, InputBits::NONE);
        assert_eq!(f.current_action_id(), action::N_ATTACK);
        for _ in 0..30 {
            frame(&mut f, InputBits::NONE);
        }
        assert_eq!(f.current_action_id(), action::WIN);
    }

    #[test]
    fn test_frames_left() {
        let mut f = started();
        assert_eq!(f.action_frames_left(), 0);
        frame(&mut f, InputBits::ATTACK);
        assert_eq!(f.action_frames_left(), 22);
        frame(&mut f, InputBits::NONE);
        assert_eq!(f.action_frames_left(), 21);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut f = started();
        frame(&mut f, InputBits::RIGHT);
        frame(&mut f, InputBits::ATTACK);
        let saved = f.save_state();

        let json = serde_json::to_string(&saved).unwrap();
        let restored: FighterState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, saved);

        let mut other = BasicFighter::new();
        other.load_state(&restored);
        assert_eq!(other.save_state(), saved);
    }

    #[test]
    fn test_extreme_loaded_state_does_not_overflow() {
        let mut f = started();
        frame(&mut f, InputBits::ATTACK);
        let mut state = f.save_state();
        state.position = FixedVec2::new(i32::MAX - 10, i32::MAX - 10);
        state.current_action_frame = i32::MAX;
        state.current_action_hit_count = i32::MAX;
        state.guard_health = i32::MIN;
        f.load_state(&state);

        for bits in [InputBits::ATTACK, InputBits::LEFT, InputBits::NONE] {
            frame(&mut f, bits);
        }
        f.notify_attack_hit(FixedVec2::ZERO);
        f.notify_damaged(&NORMAL_ATTACK, FixedVec2::ZERO);
        let _ = f.action_frames_left();

        f.setup_battle_start(FixedVec2::new(P1_START_X, 0), true);
        f.update_boxes();
        assert_eq!(f.pushbox().x_min(), P1_START_X - PUSHBOX_HALF_WIDTH);
    }
}
