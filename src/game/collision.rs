//! Collision Resolution
//!
//! Axis-aligned box collision between the two fighters:
//! - character vs character push (x only, half the overlap each)
//! - character vs stage push (minimal displacement back inside)
//! - hitbox vs hurtbox hit resolution with proximity guard

use crate::core::fixed::{Fixed, fixed_half};
use crate::core::rect::FixedRect;
use crate::core::vec2::FixedVec2;
use crate::game::fighter::{DamageResult, Fighter};
use crate::game::state::Side;

/// A resolved hit, one per attacker per frame at most.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitResolution {
    /// Side whose hitbox connected
    pub attacker: Side,
    /// Side that was hit
    pub defender: Side,
    /// Attack id of the connecting hitbox
    pub attack_id: i32,
    /// Center of the hitbox/hurtbox intersection
    pub point: FixedVec2,
    /// What the defender reported
    pub result: DamageResult,
    /// Hitstun applied to both fighters
    pub hit_stun: i32,
}

/// Mutable access to both fighters as (`side`, opponent).
fn split_pair<F>(fighters: &mut [F; 2], side: Side) -> (&mut F, &mut F) {
    let (first, second) = fighters.split_at_mut(1);
    match side {
        Side::P1 => (&mut first[0], &mut second[0]),
        Side::P2 => (&mut second[0], &mut first[0]),
    }
}

// =============================================================================
// PUSH
// =============================================================================

/// X displacement for each fighter when their pushboxes overlap.
///
/// The fighter further left moves left by half the overlap and the other
/// right by the same amount. Equal x positions push nobody.
pub fn character_push_offsets(
    rect1: &FixedRect,
    x1: Fixed,
    rect2: &FixedRect,
    x2: Fixed,
) -> Option<(Fixed, Fixed)> {
    if !rect1.overlaps(rect2) {
        return None;
    }

    if x1 < x2 {
        let half = fixed_half(rect1.x_max().wrapping_sub(rect2.x_min()));
        Some((-half, half))
    } else if x1 > x2 {
        let half = fixed_half(rect2.x_max().wrapping_sub(rect1.x_min()));
        Some((half, -half))
    } else {
        None
    }
}

/// X displacement that brings `rect` back inside `[-half_width, half_width]`.
pub fn stage_push_offset(rect: &FixedRect, half_width: Fixed) -> Fixed {
    let stage_min = -half_width;
    if rect.x_min() < stage_min {
        stage_min.wrapping_sub(rect.x_min())
    } else if rect.x_max() > half_width {
        half_width.wrapping_sub(rect.x_max())
    } else {
        0
    }
}

/// Push overlapping fighters apart.
pub fn push_character_vs_character<F: Fighter>(fighters: &mut [F; 2]) {
    let [f1, f2] = fighters;
    let offsets = character_push_offsets(
        &f1.pushbox(),
        f1.position().x,
        &f2.pushbox(),
        f2.position().x,
    );
    if let Some((dx1, dx2)) = offsets {
        f1.apply_position_change(dx1);
        f2.apply_position_change(dx2);
    }
}

/// Keep both fighters inside a stage of `stage_width`.
pub fn push_character_vs_stage<F: Fighter>(fighters: &mut [F; 2], stage_width: Fixed) {
    let half_width = fixed_half(stage_width);
    for fighter in fighters.iter_mut() {
        let dx = stage_push_offset(&fighter.pushbox(), half_width);
        if dx != 0 {
            fighter.apply_position_change(dx);
        }
    }
}

// =============================================================================
// HITS
// =============================================================================

/// First connecting hitbox of `attacker` on `defender`.
///
/// Returns the attack id and contact point of the first non-proximity
/// overlap, plus whether any proximity box overlapped along the way.
fn find_hit<F: Fighter>(attacker: &F, defender: &F) -> (Option<(i32, FixedVec2)>, bool) {
    let mut proximity = false;

    for hitbox in attacker.hitboxes() {
        if !attacker.can_attack_hit(hitbox.attack_id) {
            continue;
        }
        for hurtbox in defender.hurtboxes() {
            if !hitbox.overlaps(hurtbox) {
                continue;
            }
            if hitbox.proximity {
                proximity = true;
            } else {
                let point = hitbox.rect.intersection_center(hurtbox);
                return (Some((hitbox.attack_id, point)), proximity);
            }
        }
    }

    (None, proximity)
}

/// Resolve hitbox/hurtbox overlaps for every (attacker, defender) pair.
///
/// `on_damage` is called once per resolved hit with the defender, the
/// contact point and the damage result, after hitstun has been applied.
pub fn resolve_hits<F: Fighter>(
    fighters: &mut [F; 2],
    mut on_damage: impl FnMut(Side, FixedVec2, DamageResult),
) -> Vec<HitResolution> {
    let mut hits = Vec::new();

    for attacker_side in Side::BOTH {
        let defender_side = attacker_side.opponent();
        let (attacker, defender) = split_pair(fighters, attacker_side);

        match find_hit(attacker, defender) {
            (Some((attack_id, point)), _) => {
                attacker.notify_attack_hit(point);
                let attack = attacker.attack_data(attack_id);
                let result = defender.notify_damaged(&attack, point);

                let hit_stun = attacker.hit_stun_frame(result, attack_id);
                attacker.set_hit_stun(hit_stun);
                defender.set_hit_stun(hit_stun);
                defender.set_sprite_shake_frame(hit_stun / 3);

                on_damage(defender_side, point, result);
                hits.push(HitResolution {
                    attacker: attacker_side,
                    defender: defender_side,
                    attack_id,
                    point,
                    result,
                    hit_stun,
                });
            }
            (None, true) => defender.notify_in_proximity_guard_range(),
            (None, false) => {}
        }
    }

    hits
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::core::fixed::{to_fixed, STAGE_WIDTH, STAGE_HALF_WIDTH};
    use crate::game::basic_fighter::{BasicFighter, NORMAL_ATTACK_ID};
    use crate::game::fighter::action;

    fn rect(x0: f64, x1: f64) -> FixedRect {
        FixedRect::from_extents(to_fixed(x0), to_fixed(x1), to_fixed(-1.0), to_fixed(1.0))
    }

    fn fighter_at(x: f64, face_right: bool) -> BasicFighter {
        let mut f = BasicFighter::new();
        f.setup_battle_start(FixedVec2::new(to_fixed(x), 0), face_right);
        f
    }

    /// Fighter frozen on the neutral attack's first active frame.
    fn attacking_at(x: f64, face_right: bool) -> BasicFighter {
        let mut f = fighter_at(x, face_right);
        let mut state = f.save_state();
        state.current_action_id = action::N_ATTACK;
        state.current_action_frame = 5;
        f.load_state(&state);
        f.update_boxes();
        f
    }

    #[test]
    fn test_stage_push_scenario() {
        let half = STAGE_HALF_WIDTH;
        let a = rect(4.0, 5.0);
        let b = rect(4.5, 5.5);

        assert_eq!(stage_push_offset(&a, half), 0);
        let dx = stage_push_offset(&b, half);
        assert_eq!(dx, to_fixed(-0.5));
        assert_eq!(b.shifted_x(dx).x_max(), to_fixed(5.0));
    }

    #[test]
    fn test_stage_push_left_edge() {
        let r = rect(-6.0, -5.5);
        let dx = stage_push_offset(&r, STAGE_HALF_WIDTH);
        assert_eq!(r.shifted_x(dx).x_min(), -STAGE_HALF_WIDTH);
    }

    #[test]
    fn test_character_push() {
        let (d1, d2) = character_push_offsets(&rect(0.0, 1.0), to_fixed(0.5), &rect(0.5, 1.5), to_fixed(1.0))
            .unwrap();
        assert_eq!(d1, to_fixed(-0.25));
        assert_eq!(d2, to_fixed(0.25));

        let (d1, d2) = character_push_offsets(&rect(0.5, 1.5), to_fixed(1.0), &rect(0.0, 1.0), to_fixed(0.5))
            .unwrap();
        assert_eq!(d1, to_fixed(0.25));
        assert_eq!(d2, to_fixed(-0.25));
    }

    #[test]
    fn test_character_push_equal_x_is_noop() {
        assert!(character_push_offsets(&rect(0.0, 1.0), 0, &rect(0.0, 1.0), 0).is_none());
        assert!(character_push_offsets(&rect(0.0, 1.0), 0, &rect(2.0, 3.0), to_fixed(2.5)).is_none());
    }

    #[test]
    fn test_push_moves_fighters() {
        let mut fighters = [fighter_at(0.0, true), fighter_at(0.5, false)];
        push_character_vs_character(&mut fighters);
        let gap = fighters[1].pushbox().x_min() - fighters[0].pushbox().x_max();
        assert!(gap >= 0);
        assert_eq!(fighters[0].position().x + fighters[1].position().x, to_fixed(0.5));
    }

    #[test]
    fn test_one_hit_across_hurtboxes() {
        let mut fighters = [attacking_at(0.0, true), fighter_at(1.0, false)];
        // The attack overlaps both of the defender's hurtboxes
        let hitbox = fighters[0].hitboxes()[0];
        assert!(!hitbox.proximity);
        assert!(fighters[1].hurtboxes().iter().all(|h| hitbox.overlaps(h)));

        let mut events = Vec::new();
        let hits = resolve_hits(&mut fighters, |side, point, result| events.push((side, point, result)));

        assert_eq!(hits.len(), 1);
        assert_eq!(events.len(), 1);
        let hit = hits[0];
        assert_eq!(hit.attacker, Side::P1);
        assert_eq!(hit.defender, Side::P2);
        assert_eq!(hit.attack_id, NORMAL_ATTACK_ID);
        assert_eq!(hit.result, DamageResult::Damage);
        assert_eq!(events[0], (Side::P2, hit.point, DamageResult::Damage));

        assert_eq!(fighters[0].current_hit_stun_frame(), hit.hit_stun);
        assert_eq!(fighters[1].current_hit_stun_frame(), hit.hit_stun);
        assert_eq!(fighters[1].save_state().max_sprite_shake_frame, hit.hit_stun / 3);
        assert!(fighters[1].is_dead());
    }

    #[test]
    fn test_hit_point_is_intersection_center() {
        let mut fighters = [attacking_at(0.0, true), fighter_at(1.0, false)];
        let hitbox = fighters[0].hitboxes()[0].rect;
        let first_hurtbox = fighters[1].hurtboxes()[0];
        let hits = resolve_hits(&mut fighters, |_, _, _| {});
        assert_eq!(hits[0].point, hitbox.intersection_center(&first_hurtbox));
    }

    #[test]
    fn test_attack_id_hits_once() {
        let mut fighters = [attacking_at(0.0, true), fighter_at(1.0, false)];
        assert_eq!(resolve_hits(&mut fighters, |_, _, _| {}).len(), 1);
        assert!(resolve_hits(&mut fighters, |_, _, _| {}).is_empty());
        assert!(!fighters[0].can_attack_hit(NORMAL_ATTACK_ID));
    }

    #[test]
    fn test_proximity_only() {
        let mut fighters = [attacking_at(0.0, true), fighter_at(2.0, false)];
        let hits = resolve_hits(&mut fighters, |_, _, _| panic!("no damage expected"));
        assert!(hits.is_empty());
        assert!(fighters[1].save_state().is_reserve_proximity_guard);
        assert!(!fighters[0].save_state().is_reserve_proximity_guard);
    }

    #[test]
    fn test_blocked_hit() {
        let mut fighters = [attacking_at(0.0, true), fighter_at(1.0, false)];
        // P2 faces left, so holding right is backward
        fighters[1].update_input(&crate::game::input::InputSample::new(
            crate::game::input::InputBits::RIGHT,
            0.0,
        ));
        let hits = resolve_hits(&mut fighters, |_, _, _| {});
        assert_eq!(hits[0].result, DamageResult::Guard);
        assert!(!fighters[1].is_dead());
    }

    proptest! {
        #[test]
        fn prop_character_push_conserves_displacement(
            x1 in -400_000i32..400_000,
            x2 in -400_000i32..400_000,
            w1 in 1i32..200_000,
            w2 in 1i32..200_000,
        ) {
            let r1 = FixedRect::new(x1 - w1 / 2, 0, w1, 65536);
            let r2 = FixedRect::new(x2 - w2 / 2, 0, w2, 65536);
            if let Some((d1, d2)) = character_push_offsets(&r1, x1, &r2, x2) {
                prop_assert_eq!(d1 + d2, 0);
                // The left fighter never moves right
                if x1 < x2 {
                    prop_assert!(d1 <= 0);
                } else {
                    prop_assert!(d1 >= 0);
                }
            }
        }

        #[test]
        fn prop_stage_push_contains(
            x in -1_500_000i32..1_500_000,
            w in 0i32..STAGE_WIDTH,
        ) {
            let r = FixedRect::new(x, 0, w, 65536);
            let pushed = r.shifted_x(stage_push_offset(&r, STAGE_HALF_WIDTH));
            prop_assert!(pushed.x_min() >= -STAGE_HALF_WIDTH);
            prop_assert!(pushed.x_max() <= STAGE_HALF_WIDTH);
        }
    }
}
