//! Battle Simulation
//!
//! The round state machine and the fixed-order frame pipeline. This is
//! the part that must be 100% deterministic: fixed-point positions, a
//! fixed fighter order, and inputs taken only from the recorder, the
//! frame driver, the vs-CPU bot or the local input source.
//!
//! ```text
//! Stop -> Intro -> Fight -> KO (a fighter died) -> End -> Stop
//! ```

use tracing::{debug, info};
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::core::fixed::{Fixed, to_float, STAGE_WIDTH, P1_START_X, P2_START_X};
use crate::core::hash::StateHash;
use crate::core::vec2::FixedVec2;
use crate::game::basic_fighter::BasicFighter;
use crate::game::bot::{QueueBot, ScriptedBot};
use crate::game::collision::{push_character_vs_character, push_character_vs_stage, resolve_hits};
use crate::game::events::{BattleEvent, BattleEventData, DamageHandler};
use crate::game::fighter::Fighter;
use crate::game::input::{IdleInput, InputBits, InputRecorder, InputSample, InputSource};
use crate::game::snapshot::{BattleSnapshot, SnapshotError};
use crate::game::state::{EnvironmentState, RoundState, Side};
use crate::TICK_RATE;

/// Round wins needed to take the match.
pub const MAX_ROUND_WON: u32 = 3;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Round state durations, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundTimers {
    /// Intro countdown
    pub intro: i32,
    /// Frozen KO pause
    pub ko: i32,
    /// Winner pose
    pub end: i32,
    /// End may be skipped once this many frames remain
    pub end_skippable: i32,
}

impl RoundTimers {
    /// Intro 3.0 s, KO 2.0 s, End 3.0 s, skippable at 1.5 s.
    pub const STANDARD: Self = Self {
        intro: 3 * TICK_RATE as i32,
        ko: 2 * TICK_RATE as i32,
        end: 3 * TICK_RATE as i32,
        end_skippable: 3 * TICK_RATE as i32 / 2,
    };

    /// Training skips the pauses but still visits every state.
    pub const TRAINING: Self = Self {
        intro: 0,
        ko: 0,
        end: 0,
        end_skippable: 3 * TICK_RATE as i32 / 2,
    };
}

/// Configuration for a battle.
#[derive(Clone, Debug)]
pub struct BattleConfig {
    /// Inputs come from the frame driver; no match end
    pub training: bool,
    /// Spawn a scripted opponent for p2 outside training
    pub vs_cpu: bool,
    /// Replay the previous round's inputs from the next Intro on
    pub replay_last_round: bool,
    /// Seed for the vs-CPU bot
    pub bot_seed: u64,
    /// Battle area width
    pub stage_width: Fixed,
    /// Force Attack held on p1
    pub debug_p1_attack: bool,
    /// Force backward held on p1
    pub debug_p1_guard: bool,
    /// Force Attack held on p2
    pub debug_p2_attack: bool,
    /// Force backward held on p2
    pub debug_p2_guard: bool,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            training: false,
            vs_cpu: false,
            replay_last_round: false,
            bot_seed: 0,
            stage_width: STAGE_WIDTH,
            debug_p1_attack: false,
            debug_p1_guard: false,
            debug_p2_attack: false,
            debug_p2_guard: false,
        }
    }
}

impl BattleConfig {
    /// Round timers for this mode.
    pub fn timers(&self) -> RoundTimers {
        if self.training {
            RoundTimers::TRAINING
        } else {
            RoundTimers::STANDARD
        }
    }
}

// =============================================================================
// FRAME DRIVER
// =============================================================================

/// The training coordinator as seen by the battle.
///
/// Gates Fight frames, supplies remote/bot inputs and receives the state
/// after every Fight frame.
pub trait FrameDriver {
    /// Whether actors drive the fighters.
    fn is_training(&self) -> bool;

    /// Whether the next Fight frame may run.
    fn ready(&mut self) -> bool;

    /// Deliver the state and, unless the round is over, request inputs.
    fn step(&mut self, state: &EnvironmentState, round_over: bool);

    /// Latest input for `side`.
    fn input(&mut self, side: Side) -> InputBits;

    /// Drop per-round bot plans (called every Intro frame).
    fn reset_bots(&mut self) {}
}

/// Driver for local play: never training, always ready.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDriver;

impl FrameDriver for LocalDriver {
    fn is_training(&self) -> bool {
        false
    }

    fn ready(&mut self) -> bool {
        true
    }

    fn step(&mut self, _state: &EnvironmentState, _round_over: bool) {}

    fn input(&mut self, _side: Side) -> InputBits {
        InputBits::NONE
    }
}

// =============================================================================
// TICK RESULT
// =============================================================================

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<BattleEvent>,
    /// Whether a Fight frame ran
    pub fight_frame: bool,
    /// Set once a side reaches the match target
    pub match_over: Option<Side>,
}

// =============================================================================
// BATTLE
// =============================================================================

/// A battle session between two fighters.
pub struct Battle<F: Fighter = BasicFighter> {
    fighters: [F; 2],
    config: BattleConfig,
    timers: RoundTimers,

    round_state: RoundState,
    timer: i32,
    round_won: [u32; 2],
    match_over: Option<Side>,

    /// Fixed updates since the battle was created
    clock_frames: u64,
    round_start_time: f64,
    frame_count: i32,

    recorder: InputRecorder,
    local_input: Box<dyn InputSource>,
    cpu_bot: Option<Box<dyn ScriptedBot>>,
    damage_handler: Option<DamageHandler>,

    paused: bool,
    advance_paused: bool,

    events: Vec<BattleEvent>,
}

impl Battle<BasicFighter> {
    /// Create a battle between two reference fighters.
    pub fn new(config: BattleConfig) -> Self {
        Self::with_fighters(BasicFighter::new(), BasicFighter::new(), config)
    }
}

impl<F: Fighter> Battle<F> {
    /// Create a battle between the given fighters.
    pub fn with_fighters(p1: F, p2: F, config: BattleConfig) -> Self {
        Self {
            fighters: [p1, p2],
            timers: config.timers(),
            config,
            round_state: RoundState::Stop,
            timer: 0,
            round_won: [0; 2],
            match_over: None,
            clock_frames: 0,
            round_start_time: 0.0,
            frame_count: -1,
            recorder: InputRecorder::new(),
            local_input: Box::new(IdleInput),
            cpu_bot: None,
            damage_handler: None,
            paused: false,
            advance_paused: false,
            events: Vec::new(),
        }
    }

    /// Replace the local controller.
    pub fn set_local_input(&mut self, source: Box<dyn InputSource>) {
        self.local_input = source;
    }

    /// Register the synchronous damage callback.
    pub fn set_damage_handler(&mut self, handler: DamageHandler) {
        self.damage_handler = Some(handler);
    }

    // ===== ACCESSORS =====

    /// Current round state.
    pub fn round_state(&self) -> RoundState {
        self.round_state
    }

    /// Fight frame counter (-1 before the first Fight frame of a round).
    pub fn frame_count(&self) -> i32 {
        self.frame_count
    }

    /// Rounds won by `side`.
    pub fn round_won(&self, side: Side) -> u32 {
        self.round_won[side.index()]
    }

    /// Winner of the match, once decided.
    pub fn match_over(&self) -> Option<Side> {
        self.match_over
    }

    /// Fighter for `side`.
    pub fn fighter(&self, side: Side) -> &F {
        &self.fighters[side.index()]
    }

    /// Input recorder (live and last-round history).
    pub fn recorder(&self) -> &InputRecorder {
        &self.recorder
    }

    /// Battle clock in seconds.
    pub fn time(&self) -> f64 {
        self.clock_frames as f64 / TICK_RATE as f64
    }

    /// Seconds since the current Fight began.
    fn round_time(&self) -> f64 {
        self.time() - self.round_start_time
    }

    /// Frames `side` recovers before its opponent (negative when behind).
    ///
    /// Always-cancelable actions count as zero frames left.
    pub fn frame_advantage(&self, side: Side) -> i32 {
        let own = self.fighter(side).action_frames_left();
        let other = self.fighter(side.opponent()).action_frames_left();
        other.saturating_sub(own)
    }

    /// Facts about the current frame for actors and bots.
    pub fn environment_state(&self) -> EnvironmentState {
        let [f1, f2] = &self.fighters;
        let (p1_action, p2_action) = self.recorder.most_recent();
        EnvironmentState {
            p1_vital: f1.vital_health(),
            p2_vital: f2.vital_health(),
            p1_guard: f1.guard_health(),
            p2_guard: f2.guard_health(),
            p1_move: f1.current_action_id(),
            p1_move_frame: f1.current_action_frame(),
            p2_move: f2.current_action_id(),
            p2_move_frame: f2.current_action_frame(),
            p1_position: to_float(f1.position().x),
            p2_position: to_float(f2.position().x),
            global_frame: self.frame_count,
            p1_most_recent_action: p1_action.bits() as i32,
            p2_most_recent_action: p2_action.bits() as i32,
            p1_hitstun: f1.current_hit_stun_frame(),
            p2_hitstun: f2.current_hit_stun_frame(),
        }
    }

    // ===== DEBUG PAUSE =====

    /// Freeze Fight frames.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Whether Fight frames are frozen.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Let exactly one Fight frame run while paused.
    pub fn advance_paused_frame(&mut self) {
        self.advance_paused = true;
    }

    /// True when the pause holds this frame.
    fn check_debug_pause(&mut self) -> bool {
        self.paused && !std::mem::take(&mut self.advance_paused)
    }

    // ===== SNAPSHOTS =====

    /// Deep copy of both fighters plus round timing.
    pub fn save_state(&self) -> BattleSnapshot {
        BattleSnapshot {
            p1_state: self.fighters[0].save_state(),
            p2_state: self.fighters[1].save_state(),
            round_start_time: self.round_start_time,
            frame_count: self.frame_count,
        }
    }

    /// Overwrite both fighters and round timing.
    ///
    /// Input history and the replay cursor are left as they are. A snapshot
    /// that fails validation leaves the battle untouched.
    pub fn load_state(&mut self, snapshot: &BattleSnapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        self.fighters[0].load_state(&snapshot.p1_state);
        self.fighters[1].load_state(&snapshot.p2_state);
        self.round_start_time = snapshot.round_start_time;
        self.frame_count = snapshot.frame_count;

        info!(frame = snapshot.frame_count, "battle state loaded");
        self.events.push(BattleEvent::new(
            self.frame_count,
            BattleEventData::SnapshotLoaded { frame: snapshot.frame_count },
        ));
        Ok(())
    }

    /// Hash of the current snapshot.
    pub fn state_hash(&self) -> StateHash {
        self.save_state().compute_hash()
    }

    /// Hash of the inputs recorded so far this round.
    ///
    /// Two runs that fed identical inputs report the same value, so a
    /// replayed round can be checked against the live one.
    pub fn input_hash(&self) -> StateHash {
        self.recorder.live().compute_hash()
    }

    // ===== CONTROL =====

    /// Restart the round from Intro.
    pub fn reset_round(&mut self, driver: &mut dyn FrameDriver) {
        info!("round reset");
        self.change_round_state(RoundState::Intro, driver);
    }

    /// Clear round wins so a finished match can restart.
    pub fn reset_match(&mut self, driver: &mut dyn FrameDriver) {
        self.round_won = [0; 2];
        self.match_over = None;
        self.change_round_state(RoundState::Stop, driver);
    }

    /// Reseed the vs-CPU bot (current and future).
    pub fn reseed(&mut self, seed: u64) {
        self.config.bot_seed = seed;
        if let Some(bot) = self.cpu_bot.as_mut() {
            bot.reseed(seed);
        }
    }

    /// Start replaying the last round from the next Intro frame.
    pub fn request_last_round_replay(&mut self) {
        self.config.replay_last_round = true;
    }

    // ===== ROUND STATE MACHINE =====

    /// Run one fixed-step frame.
    pub fn tick(&mut self, driver: &mut dyn FrameDriver) -> TickResult {
        self.clock_frames += 1;
        let mut fight_frame = false;

        match self.round_state {
            RoundState::Stop => {
                if self.match_over.is_none() {
                    self.change_round_state(RoundState::Intro, driver);
                }
            }
            RoundState::Intro => {
                driver.reset_bots();
                if let Some(bot) = self.cpu_bot.as_mut() {
                    bot.reset();
                }

                self.update_intro_state(driver);

                self.timer -= 1;
                if self.timer <= 0 {
                    self.change_round_state(RoundState::Fight, driver);
                }

                // Intro frames are recorded too, so with a non-zero intro timer the
                // cursor is already past the start when Fight begins.
                if self.config.replay_last_round && !self.recorder.is_replaying() {
                    self.recorder.start_replay();
                    let frames = self.recorder.last_round().len() as u32;
                    info!(frames, "replaying last round input");
                    self.events.push(BattleEvent::new(
                        self.frame_count,
                        BattleEventData::ReplayStarted { frames },
                    ));
                }
            }
            RoundState::Fight => {
                if !self.check_debug_pause() && driver.ready() {
                    self.frame_count = self.frame_count.saturating_add(1);
                    fight_frame = true;

                    self.update_fight_state(driver);

                    let round_over = self.fighters.iter().any(|f| f.is_dead());
                    if round_over {
                        self.change_round_state(RoundState::KO, driver);
                    }
                    let state = self.environment_state();
                    driver.step(&state, round_over);
                }
            }
            RoundState::KO => {
                self.timer -= 1;
                if self.timer <= 0 {
                    self.change_round_state(RoundState::End, driver);
                }
            }
            RoundState::End => {
                self.update_end_state();

                self.timer -= 1;
                let skip = self.timer <= self.timers.end_skippable
                    && self.local_input.attack_pressed_this_frame();
                if self.timer <= 0 || skip {
                    self.change_round_state(RoundState::Stop, driver);
                }
            }
        }

        TickResult {
            events: std::mem::take(&mut self.events),
            fight_frame,
            match_over: self.match_over,
        }
    }

    fn change_round_state(&mut self, next: RoundState, driver: &mut dyn FrameDriver) {
        let previous = std::mem::replace(&mut self.round_state, next);
        info!(from = %previous, to = %next, frame = self.frame_count, "round state changed");
        self.events.push(BattleEvent::round_state_changed(self.frame_count, previous, next));

        match next {
            RoundState::Stop => {
                if !driver.is_training() {
                    let winner = Side::BOTH
                        .into_iter()
                        .find(|side| self.round_won[side.index()] >= MAX_ROUND_WON);
                    if let Some(winner) = winner {
                        info!(%winner, "match over");
                        self.match_over = Some(winner);
                        self.events.push(BattleEvent::match_over(self.frame_count, winner));
                    }
                }
            }
            RoundState::Intro => {
                self.fighters[0].setup_battle_start(FixedVec2::new(P1_START_X, 0), true);
                self.fighters[1].setup_battle_start(FixedVec2::new(P2_START_X, 0), false);
                self.timer = self.timers.intro;

                if self.config.vs_cpu && !driver.is_training() {
                    self.cpu_bot = Some(Box::new(QueueBot::new(Side::P2, self.config.bot_seed)));
                }
            }
            RoundState::Fight => {
                self.round_start_time = self.time();
                self.frame_count = -1;
                self.recorder.reset_live();

                // Initial state first, then the first input request
                let state = self.environment_state();
                driver.step(&state, false);
            }
            RoundState::KO => {
                self.timer = self.timers.ko;
                self.recorder.copy_last_round();
                for fighter in self.fighters.iter_mut() {
                    fighter.clear_input();
                }
                self.cpu_bot = None;

                for side in Side::BOTH {
                    if self.fighters[side.index()].is_dead() {
                        self.events.push(BattleEvent::knock_out(self.frame_count, side));
                    }
                }
            }
            RoundState::End => {
                self.timer = self.timers.end;

                let dead: Vec<Side> = Side::BOTH
                    .into_iter()
                    .filter(|side| self.fighters[side.index()].is_dead())
                    .collect();
                if let [loser] = dead[..] {
                    let winner = loser.opponent();
                    self.round_won[winner.index()] += 1;
                    self.fighters[winner.index()].request_win_action();

                    let wins = self.round_won[winner.index()];
                    info!(%winner, wins, "round won");
                    self.events.push(BattleEvent::round_won(self.frame_count, winner, wins));
                }
            }
        }
    }

    // ===== FRAME PIPELINE =====

    /// Inputs for this frame, one per side.
    fn gather_inputs(&mut self, driver: &mut dyn FrameDriver) -> (InputSample, InputSample) {
        if self.recorder.is_replaying() {
            return self.recorder.replay_sample();
        }

        let time = self.round_time();
        let training = driver.is_training();

        let mut p1 = if training {
            driver.input(Side::P1)
        } else {
            self.local_input.pressed(Side::P1)
        };

        let mut p2 = if training {
            driver.input(Side::P2)
        } else if self.cpu_bot.is_some() {
            let state = self.environment_state();
            self.cpu_bot
                .as_mut()
                .map(|bot| bot.next_input(&state))
                .unwrap_or_default()
        } else {
            self.local_input.pressed(Side::P2)
        };

        if self.config.debug_p1_attack {
            p1 = p1 | InputBits::ATTACK;
        }
        if self.config.debug_p1_guard {
            p1 = p1 | InputBits::LEFT;
        }
        if self.config.debug_p2_attack {
            p2 = p2 | InputBits::ATTACK;
        }
        if self.config.debug_p2_guard {
            p2 = p2 | InputBits::RIGHT;
        }

        (InputSample::new(p1, time), InputSample::new(p2, time))
    }

    /// Steps 1-4: intake, record, edge detection, action frame.
    fn intake_inputs(&mut self, driver: &mut dyn FrameDriver) {
        let (p1, p2) = self.gather_inputs(driver);
        self.recorder.record(p1, p2);
        self.fighters[0].update_input(&p1);
        self.fighters[1].update_input(&p2);

        #[cfg(feature = "debug-tracing")]
        trace!(frame = self.frame_count, p1 = ?p1.input, p2 = ?p2.input, "inputs");
    }

    /// Steps 6-9: movement, boxes, pushes.
    fn update_physics(&mut self) {
        for fighter in self.fighters.iter_mut() {
            fighter.update_movement();
        }
        for fighter in self.fighters.iter_mut() {
            fighter.update_boxes();
        }
        push_character_vs_character(&mut self.fighters);
        push_character_vs_stage(&mut self.fighters, self.config.stage_width);
    }

    fn update_intro_state(&mut self, driver: &mut dyn FrameDriver) {
        self.intake_inputs(driver);
        for fighter in self.fighters.iter_mut() {
            fighter.increment_action_frame();
        }
        for fighter in self.fighters.iter_mut() {
            fighter.update_intro_action();
        }
        self.update_physics();
    }

    fn update_fight_state(&mut self, driver: &mut dyn FrameDriver) {
        self.intake_inputs(driver);
        for fighter in self.fighters.iter_mut() {
            fighter.increment_action_frame();
        }
        for fighter in self.fighters.iter_mut() {
            fighter.update_action_request();
        }
        self.update_physics();

        let handler = &mut self.damage_handler;
        let hits = resolve_hits(&mut self.fighters, |defender, point, result| {
            if let Some(handler) = handler.as_mut() {
                handler(defender, point, result);
            }
        });
        for hit in hits {
            debug!(
                attacker = %hit.attacker,
                attack_id = hit.attack_id,
                result = ?hit.result,
                hit_stun = hit.hit_stun,
                "hit resolved"
            );
            self.events.push(BattleEvent::hit(
                self.frame_count,
                hit.attacker,
                hit.attack_id,
                hit.point,
                hit.result,
            ));
        }
    }

    fn update_end_state(&mut self) {
        for fighter in self.fighters.iter_mut() {
            fighter.increment_action_frame();
        }
        for fighter in self.fighters.iter_mut() {
            fighter.update_action_request();
        }
        self.update_physics();
    }
}

// =============================================================================
// TESTS
// =============================================================================
