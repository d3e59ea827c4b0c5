//! Scripted Bots
//!
//! Local opponents that produce input from the environment state. The
//! reference [`QueueBot`] plans short input sequences with a seeded RNG
//! and plays them back one frame at a time.

use std::collections::VecDeque;

use tracing::debug;

use crate::core::rng::{derive_bot_seed, DeterministicRng};
use crate::game::input::InputBits;
use crate::game::state::{EnvironmentState, Side};

/// A local input generator.
pub trait ScriptedBot: Send {
    /// Input for the next frame.
    fn next_input(&mut self, state: &EnvironmentState) -> InputBits;

    /// Drop any per-round plan.
    fn reset(&mut self);

    /// Restart the RNG from `seed`.
    fn reseed(&mut self, seed: u64);
}

/// Distance (stage units) within which the neutral attack reaches.
const ATTACK_RANGE: f64 = 1.6;

/// Distance beyond which the bot always closes in.
const FAR_RANGE: f64 = 3.0;

/// Seeded opponent driven by a queue of planned inputs.
pub struct QueueBot {
    side: Side,
    rng: DeterministicRng,
    queue: VecDeque<InputBits>,
}

impl QueueBot {
    /// Create a bot for `side` from the session seed.
    pub fn new(side: Side, seed: u64) -> Self {
        Self {
            side,
            rng: DeterministicRng::new(derive_bot_seed(seed, side == Side::P1)),
            queue: VecDeque::new(),
        }
    }

    /// Planned inputs not yet played.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn toward_opponent(&self, state: &EnvironmentState) -> InputBits {
        let own = state.position(self.side);
        let other = state.position(self.side.opponent());
        if own < other { InputBits::RIGHT } else { InputBits::LEFT }
    }

    fn away_from_opponent(&self, state: &EnvironmentState) -> InputBits {
        if self.toward_opponent(state) == InputBits::RIGHT {
            InputBits::LEFT
        } else {
            InputBits::RIGHT
        }
    }

    fn push_repeated(&mut self, input: InputBits, frames: i32) {
        for _ in 0..frames {
            self.queue.push_back(input);
        }
    }

    fn plan(&mut self, state: &EnvironmentState) {
        let forward = self.toward_opponent(state);
        let backward = self.away_from_opponent(state);
        let distance = state.distance();

        if distance > FAR_RANGE {
            let frames = self.rng.next_int_range(8, 20);
            self.push_repeated(forward, frames);
        } else if distance <= ATTACK_RANGE {
            match self.rng.next_int(3) {
                0 | 1 => {
                    self.queue.push_back(InputBits::ATTACK);
                    self.push_repeated(InputBits::NONE, 4);
                }
                _ => {
                    let frames = self.rng.next_int_range(6, 14);
                    self.push_repeated(backward, frames);
                }
            }
        } else {
            match self.rng.next_int(4) {
                0 => {
                    let frames = self.rng.next_int_range(4, 12);
                    self.push_repeated(forward, frames);
                }
                1 => {
                    let frames = self.rng.next_int_range(4, 10);
                    self.push_repeated(backward, frames);
                }
                2 => {
                    let frames = self.rng.next_int_range(2, 8);
                    self.push_repeated(InputBits::NONE, frames);
                }
                _ => {
                    self.push_repeated(forward, 3);
                    self.queue.push_back(InputBits::ATTACK);
                }
            }
        }

        debug!(side = %self.side, distance, planned = self.queue.len(), "bot planned inputs");
    }
}

impl ScriptedBot for QueueBot {
    fn next_input(&mut self, state: &EnvironmentState) -> InputBits {
        if self.queue.is_empty() {
            self.plan(state);
        }
        self.queue.pop_front().unwrap_or_default()
    }

    fn reset(&mut self) {
        self.queue.clear();
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = DeterministicRng::new(derive_bot_seed(seed, self.side == Side::P1));
        self.queue.clear();
    }
}
