//! Training Actors
//!
//! An actor supplies one side's input to the training coordinator and
//! receives the environment state after every Fight frame. Local actors
//! (human controller, scripted bot) live here; the socket-backed ones are
//! in `remote` and `spectator`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::game::bot::{QueueBot, ScriptedBot};
use crate::game::input::{InputBits, InputSource};
use crate::game::state::{EnvironmentState, Side};
use crate::network::protocol::NetworkError;

/// Timing discipline between the simulation and a remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDiscipline {
    /// Fire-and-forget; the last settled input is used
    #[default]
    Async,
    /// Fight frames wait (without blocking) until the reply arrives
    SyncedNonBlocking,
    /// Requests block the simulation until the reply arrives
    SyncedBlocking,
}

impl SyncDiscipline {
    /// Whether a request in flight holds back the next Fight frame.
    pub fn gates_frames(self) -> bool {
        !matches!(self, SyncDiscipline::Async)
    }

    /// Whether requests block the caller.
    pub fn blocks(self) -> bool {
        matches!(self, SyncDiscipline::SyncedBlocking)
    }
}

impl FromStr for SyncDiscipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "async" => Ok(SyncDiscipline::Async),
            "synced" | "synced_non_blocking" => Ok(SyncDiscipline::SyncedNonBlocking),
            "blocking" | "synced_blocking" => Ok(SyncDiscipline::SyncedBlocking),
            other => Err(format!("unknown sync discipline '{}'", other)),
        }
    }
}

impl fmt::Display for SyncDiscipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDiscipline::Async => write!(f, "async"),
            SyncDiscipline::SyncedNonBlocking => write!(f, "synced"),
            SyncDiscipline::SyncedBlocking => write!(f, "blocking"),
        }
    }
}

/// One side's input supplier.
pub trait Actor {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Bind any listening sockets without waiting for peers.
    fn listen(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    /// Get ready to play; may block until a peer connects.
    fn setup(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    /// Release connections.
    fn close(&mut self) {}

    /// Receive the state after a Fight frame.
    fn update_current_state(&mut self, state: &EnvironmentState, round_over: bool);

    /// Start producing the next input. A duplicate while one is outstanding is ignored.
    fn request_next_input(&mut self);

    /// Whether the next Fight frame may run as far as this actor is concerned.
    fn ready(&mut self) -> bool;

    /// Latest settled input.
    fn input(&mut self) -> InputBits;

    /// Drop per-round state (called every Intro frame).
    fn reset(&mut self) {}

    /// Restart any RNG from `seed`.
    fn reseed(&mut self, _seed: u64) {}
}

// =============================================================================
// HUMAN
// =============================================================================

/// Actor reading a local controller.
pub struct HumanActor {
    side: Side,
    name: String,
    source: Box<dyn InputSource>,
    input: InputBits,
}

impl HumanActor {
    /// Poll `source` for `side`.
    pub fn new(side: Side, source: Box<dyn InputSource>) -> Self {
        Self {
            side,
            name: format!("{} human", side),
            source,
            input: InputBits::NONE,
        }
    }
}

impl Actor for HumanActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_current_state(&mut self, _state: &EnvironmentState, _round_over: bool) {}

    fn request_next_input(&mut self) {
        self.input = self.source.pressed(self.side);
    }

    fn ready(&mut self) -> bool {
        true
    }

    fn input(&mut self) -> InputBits {
        self.input
    }
}

// =============================================================================
// BOT
// =============================================================================

/// Actor driven by a scripted bot.
pub struct BotActor {
    name: String,
    bot: Box<dyn ScriptedBot>,
    state: EnvironmentState,
    input: InputBits,
}

impl BotActor {
    /// Wrap any scripted bot.
    pub fn new(name: impl Into<String>, bot: Box<dyn ScriptedBot>) -> Self {
        Self {
            name: name.into(),
            bot,
            state: EnvironmentState::default(),
            input: InputBits::NONE,
        }
    }

    /// Seeded queue bot for `side`.
    pub fn queue_bot(side: Side, seed: u64) -> Self {
        Self::new(format!("{} bot", side), Box::new(QueueBot::new(side, seed)))
    }
}

impl Actor for BotActor {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_current_state(&mut self, state: &EnvironmentState, _round_over: bool) {
        self.state = state.clone();
    }

    fn request_next_input(&mut self) {
        self.input = self.bot.next_input(&self.state);
    }

    fn ready(&mut self) -> bool {
        true
    }

    fn input(&mut self) -> InputBits {
        self.input
    }

    fn reset(&mut self) {
        self.bot.reset();
    }

    fn reseed(&mut self, seed: u64) {
        self.bot.reseed(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::HeldInput;

    #[test]
    fn test_discipline_parse() {
        assert_eq!("async".parse::<SyncDiscipline>().unwrap(), SyncDiscipline::Async);
        assert_eq!("SYNCED".parse::<SyncDiscipline>().unwrap(), SyncDiscipline::SyncedNonBlocking);
        assert_eq!("blocking".parse::<SyncDiscipline>().unwrap(), SyncDiscipline::SyncedBlocking);
        assert!("later".parse::<SyncDiscipline>().is_err());

        assert!(!SyncDiscipline::Async.gates_frames());
        assert!(SyncDiscipline::SyncedNonBlocking.gates_frames());
        assert!(!SyncDiscipline::SyncedNonBlocking.blocks());
        assert!(SyncDiscipline::SyncedBlocking.blocks());
    }

    #[test]
    fn test_human_actor_polls_on_request() {
        let source = HeldInput::new(InputBits::RIGHT, InputBits::LEFT | InputBits::ATTACK);
        let mut p2 = HumanActor::new(Side::P2, Box::new(source));
        assert!(p2.ready());
        assert_eq!(p2.input(), InputBits::NONE);
        p2.request_next_input();
        assert_eq!(p2.input(), InputBits::LEFT | InputBits::ATTACK);
        assert_eq!(p2.name(), "p2 human");
    }

    #[test]
    fn test_bot_actor_uses_latest_state() {
        let mut actor = BotActor::queue_bot(Side::P1, 3);
        let far = EnvironmentState {
            p1_position: -4.0,
            p2_position: 4.0,
            ..EnvironmentState::default()
        };
        actor.update_current_state(&far, false);
        actor.request_next_input();
        assert_eq!(actor.input(), InputBits::RIGHT);
        assert!(actor.ready());
    }
}
