//! Training Coordinator
//!
//! Drives both sides' actors once per Fight frame and answers the battle's
//! readiness checks. When training is disabled every call is a no-op and
//! the battle runs on its local inputs.

use tracing::{info, debug};

use crate::game::battle::FrameDriver;
use crate::game::input::InputBits;
use crate::game::state::{EnvironmentState, Side};
use crate::network::actor::{Actor, BotActor};
use crate::network::protocol::NetworkError;

/// Coordinates the p1 and p2 actors.
pub struct TrainingManager {
    enabled: bool,
    actors: [Option<Box<dyn Actor>>; 2],
    /// Configured p2 actor while the scripted bot stands in
    p2_saved: Option<Box<dyn Actor>>,
    p2_bot: bool,
    bot_seed: u64,
    is_setup: bool,
}

impl TrainingManager {
    /// Create a coordinator. With `enabled` false the actors are never used.
    pub fn new(enabled: bool, p1: Option<Box<dyn Actor>>, p2: Option<Box<dyn Actor>>, bot_seed: u64) -> Self {
        Self {
            enabled,
            actors: [p1, p2],
            p2_saved: None,
            p2_bot: false,
            bot_seed,
            is_setup: false,
        }
    }

    /// Coordinator for local play.
    pub fn disabled() -> Self {
        Self::new(false, None, None, 0)
    }

    /// Whether training drives the battle.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a p1 actor is installed.
    pub fn is_p1_set(&self) -> bool {
        self.actors[0].is_some()
    }

    /// Whether a p2 actor is installed.
    pub fn is_p2_set(&self) -> bool {
        self.actors[1].is_some()
    }

    /// Whether the scripted bot currently plays p2.
    pub fn is_p2_bot(&self) -> bool {
        self.p2_bot
    }

    /// Install the actor for `side`.
    pub fn set_actor(&mut self, side: Side, actor: Box<dyn Actor>) {
        self.actors[side.index()] = Some(actor);
    }

    /// Bind every listening socket so peers may connect in any order.
    pub fn listen(&mut self) -> Result<(), NetworkError> {
        if !self.enabled {
            return Ok(());
        }
        for actor in self.actors.iter_mut().flatten() {
            actor.listen()?;
        }
        Ok(())
    }

    /// Set up both actors once. Returns true if setup ran.
    pub fn setup(&mut self) -> Result<bool, NetworkError> {
        if !self.enabled || self.is_setup {
            return Ok(false);
        }
        for actor in self.actors.iter_mut().flatten() {
            info!(actor = actor.name(), "setting up actor");
            actor.setup()?;
        }
        self.is_setup = true;
        Ok(true)
    }

    /// Close both actors. Returns true if anything was closed.
    pub fn close(&mut self) -> bool {
        if !self.enabled || !self.is_setup {
            return false;
        }
        for actor in self.actors.iter_mut().flatten() {
            actor.close();
        }
        if let Some(saved) = self.p2_saved.as_mut() {
            saved.close();
        }
        self.is_setup = false;
        true
    }

    /// Swap p2 between the configured actor and the scripted bot.
    pub fn set_p2_bot(&mut self, use_bot: bool) {
        match (use_bot, self.p2_bot) {
            (true, false) => {
                let bot: Box<dyn Actor> = Box::new(BotActor::queue_bot(Side::P2, self.bot_seed));
                self.p2_saved = self.actors[1].replace(bot);
                self.p2_bot = true;
                info!("p2 switched to scripted bot");
            }
            (false, true) => {
                self.actors[1] = self.p2_saved.take();
                self.p2_bot = false;
                info!("p2 switched back to configured actor");
            }
            _ => debug!(use_bot, "p2 actor unchanged"),
        }
    }

    /// Reseed every bot-driven actor (current and future).
    pub fn reseed(&mut self, seed: u64) {
        self.bot_seed = seed;
        for actor in self.actors.iter_mut().flatten() {
            actor.reseed(seed);
        }
        info!(seed, "bots reseeded");
    }
}

impl FrameDriver for TrainingManager {
    fn is_training(&self) -> bool {
        self.enabled
    }

    fn ready(&mut self) -> bool {
        if !self.enabled {
            return true;
        }
        self.actors.iter_mut().flatten().all(|actor| actor.ready())
    }

    fn step(&mut self, state: &EnvironmentState, round_over: bool) {
        if !self.enabled {
            return;
        }
        // Unready actors do not receive the state
        for actor in self.actors.iter_mut().flatten() {
            if actor.ready() {
                actor.update_current_state(state, round_over);
                if !round_over {
                    actor.request_next_input();
                }
            }
        }
    }

    fn input(&mut self, side: Side) -> InputBits {
        self.actors[side.index()]
            .as_mut()
            .map(|actor| actor.input())
            .unwrap_or_default()
    }

    fn reset_bots(&mut self) {
        for actor in self.actors.iter_mut().flatten() {
            actor.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::battle::{Battle, BattleConfig};
    use crate::game::state::RoundState;

    /// Actor that reports not ready on every third poll.
    #[derive(Default)]
    struct Flaky {
        polls: u32,
        input: InputBits,
    }

    impl Actor for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn update_current_state(&mut self, _state: &EnvironmentState, _round_over: bool) {}

        fn request_next_input(&mut self) {
            self.input = InputBits::RIGHT;
        }

        fn ready(&mut self) -> bool {
            self.polls += 1;
            self.polls % 3 != 0
        }

        fn input(&mut self) -> InputBits {
            self.input
        }
    }

    #[test]
    fn test_disabled_manager_is_inert() {
        let mut manager = TrainingManager::disabled();
        assert!(manager.ready());
        assert!(!manager.setup().unwrap());
        assert!(!manager.close());
        manager.step(&EnvironmentState::default(), false);
        assert_eq!(manager.input(Side::P1), InputBits::NONE);
        assert!(!manager.is_p1_set());
    }

    #[test]
    fn test_step_skips_round_over_requests() {
        let p1 = BotActor::queue_bot(Side::P1, 1);
        let p2 = BotActor::queue_bot(Side::P2, 1);
        let mut manager = TrainingManager::new(true, Some(Box::new(p1)), Some(Box::new(p2)), 1);
        assert!(manager.setup().unwrap());
        assert!(!manager.setup().unwrap());

        let far = EnvironmentState { p1_position: -4.0, p2_position: 4.0, ..EnvironmentState::default() };
        manager.step(&far, true);
        assert_eq!(manager.input(Side::P1), InputBits::NONE);
        manager.step(&far, false);
        assert_eq!(manager.input(Side::P1), InputBits::RIGHT);
        assert_eq!(manager.input(Side::P2), InputBits::LEFT);
        assert!(manager.close());
    }

    #[test]
    fn test_p2_bot_swap() {
        let p2 = BotActor::new("custom", Box::new(crate::game::bot::QueueBot::new(Side::P2, 4)));
        let mut manager = TrainingManager::new(true, None, Some(Box::new(p2)), 9);
        assert!(!manager.is_p2_bot());

        manager.set_p2_bot(true);
        assert!(manager.is_p2_bot());
        assert!(manager.is_p2_set());

        manager.set_p2_bot(true);
        assert!(manager.is_p2_bot());

        manager.set_p2_bot(false);
        assert!(!manager.is_p2_bot());
        assert_eq!(manager.actors[1].as_ref().map(|a| a.name().to_string()), Some("custom".to_string()));
    }

    #[test]
    fn test_unready_actor_holds_battle() {
        let mut manager = TrainingManager::new(true, Some(Box::new(Flaky::default())), None, 0);
        let mut battle = Battle::new(BattleConfig { training: true, ..BattleConfig::default() });

        for _ in 0..2 {
            battle.tick(&mut manager);
        }
        assert_eq!(battle.round_state(), RoundState::Fight);

        let mut ran = 0;
        for _ in 0..20 {
            if battle.tick(&mut manager).fight_frame {
                ran += 1;
            }
        }
        assert!(ran > 0);
        assert!(ran < 20);
        assert_eq!(battle.frame_count(), ran - 1);
    }
}
