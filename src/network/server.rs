//! Training Server
//!
//! Owns the battle, the training coordinator and the remote control, and
//! runs the fixed-step loop on the calling thread. Socket I/O happens on
//! the tokio runtime behind `handle`; this loop only talks to it through
//! the actors' channels.
//!
//! Per frame: drain fatal errors, apply at most one control command, tick
//! the battle, drain fatal errors again.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn, debug, instrument};

use crate::core::hash::StateHash;
use crate::game::battle::{Battle, TickResult};
use crate::game::input::IdleInput;
use crate::game::state::Side;
use crate::network::actor::{Actor, BotActor, HumanActor};
use crate::network::config::{ActorKind, ChannelAddr, TrainingConfig};
use crate::network::control::RemoteControl;
use crate::network::link::{fatal_channel, FatalReceiver, FatalSender};
use crate::network::protocol::{ControlCommand, NetworkError};
use crate::network::remote::RemoteActor;
use crate::network::spectator::RemoteSpectator;
use crate::network::training::TrainingManager;

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Frames ticked
    pub frames: u64,
    /// Match winner, if the match ended
    pub winner: Option<Side>,
    /// Rounds won per side
    pub round_won: [u32; 2],
    /// Hash of the final battle snapshot
    pub final_hash: StateHash,
    /// Hash of the inputs recorded in the final round
    pub input_hash: StateHash,
}

/// The training server.
pub struct TrainingServer {
    config: TrainingConfig,
    battle: Battle,
    manager: TrainingManager,
    control: Option<RemoteControl>,
    fatal: FatalReceiver,
    shutdown: Option<oneshot::Receiver<()>>,
    handle: Handle,
    frames: u64,
}

impl TrainingServer {
    /// Build every actor and channel described by `config`.
    pub fn new(config: TrainingConfig, handle: Handle) -> Self {
        let (fatal_tx, fatal_rx) = fatal_channel();

        let manager = if config.training {
            let p1 = build_actor(Side::P1, &config, &handle, &fatal_tx);
            let p2 = build_actor(Side::P2, &config, &handle, &fatal_tx);
            TrainingManager::new(true, Some(p1), Some(p2), config.bot_seed)
        } else {
            TrainingManager::disabled()
        };

        let control = match (&config.remote_control, config.training) {
            (Some(channel), true) => Some(RemoteControl::new(
                channel.address.clone(),
                channel.port,
                config.discipline,
                handle.clone(),
                fatal_tx.clone(),
            )),
            _ => None,
        };

        Self::from_parts(config, manager, control, fatal_rx, handle)
    }

    /// Assemble a server from pre-built parts.
    pub fn from_parts(
        config: TrainingConfig,
        manager: TrainingManager,
        control: Option<RemoteControl>,
        fatal: FatalReceiver,
        handle: Handle,
    ) -> Self {
        Self {
            battle: Battle::new(config.battle_config()),
            config,
            manager,
            control,
            fatal,
            shutdown: None,
            handle,
            frames: 0,
        }
    }

    /// The battle being simulated.
    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    /// The training coordinator.
    pub fn manager(&self) -> &TrainingManager {
        &self.manager
    }

    /// Frames ticked so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Stop the loop cleanly on Ctrl-C.
    pub fn shutdown_on_ctrl_c(&mut self) {
        let (tx, rx) = oneshot::channel();
        self.handle.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(());
            }
        });
        self.shutdown = Some(rx);
    }

    /// Bind every channel, then wait for each peer in turn.
    #[instrument(skip(self))]
    pub fn setup(&mut self) -> Result<(), NetworkError> {
        self.manager.listen()?;
        if let Some(control) = self.control.as_mut() {
            control.listen()?;
        }

        self.manager.setup()?;
        if let Some(control) = self.control.as_mut() {
            control.setup()?;
        }
        info!("all training channels connected");
        Ok(())
    }

    /// Close every channel.
    pub fn close(&mut self) {
        self.manager.close();
        if let Some(control) = self.control.as_mut() {
            control.close();
        }
    }

    /// Run one fixed-step frame.
    pub fn run_frame(&mut self) -> Result<TickResult, NetworkError> {
        self.check_fatal()?;
        self.handle_command()?;

        let result = self.battle.tick(&mut self.manager);
        self.frames += 1;

        self.check_fatal()?;
        Ok(result)
    }

    /// Run frames until the match ends, `max_frames` is reached or Ctrl-C.
    pub fn run(&mut self) -> Result<RunSummary, NetworkError> {
        let period = Duration::from_secs_f64(1.0 / self.config.tick_rate as f64);
        let mut pacing = if self.config.fast_forward {
            None
        } else {
            Some(self.handle.block_on(async move {
                let mut pacing = interval(period);
                pacing.set_missed_tick_behavior(MissedTickBehavior::Skip);
                pacing
            }))
        };

        info!(
            tick_rate = self.config.tick_rate,
            fast_forward = self.config.fast_forward,
            training = self.config.training,
            "battle loop started"
        );

        loop {
            if self.config.max_frames.is_some_and(|max| self.frames >= max) {
                info!(frames = self.frames, "frame limit reached");
                break;
            }
            if self.shutdown_requested() {
                info!("shutdown signal received");
                break;
            }
            if let Some(pacing) = pacing.as_mut() {
                self.handle.block_on(pacing.tick());
            }

            let result = self.run_frame()?;
            if let Some(winner) = result.match_over {
                info!(%winner, frames = self.frames, "match finished");
                break;
            }
        }

        Ok(RunSummary {
            frames: self.frames,
            winner: self.battle.match_over(),
            round_won: [self.battle.round_won(Side::P1), self.battle.round_won(Side::P2)],
            final_hash: self.battle.state_hash(),
            input_hash: self.battle.input_hash(),
        })
    }

    fn shutdown_requested(&mut self) -> bool {
        self.shutdown
            .as_mut()
            .is_some_and(|rx| rx.try_recv().is_ok())
    }

    fn check_fatal(&mut self) -> Result<(), NetworkError> {
        match self.fatal.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        }
    }

    fn handle_command(&mut self) -> Result<(), NetworkError> {
        let Some(control) = self.control.as_mut() else {
            return Ok(());
        };

        match control.process_command() {
            ControlCommand::None => {}
            ControlCommand::Reset => {
                info!("received RESET command");
                self.battle.reset_round(&mut self.manager);
            }
            ControlCommand::StateSave => {
                info!("received STATE_SAVE command");
                control.send_snapshot(&self.battle.save_state())?;
            }
            ControlCommand::StateLoad(snapshot) => {
                info!(frame = snapshot.frame_count, "received STATE_LOAD command");
                if let Err(e) = self.battle.load_state(&snapshot) {
                    warn!(error = %e, "snapshot rejected, battle unchanged");
                }
            }
            ControlCommand::P2Bot(use_bot) => {
                info!(use_bot, "received P2_BOT command");
                self.manager.set_p2_bot(use_bot);
            }
            ControlCommand::Seed(seed) => {
                info!(seed, "received SEED command");
                self.manager.reseed(seed);
                self.battle.reseed(seed);
            }
        }
        Ok(())
    }
}

/// Actor for `side`, wrapped in a spectator when one is configured.
fn build_actor(side: Side, config: &TrainingConfig, handle: &Handle, fatal: &FatalSender) -> Box<dyn Actor> {
    let (kind, channel, spectator) = match side {
        Side::P1 => (config.p1, &config.p1_channel, &config.p1_spectator),
        Side::P2 => (config.p2, &config.p2_channel, &config.p2_spectator),
    };

    let actor: Box<dyn Actor> = match kind {
        ActorKind::Remote => Box::new(RemoteActor::new(
            format!("{} remote", side),
            channel.address.clone(),
            channel.port,
            config.discipline,
            config.no_state,
            handle.clone(),
            fatal.clone(),
        )),
        ActorKind::Bot => Box::new(BotActor::queue_bot(side, config.bot_seed)),
        ActorKind::Human => {
            warn!(%side, "no local controller attached, human actor stays idle");
            Box::new(HumanActor::new(side, Box::new(IdleInput)))
        }
    };
    debug!(%side, %kind, "actor configured");

    match spectator {
        Some(ChannelAddr { address, port }) => Box::new(RemoteSpectator::new(
            actor,
            address.clone(),
            *port,
            config.discipline,
            handle.clone(),
            fatal.clone(),
        )),
        None => actor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tokio::runtime::Runtime;
    use crate::game::snapshot::BattleSnapshot;
    use crate::network::actor::SyncDiscipline;
    use crate::network::protocol::{encode_frame, ControlMessage};

    fn read_frame_blocking(stream: &mut TcpStream) -> Option<Vec<u8>> {
        let mut header = [0u8; 4];
        stream.read_exact(&mut header).ok()?;
        let mut body = vec![0u8; u32::from_be_bytes(header) as usize];
        stream.read_exact(&mut body).ok()?;
        Some(body)
    }

    #[test]
    fn test_local_run_without_training() {
        let runtime = Runtime::new().unwrap();
        let config = TrainingConfig {
            training: false,
            fast_forward: true,
            max_frames: Some(300),
            ..TrainingConfig::default()
        };
        let mut server = TrainingServer::new(config, runtime.handle().clone());
        assert!(!server.manager().is_enabled());
        server.setup().unwrap();

        let summary = server.run().unwrap();
        assert_eq!(summary.frames, 300);
        assert_eq!(summary.winner, None);
        assert_eq!(summary.final_hash, server.battle().state_hash());
        assert_eq!(summary.input_hash, server.battle().recorder().live().compute_hash());
        // Intro lasts 180 frames; the rest are Fight frames
        assert_eq!(server.battle().frame_count(), 300 - 180 - 2);
    }

    #[test]
    fn test_paced_run_is_deterministic() {
        let runtime = Runtime::new().unwrap();
        let run = |fast_forward: bool| {
            let config = TrainingConfig {
                training: false,
                vs_cpu: true,
                bot_seed: 21,
                fast_forward,
                tick_rate: 600,
                max_frames: Some(240),
                ..TrainingConfig::default()
            };
            let mut server = TrainingServer::new(config, runtime.handle().clone());
            let summary = server.run().unwrap();
            (summary.final_hash, summary.input_hash)
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn test_remote_training_session() {
        let runtime = Runtime::new().unwrap();
        let handle = runtime.handle().clone();
        let (fatal_tx, fatal_rx) = fatal_channel();

        let mut p1 = RemoteActor::new(
            "p1 remote",
            "127.0.0.1",
            0,
            SyncDiscipline::SyncedBlocking,
            false,
            handle.clone(),
            fatal_tx.clone(),
        );
        let p1_addr = p1.local_addr().unwrap();
        let mut control = RemoteControl::new("127.0.0.1", 0, SyncDiscipline::SyncedBlocking, handle.clone(), fatal_tx);
        let control_addr = control.local_addr().unwrap();

        let p2 = BotActor::queue_bot(Side::P2, 5);
        let manager = TrainingManager::new(true, Some(Box::new(p1)), Some(Box::new(p2)), 5);
        let config = TrainingConfig { fast_forward: true, max_frames: Some(40), ..TrainingConfig::default() };
        let mut server = TrainingServer::from_parts(config, manager, Some(control), fatal_rx, handle);

        let agent = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(p1_addr).unwrap();
            let mut frames = Vec::new();
            while let Some(body) = read_frame_blocking(&mut stream) {
                let state: serde_json::Value = serde_json::from_slice(&body).unwrap();
                frames.push(state["globalFrame"].as_i64().unwrap());
                if stream.write_all(&[0, 1, 0]).is_err() {
                    break;
                }
            }
            frames
        });

        let mut trainer = TcpStream::connect(control_addr).unwrap();
        let save = ControlMessage { command: 2, value: String::new() };
        trainer.write_all(&encode_frame(&serde_json::to_vec(&save).unwrap())).unwrap();

        server.setup().unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let summary = server.run().unwrap();
        assert_eq!(summary.frames, 40);
        server.close();

        let frames = agent.join().unwrap();
        assert_eq!(frames.first(), Some(&-1));
        assert!(frames.len() > 10);
        assert!(frames.iter().all(|frame| *frame >= -1));

        let body = read_frame_blocking(&mut trainer).unwrap();
        let snapshot = BattleSnapshot::from_json(std::str::from_utf8(&body).unwrap()).unwrap();
        assert_eq!(snapshot.frame_count, -1);
    }

    #[test]
    fn test_agent_disconnect_is_fatal() {
        let runtime = Runtime::new().unwrap();
        let handle = runtime.handle().clone();
        let (fatal_tx, fatal_rx) = fatal_channel();

        let mut p1 = RemoteActor::new(
            "p1 remote",
            "127.0.0.1",
            0,
            SyncDiscipline::SyncedBlocking,
            false,
            handle.clone(),
            fatal_tx,
        );
        let p1_addr = p1.local_addr().unwrap();
        let manager = TrainingManager::new(
            true,
            Some(Box::new(p1)),
            Some(Box::new(BotActor::queue_bot(Side::P2, 1))),
            1,
        );
        let config = TrainingConfig { fast_forward: true, max_frames: Some(1000), ..TrainingConfig::default() };
        let mut server = TrainingServer::from_parts(config, manager, None, fatal_rx, handle);

        let agent = std::thread::spawn(move || {
            let mut stream = TcpStream::connect(p1_addr).unwrap();
            read_frame_blocking(&mut stream)
        });
        server.setup().unwrap();

        let err = server.run().unwrap_err();
        assert!(matches!(err, NetworkError::Disconnected(_) | NetworkError::Io(_)));
        assert!(agent.join().unwrap().is_some());
        assert!(server.frames() < 1000);
    }
}
