//! Training Configuration
//!
//! Everything the binary needs to wire up a session, read from
//! `FOOTSIES_*` environment variables on top of the defaults.

use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::game::battle::BattleConfig;
use crate::network::actor::SyncDiscipline;
use crate::TICK_RATE;

/// Who plays a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    /// External agent over TCP
    Remote,
    /// Seeded scripted bot
    Bot,
    /// Local controller (idle when headless)
    Human,
}

impl FromStr for ActorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "remote" => Ok(ActorKind::Remote),
            "bot" => Ok(ActorKind::Bot),
            "human" | "player" => Ok(ActorKind::Human),
            other => Err(format!("unknown actor kind '{}'", other)),
        }
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorKind::Remote => write!(f, "remote"),
            ActorKind::Bot => write!(f, "bot"),
            ActorKind::Human => write!(f, "human"),
        }
    }
}

/// Address and port of one listening channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAddr {
    /// Hostname or IPv4 literal
    pub address: String,
    /// TCP port
    pub port: u16,
}

impl ChannelAddr {
    /// Build from parts.
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self { address: address.into(), port }
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Actors drive the fighters; intro/KO/end pauses are skipped
    pub training: bool,
    /// Timing discipline for every remote channel
    pub discipline: SyncDiscipline,
    /// Remote actors receive no states, only send actions
    pub no_state: bool,
    /// Actor for p1
    pub p1: ActorKind,
    /// Actor for p2
    pub p2: ActorKind,
    /// Listening channel for a remote p1
    pub p1_channel: ChannelAddr,
    /// Listening channel for a remote p2
    pub p2_channel: ChannelAddr,
    /// Spectator channel wrapped around p1, if any
    pub p1_spectator: Option<ChannelAddr>,
    /// Spectator channel wrapped around p2, if any
    pub p2_spectator: Option<ChannelAddr>,
    /// Remote control channel, if any
    pub remote_control: Option<ChannelAddr>,
    /// Scripted p2 opponent outside training
    pub vs_cpu: bool,
    /// Run frames back to back without wall-clock pacing
    pub fast_forward: bool,
    /// Replay the previous round's inputs from the next Intro on
    pub replay_last_round: bool,
    /// Seed for every scripted bot
    pub bot_seed: u64,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Frames per second when paced
    pub tick_rate: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            training: true,
            discipline: SyncDiscipline::SyncedNonBlocking,
            no_state: false,
            p1: ActorKind::Remote,
            p2: ActorKind::Bot,
            p1_channel: ChannelAddr::new("localhost", 11000),
            p2_channel: ChannelAddr::new("localhost", 11001),
            p1_spectator: None,
            p2_spectator: None,
            remote_control: Some(ChannelAddr::new("localhost", 11002)),
            vs_cpu: false,
            fast_forward: false,
            replay_last_round: false,
            bot_seed: 0,
            max_frames: None,
            tick_rate: TICK_RATE,
        }
    }
}

impl TrainingConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup (`FOOTSIES_*` keys).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(default)
        };

        config.training = flag("FOOTSIES_TRAINING", config.training);
        config.no_state = flag("FOOTSIES_NO_STATE", config.no_state);
        config.vs_cpu = flag("FOOTSIES_VS_CPU", config.vs_cpu);
        config.fast_forward = flag("FOOTSIES_FAST_FORWARD", config.fast_forward);
        config.replay_last_round = flag("FOOTSIES_REPLAY_LAST_ROUND", config.replay_last_round);

        config.discipline = parsed(&lookup, "FOOTSIES_SYNC").unwrap_or(config.discipline);
        config.p1 = parsed(&lookup, "FOOTSIES_P1").unwrap_or(config.p1);
        config.p2 = parsed(&lookup, "FOOTSIES_P2").unwrap_or(config.p2);
        config.bot_seed = parsed(&lookup, "FOOTSIES_SEED").unwrap_or(config.bot_seed);
        config.max_frames = parsed(&lookup, "FOOTSIES_MAX_FRAMES").or(config.max_frames);
        config.tick_rate = parsed(&lookup, "FOOTSIES_TICK_RATE")
            .filter(|rate| *rate > 0)
            .unwrap_or(config.tick_rate);

        if let Some(address) = lookup("FOOTSIES_ADDRESS") {
            config.p1_channel.address = address.clone();
            config.p2_channel.address = address.clone();
            if let Some(control) = config.remote_control.as_mut() {
                control.address = address;
            }
        }
        config.p1_channel.port = parsed(&lookup, "FOOTSIES_P1_PORT").unwrap_or(config.p1_channel.port);
        config.p2_channel.port = parsed(&lookup, "FOOTSIES_P2_PORT").unwrap_or(config.p2_channel.port);

        let address = config.p1_channel.address.clone();
        if let Some(port) = parsed(&lookup, "FOOTSIES_P1_SPECTATOR_PORT") {
            config.p1_spectator = Some(ChannelAddr::new(address.clone(), port));
        }
        if let Some(port) = parsed(&lookup, "FOOTSIES_P2_SPECTATOR_PORT") {
            config.p2_spectator = Some(ChannelAddr::new(address.clone(), port));
        }
        match lookup("FOOTSIES_CONTROL_PORT").as_deref() {
            Some("off") | Some("0") => config.remote_control = None,
            Some(_) => {
                if let Some(port) = parsed(&lookup, "FOOTSIES_CONTROL_PORT") {
                    config.remote_control = Some(ChannelAddr::new(address, port));
                }
            }
            None => {}
        }

        config
    }

    /// Battle settings implied by this session.
    pub fn battle_config(&self) -> BattleConfig {
        BattleConfig {
            training: self.training,
            vs_cpu: self.vs_cpu,
            replay_last_round: self.replay_last_round,
            bot_seed: self.bot_seed,
            ..BattleConfig::default()
        }
    }
}

/// Parse `key` if set; invalid values are logged and ignored.
fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring invalid setting");
            None
        }
    }
}
