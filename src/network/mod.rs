//! Network Layer
//!
//! TCP channels that let external agents drive or watch the battle.
//! This layer is **non-deterministic** - all battle logic runs through `game/`.

pub mod actor;
pub mod config;
pub mod control;
pub mod link;
pub mod protocol;
pub mod remote;
pub mod server;
pub mod spectator;
pub mod training;

pub use actor::{Actor, BotActor, HumanActor, SyncDiscipline};
pub use config::{ActorKind, ChannelAddr, TrainingConfig};
pub use control::RemoteControl;
pub use protocol::{ControlCommand, ControlError, NetworkError};
pub use remote::RemoteActor;
pub use server::{RunSummary, TrainingServer};
pub use spectator::RemoteSpectator;
pub use training::TrainingManager;
