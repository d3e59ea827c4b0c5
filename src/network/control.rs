//! Remote Control
//!
//! Side channel for an external trainer to reset the round, save or load
//! snapshots, swap the p2 actor and reseed the bots. Polled once per frame;
//! never blocks the simulation waiting for a command.

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{info, debug, instrument};

use crate::game::snapshot::BattleSnapshot;
use crate::network::actor::SyncDiscipline;
use crate::network::link::{wait_reply, CommandReader, Endpoint, FatalSender, FrameWriter};
use crate::network::protocol::{frame_json, ControlCommand, NetworkError};

/// Remote control channel.
pub struct RemoteControl {
    endpoint: Endpoint,
    discipline: SyncDiscipline,
    handle: Handle,
    fatal: FatalSender,

    reader: Option<CommandReader>,
    writer: Option<FrameWriter>,
    snapshot_send: Option<oneshot::Receiver<()>>,
}

impl RemoteControl {
    /// Create a control channel listening on `address:port` once set up.
    pub fn new(
        address: impl Into<String>,
        port: u16,
        discipline: SyncDiscipline,
        handle: Handle,
        fatal: FatalSender,
    ) -> Self {
        Self {
            endpoint: Endpoint::new("remote control", address, port),
            discipline,
            handle,
            fatal,
            reader: None,
            writer: None,
            snapshot_send: None,
        }
    }

    /// Bound address (binds if needed).
    pub fn local_addr(&mut self) -> Result<std::net::SocketAddr, NetworkError> {
        self.handle.block_on(self.endpoint.bind())
    }

    /// Bind without waiting for the peer.
    pub fn listen(&mut self) -> Result<(), NetworkError> {
        self.local_addr().map(|_| ())
    }

    /// Wait for the trainer to connect.
    #[instrument(skip(self))]
    pub fn setup(&mut self) -> Result<(), NetworkError> {
        if self.reader.is_some() {
            return Ok(());
        }

        let stream = self.handle.block_on(self.endpoint.accept())?;
        let (read_half, write_half) = stream.into_split();
        let label = self.endpoint.label().to_string();
        self.reader = Some(CommandReader::spawn(&self.handle, label.clone(), read_half, self.fatal.clone()));
        self.writer = Some(FrameWriter::spawn(&self.handle, label, write_half, self.fatal.clone()));
        Ok(())
    }

    /// Release the connection.
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.close();
        }
        if let Some(writer) = self.writer.take() {
            writer.close();
        }
        self.snapshot_send = None;
        info!("remote control closed");
    }

    /// Next command if a complete message has already arrived, else `None`.
    pub fn process_command(&mut self) -> ControlCommand {
        let command = self
            .reader
            .as_mut()
            .and_then(CommandReader::try_next)
            .unwrap_or(ControlCommand::None);

        if command != ControlCommand::None {
            debug!(ordinal = command.ordinal(), "control command received");
        }
        command
    }

    /// Reply to STATE_SAVE with a framed snapshot.
    pub fn send_snapshot(&mut self, snapshot: &BattleSnapshot) -> Result<(), NetworkError> {
        let Some(writer) = &self.writer else {
            return Ok(());
        };

        self.snapshot_send = Some(writer.send(frame_json(snapshot)?));
        if self.discipline.blocks() {
            wait_reply(&mut self.snapshot_send);
        }
        Ok(())
    }
}
