//! Remote Actor
//!
//! An external agent connected over TCP. The server sends it each
//! environment state as a framed JSON message and reads back 3-byte
//! action messages.

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{info, debug, instrument};

use crate::game::input::InputBits;
use crate::game::state::EnvironmentState;
use crate::network::actor::{Actor, SyncDiscipline};
use crate::network::link::{
    poll_reply, wait_reply, ActionReader, Endpoint, FatalSender, FrameWriter, ReplyState,
};
use crate::network::protocol::{frame_json, NetworkError};

/// Sockets owned once the agent has connected.
struct Connection {
    reader: ActionReader,
    writer: FrameWriter,
}

/// Actor backed by a remote agent.
pub struct RemoteActor {
    endpoint: Endpoint,
    discipline: SyncDiscipline,
    no_state: bool,
    handle: Handle,
    fatal: FatalSender,

    connection: Option<Connection>,
    input: InputBits,
    input_request: Option<oneshot::Receiver<InputBits>>,
    state_send: Option<oneshot::Receiver<()>>,
}

impl RemoteActor {
    /// Create an actor listening on `address:port` once set up.
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        discipline: SyncDiscipline,
        no_state: bool,
        handle: Handle,
        fatal: FatalSender,
    ) -> Self {
        Self {
            endpoint: Endpoint::new(name, address, port),
            discipline,
            no_state,
            handle,
            fatal,
            connection: None,
            input: InputBits::NONE,
            input_request: None,
            state_send: None,
        }
    }

    /// Bound address (binds if needed).
    pub fn local_addr(&mut self) -> Result<std::net::SocketAddr, NetworkError> {
        self.handle.block_on(self.endpoint.bind())
    }

    /// Whether the agent has connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Move a settled input request into `input`.
    fn settle_input(&mut self) {
        if let ReplyState::Settled(input) = poll_reply(&mut self.input_request) {
            self.input = input;
        }
    }
}

impl Actor for RemoteActor {
    fn name(&self) -> &str {
        self.endpoint.label()
    }

    fn listen(&mut self) -> Result<(), NetworkError> {
        self.local_addr().map(|_| ())
    }

    #[instrument(skip(self), fields(actor = %self.endpoint.label()))]
    fn setup(&mut self) -> Result<(), NetworkError> {
        if self.connection.is_some() {
            return Ok(());
        }

        let stream = self.handle.block_on(self.endpoint.accept())?;
        let (read_half, write_half) = stream.into_split();
        let label = self.endpoint.label().to_string();

        self.connection = Some(Connection {
            reader: ActionReader::spawn(&self.handle, label.clone(), read_half, self.fatal.clone()),
            writer: FrameWriter::spawn(&self.handle, label, write_half, self.fatal.clone()),
        });
        Ok(())
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.reader.close();
            connection.writer.close();
            info!(actor = %self.endpoint.label(), "connection closed");
        }
        self.input_request = None;
        self.state_send = None;
    }

    fn update_current_state(&mut self, state: &EnvironmentState, _round_over: bool) {
        if self.no_state {
            return;
        }
        let Some(connection) = &self.connection else {
            return;
        };

        let framed = match frame_json(state) {
            Ok(framed) => framed,
            Err(e) => {
                debug!(actor = %self.endpoint.label(), error = %e, "state not serialized");
                return;
            }
        };

        debug!(actor = %self.endpoint.label(), frame = state.global_frame, "sending state");
        self.state_send = Some(connection.writer.send(framed));
        if self.discipline.blocks() {
            wait_reply(&mut self.state_send);
        }
    }

    fn request_next_input(&mut self) {
        self.settle_input();
        if self.input_request.is_some() {
            debug!(actor = %self.endpoint.label(), "input already requested, ignoring");
            return;
        }
        let Some(connection) = &self.connection else {
            return;
        };

        self.input_request = Some(connection.reader.request());
        if self.discipline.blocks() {
            if let Some(input) = wait_reply(&mut self.input_request) {
                self.input = input;
            }
        }
    }

    fn ready(&mut self) -> bool {
        if self.connection.is_none() {
            return false;
        }
        self.settle_input();
        !self.discipline.gates_frames() || self.input_request.is_none()
    }

    fn input(&mut self) -> InputBits {
        self.settle_input();
        self.input
    }
}
