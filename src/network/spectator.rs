//! Remote Spectator
//!
//! Wraps another actor: every input call is forwarded to it, and each
//! environment state is additionally streamed to a passive TCP peer that
//! never sends input.

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{info, warn, debug};

use crate::game::input::InputBits;
use crate::game::state::EnvironmentState;
use crate::network::actor::{Actor, SyncDiscipline};
use crate::network::link::{poll_reply, wait_reply, Endpoint, FatalSender, FrameWriter, ReplyState};
use crate::network::protocol::{frame_json, NetworkError};

/// Actor decorator that streams states to a spectator.
pub struct RemoteSpectator {
    inner: Box<dyn Actor>,
    endpoint: Endpoint,
    discipline: SyncDiscipline,
    handle: Handle,
    fatal: FatalSender,

    writer: Option<FrameWriter>,
    state_send: Option<oneshot::Receiver<()>>,
}

impl RemoteSpectator {
    /// Decorate `inner`; the spectator connects on `address:port`.
    pub fn new(
        inner: Box<dyn Actor>,
        address: impl Into<String>,
        port: u16,
        discipline: SyncDiscipline,
        handle: Handle,
        fatal: FatalSender,
    ) -> Self {
        let label = format!("{} spectator", inner.name());
        Self {
            inner,
            endpoint: Endpoint::new(label, address, port),
            discipline,
            handle,
            fatal,
            writer: None,
            state_send: None,
        }
    }

    /// Bound spectator address (binds if needed).
    pub fn local_addr(&mut self) -> Result<std::net::SocketAddr, NetworkError> {
        self.handle.block_on(self.endpoint.bind())
    }

    /// Give back the wrapped actor.
    pub fn into_inner(mut self) -> Box<dyn Actor> {
        self.close_own();
        self.inner
    }

    fn close_own(&mut self) {
        if let Some(writer) = self.writer.take() {
            writer.close();
            info!(actor = %self.endpoint.label(), "connection closed");
        }
        self.state_send = None;
    }
}

impl Actor for RemoteSpectator {
    fn name(&self) -> &str {
        self.endpoint.label()
    }

    fn listen(&mut self) -> Result<(), NetworkError> {
        self.inner.listen()?;
        self.local_addr().map(|_| ())
    }

    fn setup(&mut self) -> Result<(), NetworkError> {
        self.inner.setup()?;
        if self.writer.is_some() {
            return Ok(());
        }

        let stream = self.handle.block_on(self.endpoint.accept())?;
        // Spectators never send input; the read half is dropped
        let (_read_half, write_half) = stream.into_split();
        self.writer = Some(FrameWriter::spawn(
            &self.handle,
            self.endpoint.label().to_string(),
            write_half,
            self.fatal.clone(),
        ));
        Ok(())
    }

    fn close(&mut self) {
        self.inner.close();
        self.close_own();
    }

    fn update_current_state(&mut self, state: &EnvironmentState, round_over: bool) {
        self.inner.update_current_state(state, round_over);

        let Some(writer) = &self.writer else {
            return;
        };
        match frame_json(state) {
            Ok(framed) => {
                debug!(actor = %self.endpoint.label(), frame = state.global_frame, "sending state");
                self.state_send = Some(writer.send(framed));
                if self.discipline.blocks() {
                    wait_reply(&mut self.state_send);
                }
            }
            Err(e) => warn!(actor = %self.endpoint.label(), error = %e, "state not serialized"),
        }
    }

    fn request_next_input(&mut self) {
        self.inner.request_next_input();
    }

    fn ready(&mut self) -> bool {
        if self.writer.is_none() || !self.inner.ready() {
            return false;
        }
        !matches!(poll_reply(&mut self.state_send), ReplyState::InFlight)
    }

    fn input(&mut self) -> InputBits {
        self.inner.input()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn reseed(&mut self, seed: u64) {
        self.inner.reseed(seed);
    }
}
