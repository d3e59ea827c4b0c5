//! Socket Links
//!
//! Plumbing between the single-threaded simulation and the tokio runtime.
//! Each socket half is owned by a task; the simulation hands it work over
//! an unbounded channel and gets a oneshot reply back, which it either
//! polls (`try_recv`) or waits on (`blocking_recv`).
//!
//! Unrecoverable socket errors are reported on the fatal channel, which
//! the server loop drains once per frame.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn, error, debug};

use crate::game::input::InputBits;
use crate::network::protocol::{
    decode_action, read_frame, resolve_ipv4, ControlCommand, NetworkError, ACTION_MESSAGE_LEN,
};

/// Sender half of the fatal error channel.
pub type FatalSender = mpsc::UnboundedSender<NetworkError>;

/// Receiver half of the fatal error channel.
pub type FatalReceiver = mpsc::UnboundedReceiver<NetworkError>;

/// Create the fatal error channel.
pub fn fatal_channel() -> (FatalSender, FatalReceiver) {
    mpsc::unbounded_channel()
}

fn report_fatal(fatal: &FatalSender, label: &str, err: NetworkError) {
    error!(channel = label, error = %err, "fatal network error");
    // Receiver gone means the server is already shutting down
    let _ = fatal.send(err);
}

// =============================================================================
// REPLIES
// =============================================================================

/// Outcome of polling an outstanding reply.
#[derive(Debug, PartialEq, Eq)]
pub enum ReplyState<T> {
    /// Nothing outstanding
    Idle,
    /// Still in flight
    InFlight,
    /// Settled with a value
    Settled(T),
}

/// Poll an outstanding reply without blocking. Clears the slot once settled.
///
/// A dropped sender (task gone) clears the slot and reports `Idle`; the
/// owning task has already reported the failure.
pub fn poll_reply<T>(slot: &mut Option<oneshot::Receiver<T>>) -> ReplyState<T> {
    let Some(rx) = slot.as_mut() else {
        return ReplyState::Idle;
    };
    match rx.try_recv() {
        Ok(value) => {
            *slot = None;
            ReplyState::Settled(value)
        }
        Err(TryRecvError::Empty) => ReplyState::InFlight,
        Err(TryRecvError::Closed) => {
            *slot = None;
            ReplyState::Idle
        }
    }
}

/// Block the calling thread until the outstanding reply settles.
///
/// Must not be called from inside the runtime.
pub fn wait_reply<T>(slot: &mut Option<oneshot::Receiver<T>>) -> Option<T> {
    slot.take().and_then(|rx| rx.blocking_recv().ok())
}

// =============================================================================
// ENDPOINT
// =============================================================================

/// Listening address that accepts exactly one peer.
pub struct Endpoint {
    label: String,
    address: String,
    port: u16,
    listener: Option<TcpListener>,
}

impl Endpoint {
    /// Create an endpoint; nothing is bound yet.
    pub fn new(label: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            label: label.into(),
            address: address.into(),
            port,
            listener: None,
        }
    }

    /// Channel name used in logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Bind the listener (idempotent). Returns the bound address.
    pub async fn bind(&mut self) -> Result<SocketAddr, NetworkError> {
        if let Some(listener) = &self.listener {
            return Ok(listener.local_addr()?);
        }

        let addr = resolve_ipv4(&self.address, self.port).await?;
        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!(channel = %self.label, %local, "waiting for the agent to connect");
        self.listener = Some(listener);
        Ok(local)
    }

    /// Accept the peer, binding first if needed. The listener is dropped afterwards.
    pub async fn accept(&mut self) -> Result<TcpStream, NetworkError> {
        self.bind().await?;
        let listener = self
            .listener
            .take()
            .ok_or_else(|| NetworkError::Protocol(format!("{} endpoint not bound", self.label)))?;

        let (stream, peer) = listener.accept().await?;
        stream.set_nodelay(true)?;
        info!(channel = %self.label, %peer, "agent connection received");
        Ok(stream)
    }
}

// =============================================================================
// FRAME WRITER
// =============================================================================

struct Outgoing {
    bytes: Vec<u8>,
    done: oneshot::Sender<()>,
}

/// Task owning the write half of a socket.
pub struct FrameWriter {
    tx: mpsc::UnboundedSender<Outgoing>,
    task: JoinHandle<()>,
}

impl FrameWriter {
    /// Spawn the writer task on `handle`.
    pub fn spawn(handle: &Handle, label: String, mut half: OwnedWriteHalf, fatal: FatalSender) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Outgoing>();

        let task = handle.spawn(async move {
            while let Some(Outgoing { bytes, done }) = rx.recv().await {
                if let Err(e) = half.write_all(&bytes).await {
                    report_fatal(&fatal, &label, NetworkError::Io(e));
                    break;
                }
                debug!(channel = %label, bytes = bytes.len(), "message sent");
                let _ = done.send(());
            }
        });

        Self { tx, task }
    }

    /// Queue bytes for sending. The reply settles once they are written.
    pub fn send(&self, bytes: Vec<u8>) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        // A closed channel drops `done`, which settles the reply as closed
        let _ = self.tx.send(Outgoing { bytes, done });
        rx
    }

    /// Stop the task; the socket half is shut down when dropped.
    pub fn close(self) {
        self.task.abort();
    }
}

// =============================================================================
// ACTION READER
// =============================================================================

/// Task owning the read half of an actor socket.
///
/// Each request reads one action message with a single `read`.
pub struct ActionReader {
    tx: mpsc::UnboundedSender<oneshot::Sender<InputBits>>,
    task: JoinHandle<()>,
}

impl ActionReader {
    /// Spawn the reader task on `handle`.
    pub fn spawn(handle: &Handle, label: String, mut half: OwnedReadHalf, fatal: FatalSender) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<oneshot::Sender<InputBits>>();

        let task = handle.spawn(async move {
            while let Some(reply) = rx.recv().await {
                let mut buf = [0u8; ACTION_MESSAGE_LEN];
                match half.read(&mut buf).await {
                    Ok(0) => {
                        report_fatal(&fatal, &label, NetworkError::Disconnected(label.clone()));
                        break;
                    }
                    Ok(n) => {
                        if n != ACTION_MESSAGE_LEN {
                            warn!(
                                channel = %label,
                                received = n,
                                expected = ACTION_MESSAGE_LEN,
                                "abnormal action message length"
                            );
                        }
                        let _ = reply.send(decode_action(&buf[..n]));
                    }
                    Err(e) => {
                        report_fatal(&fatal, &label, NetworkError::Io(e));
                        break;
                    }
                }
            }
        });

        Self { tx, task }
    }

    /// Ask for the next action message.
    pub fn request(&self) -> oneshot::Receiver<InputBits> {
        let (reply, rx) = oneshot::channel();
        let _ = self.tx.send(reply);
        rx
    }

    /// Stop the task.
    pub fn close(self) {
        self.task.abort();
    }
}

// =============================================================================
// COMMAND READER
// =============================================================================

/// Task reading control frames as they arrive.
///
/// Malformed messages are logged and dropped.
pub struct CommandReader {
    rx: mpsc::UnboundedReceiver<ControlCommand>,
    task: JoinHandle<()>,
}

impl CommandReader {
    /// Spawn the reader task on `handle`.
    pub fn spawn(handle: &Handle, label: String, mut half: OwnedReadHalf, fatal: FatalSender) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let task = handle.spawn(async move {
            loop {
                let body = match read_frame(&mut half).await {
                    Ok(body) => body,
                    Err(NetworkError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        report_fatal(&fatal, &label, NetworkError::Disconnected(label.clone()));
                        break;
                    }
                    Err(e) => {
                        report_fatal(&fatal, &label, e);
                        break;
                    }
                };

                match ControlCommand::from_json(&body) {
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(channel = %label, error = %e, "ignoring malformed control message"),
                }
            }
        });

        Self { rx, task }
    }

    /// Next complete command, if one has arrived.
    pub fn try_next(&mut self) -> Option<ControlCommand> {
        self.rx.try_recv().ok()
    }

    /// Stop the task.
    pub fn close(self) {
        self.task.abort();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::time::Duration;
    use tokio::runtime::Runtime;

    /// Accept a std client on a fresh endpoint; returns (server stream, client).
    fn connect_pair(runtime: &Runtime) -> (TcpStream, std::net::TcpStream) {
        let mut endpoint = Endpoint::new("test", "127.0.0.1", 0);
        let addr = runtime.block_on(endpoint.bind()).unwrap();
        let client = std::net::TcpStream::connect(addr).unwrap();
        let server = runtime.block_on(endpoint.accept()).unwrap();
        (server, client)
    }

    #[test]
    fn test_poll_reply_states() {
        let mut slot: Option<oneshot::Receiver<u8>> = None;
        assert_eq!(poll_reply(&mut slot), ReplyState::Idle);

        let (tx, rx) = oneshot::channel();
        slot = Some(rx);
        assert_eq!(poll_reply(&mut slot), ReplyState::InFlight);
        tx.send(7).unwrap();
        assert_eq!(poll_reply(&mut slot), ReplyState::Settled(7));
        assert!(slot.is_none());

        let (tx, rx) = oneshot::channel::<u8>();
        slot = Some(rx);
        drop(tx);
        assert_eq!(poll_reply(&mut slot), ReplyState::Idle);
    }

    #[test]
    fn test_action_reader_roundtrip() {
        let runtime = Runtime::new().unwrap();
        let (server, mut client) = connect_pair(&runtime);
        let (read_half, _write_half) = server.into_split();
        let (fatal_tx, mut fatal_rx) = fatal_channel();
        let reader = ActionReader::spawn(runtime.handle(), "p1".into(), read_half, fatal_tx);

        client.write_all(&[1, 0, 1]).unwrap();
        let mut slot = Some(reader.request());
        assert_eq!(wait_reply(&mut slot), Some(InputBits::LEFT | InputBits::ATTACK));

        // Peer gone: the request never settles with a value and a fatal is raised
        drop(client);
        let mut slot = Some(reader.request());
        assert_eq!(wait_reply(&mut slot), None);
        assert!(matches!(fatal_rx.blocking_recv(), Some(NetworkError::Disconnected(_))));
        reader.close();
    }

    #[test]
    fn test_short_action_keeps_connection() {
        let runtime = Runtime::new().unwrap();
        let (server, mut client) = connect_pair(&runtime);
        let (read_half, _write_half) = server.into_split();
        let (fatal_tx, mut fatal_rx) = fatal_channel();
        let reader = ActionReader::spawn(runtime.handle(), "p2".into(), read_half, fatal_tx);

        client.write_all(&[0, 1]).unwrap();
        client.flush().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let mut slot = Some(reader.request());
        assert_eq!(wait_reply(&mut slot), Some(InputBits::RIGHT));

        client.write_all(&[0, 0, 1]).unwrap();
        let mut slot = Some(reader.request());
        assert_eq!(wait_reply(&mut slot), Some(InputBits::ATTACK));
        assert!(fatal_rx.try_recv().is_err());
    }

    #[test]
    fn test_frame_writer_prefixes_length() {
        let runtime = Runtime::new().unwrap();
        let (server, mut client) = connect_pair(&runtime);
        let (_read_half, write_half) = server.into_split();
        let (fatal_tx, _fatal_rx) = fatal_channel();
        let writer = FrameWriter::spawn(runtime.handle(), "spectator".into(), write_half, fatal_tx);

        let mut slot = Some(writer.send(crate::network::protocol::encode_frame(b"hello")));
        assert_eq!(wait_reply(&mut slot), Some(()));

        let mut received = [0u8; 9];
        client.read_exact(&mut received).unwrap();
        assert_eq!(&received[..4], &[0, 0, 0, 5]);
        assert_eq!(&received[4..], b"hello");
        writer.close();
    }

    #[test]
    fn test_command_reader_skips_malformed() {
        let runtime = Runtime::new().unwrap();
        let (server, mut client) = connect_pair(&runtime);
        let (read_half, _write_half) = server.into_split();
        let (fatal_tx, _fatal_rx) = fatal_channel();
        let mut reader = CommandReader::spawn(runtime.handle(), "control".into(), read_half, fatal_tx);

        assert_eq!(reader.try_next(), None);

        use crate::network::protocol::encode_frame;
        client.write_all(&encode_frame(b"garbage")).unwrap();
        client.write_all(&encode_frame(br#"{"command":1,"value":""}"#)).unwrap();

        let mut command = None;
        for _ in 0..100 {
            command = reader.try_next();
            if command.is_some() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(command, Some(ControlCommand::Reset));
        assert_eq!(reader.try_next(), None);
        reader.close();
    }
}
