//! Protocol Messages
//!
//! Wire format for the training channels. Every channel is a plain TCP
//! connection:
//!
//! - server -> peer: `[u32 BE length][UTF-8 JSON]`
//! - actor peer -> server: 3 raw action bytes `{left, right, attack}`
//! - control peer -> server: length-prefixed `{"command": <int>, "value": <string>}`

use std::net::SocketAddr;

use serde::{Serialize, Deserialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::lookup_host;

use crate::game::input::InputBits;
use crate::game::snapshot::{BattleSnapshot, SnapshotError};

/// Size of the length prefix on framed messages.
pub const FRAME_HEADER_LEN: usize = 4;

/// Size of an action message.
pub const ACTION_MESSAGE_LEN: usize = 3;

/// Largest inbound frame accepted (16 MiB).
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

// =============================================================================
// ERRORS
// =============================================================================

/// Network layer errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Hostname has no IPv4 address.
    #[error("could not find any suitable IPv4 address for '{0}'")]
    NoIpv4Address(String),

    /// Outbound message could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Peer closed the connection.
    #[error("{0} peer has ceased communication")]
    Disconnected(String),

    /// Peer sent something the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Control message decoding errors.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Envelope is not valid JSON.
    #[error("malformed control message: {0}")]
    Json(#[from] serde_json::Error),

    /// Command ordinal outside the known set.
    #[error("unknown command ordinal {0}")]
    UnknownCommand(i32),

    /// STATE_LOAD payload rejected.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    /// SEED payload is not an integer.
    #[error("invalid seed '{0}'")]
    InvalidSeed(String),
}

// =============================================================================
// FRAMING
// =============================================================================

/// Prefix `body` with its length as a big-endian u32.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
    framed.extend_from_slice(body);
    framed
}

/// Serialize `value` to JSON and frame it.
pub fn frame_json<T: Serialize>(value: &T) -> Result<Vec<u8>, NetworkError> {
    let json = serde_json::to_vec(value)?;
    Ok(encode_frame(&json))
}

/// Read one length-prefixed frame.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, NetworkError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    reader.read_exact(&mut header).await?;

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NetworkError::Protocol(format!("frame of {} bytes exceeds limit", len)));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Decode an action message. Missing bytes count as not pressed.
pub fn decode_action(bytes: &[u8]) -> InputBits {
    let mut padded = [0u8; ACTION_MESSAGE_LEN];
    let n = bytes.len().min(ACTION_MESSAGE_LEN);
    padded[..n].copy_from_slice(&bytes[..n]);
    InputBits::from_action_bytes(padded)
}

// =============================================================================
// CONTROL MESSAGES
// =============================================================================

/// Control envelope as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Command ordinal
    pub command: i32,
    /// Command argument
    #[serde(default)]
    pub value: String,
}

/// Decoded remote-control command.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// No message available
    None,
    /// Restart the round from Intro
    Reset,
    /// Reply with the current snapshot
    StateSave,
    /// Overwrite the battle with a snapshot
    StateLoad(Box<BattleSnapshot>),
    /// Use the scripted bot for p2 (`true`) or the configured actor
    P2Bot(bool),
    /// Reseed the scripted bots
    Seed(u64),
}

impl ControlCommand {
    /// Wire ordinal.
    pub fn ordinal(&self) -> i32 {
        match self {
            ControlCommand::None => 0,
            ControlCommand::Reset => 1,
            ControlCommand::StateSave => 2,
            ControlCommand::StateLoad(_) => 3,
            ControlCommand::P2Bot(_) => 4,
            ControlCommand::Seed(_) => 5,
        }
    }

    /// Decode an envelope.
    pub fn from_message(message: &ControlMessage) -> Result<Self, ControlError> {
        let command = match message.command {
            0 => ControlCommand::None,
            1 => ControlCommand::Reset,
            2 => ControlCommand::StateSave,
            3 => ControlCommand::StateLoad(Box::new(BattleSnapshot::from_json(&message.value)?)),
            4 => ControlCommand::P2Bot(message.value.to_lowercase() == "true"),
            5 => {
                let seed = message
                    .value
                    .trim()
                    .parse()
                    .map_err(|_| ControlError::InvalidSeed(message.value.clone()))?;
                ControlCommand::Seed(seed)
            }
            other => return Err(ControlError::UnknownCommand(other)),
        };
        Ok(command)
    }

    /// Decode a frame body.
    pub fn from_json(json: &[u8]) -> Result<Self, ControlError> {
        let message: ControlMessage = serde_json::from_slice(json)?;
        Self::from_message(&message)
    }
}

// =============================================================================
// ADDRESSES
// =============================================================================

/// First IPv4 address `address` resolves to.
pub async fn resolve_ipv4(address: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    let mut candidates = lookup_host((address, port)).await?;
    candidates
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| NetworkError::NoIpv4Address(address.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use crate::game::state::EnvironmentState;

    #[test]
    fn test_environment_state_frame() {
        let state = EnvironmentState { global_frame: 120, ..EnvironmentState::default() };
        let framed = frame_json(&state).unwrap();

        let json = serde_json::to_vec(&state).unwrap();
        let len = u32::from_be_bytes([framed[0], framed[1], framed[2], framed[3]]);
        assert_eq!(len as usize, json.len());
        assert_eq!(&framed[FRAME_HEADER_LEN..], &json[..]);

        let decoded: serde_json::Value = serde_json::from_slice(&framed[FRAME_HEADER_LEN..]).unwrap();
        assert_eq!(decoded["globalFrame"], 120);
    }

    #[test]
    fn test_decode_action() {
        assert_eq!(decode_action(&[1, 0, 1]), InputBits::LEFT | InputBits::ATTACK);
        assert_eq!(decode_action(&[0, 9, 0]), InputBits::RIGHT);
        assert_eq!(decode_action(&[0, 0, 0]), InputBits::NONE);
        // Short messages keep what arrived
        assert_eq!(decode_action(&[1]), InputBits::LEFT);
        assert_eq!(decode_action(&[]), InputBits::NONE);
    }

    #[test]
    fn test_control_commands() {
        let decode = |json: &str| ControlCommand::from_json(json.as_bytes());

        assert_eq!(decode(r#"{"command":0,"value":""}"#).unwrap(), ControlCommand::None);
        assert_eq!(decode(r#"{"command":1,"value":""}"#).unwrap(), ControlCommand::Reset);
        assert_eq!(decode(r#"{"command":2}"#).unwrap(), ControlCommand::StateSave);
        assert_eq!(decode(r#"{"command":4,"value":"TRUE"}"#).unwrap(), ControlCommand::P2Bot(true));
        assert_eq!(decode(r#"{"command":4,"value":"no"}"#).unwrap(), ControlCommand::P2Bot(false));
        assert_eq!(decode(r#"{"command":5,"value":"42"}"#).unwrap(), ControlCommand::Seed(42));

        assert!(matches!(decode(r#"{"command":9,"value":""}"#), Err(ControlError::UnknownCommand(9))));
        assert!(matches!(decode(r#"{"command":5,"value":"x"}"#), Err(ControlError::InvalidSeed(_))));
        assert!(matches!(decode(r#"{"command":3,"value":"{}"}"#), Err(ControlError::Snapshot(_))));
        assert!(matches!(decode("not json"), Err(ControlError::Json(_))));
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ControlCommand::Reset.ordinal(), 1);
        assert_eq!(ControlCommand::P2Bot(true).ordinal(), 4);
        assert_eq!(ControlCommand::Seed(0).ordinal(), 5);
    }

    #[tokio::test]
    async fn test_read_frame_loopback() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let writer = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            let message = ControlMessage { command: 1, value: String::new() };
            stream.write_all(&frame_json(&message).unwrap()).await.unwrap();
            stream.write_all(&encode_frame(b"{}")).await.unwrap();
        });

        let (mut stream, _) = listener.accept().await.unwrap();
        let first = read_frame(&mut stream).await.unwrap();
        assert_eq!(ControlCommand::from_json(&first).unwrap(), ControlCommand::Reset);
        let second = read_frame(&mut stream).await.unwrap();
        assert_eq!(second, b"{}");
        writer.await.unwrap();

        // Peer closed
        assert!(matches!(read_frame(&mut stream).await, Err(NetworkError::Io(_))));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        assert!(matches!(read_frame(&mut bytes).await, Err(NetworkError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_resolve_ipv4() {
        let addr = resolve_ipv4("127.0.0.1", 11000).await.unwrap();
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 11000);
        assert!(matches!(
            resolve_ipv4("::1", 11000).await,
            Err(NetworkError::NoIpv4Address(_))
        ));
    }
}
