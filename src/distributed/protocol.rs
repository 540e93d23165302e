//! Participant wire protocol
//!
//! This module defines the messages exchanged between the coordinator and the
//! workers over TCP. The protocol uses MessagePack (rmp-serde) for compact binary
//! serialization.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker
//!     |                              |
//!     |<------- HELLO(id) -----------|
//!     |-------- WELCOME ------------>|
//!     |                              |
//!     |<------- DATA(tag, value) ----|   partial result
//!     |                              |
//!     |<------- DATA(barrier) -------|   shutdown barrier
//!     |-------- DATA(barrier) ------>|
//! ```
//!
//! A coordinator that cannot accept a HELLO answers with REJECT and drops the
//! connection.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use crate::distributed::group::ParticipantId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame accepted from a peer
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Message tag used to match sends with receives
pub type Tag = u32;

/// Default tag for partial results
pub const PARTIAL_RESULT_TAG: Tag = 123;

/// Tag reserved for the shutdown barrier
pub const BARRIER_TAG: Tag = u32::MAX;

/// Protocol message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Handshake (Worker → Coordinator)
    Hello(HelloMessage),

    /// Handshake accepted (Coordinator → Worker)
    Welcome(WelcomeMessage),

    /// Handshake refused (Coordinator → Worker)
    Reject(RejectMessage),

    /// One tagged value; the connection identifies the sender
    Data(DataMessage),
}

/// Handshake sent by a worker right after connecting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloMessage {
    pub protocol_version: u32,
    pub participant_id: ParticipantId,
    pub group_size: usize,
    /// Hostname of the worker, for diagnostics
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    pub protocol_version: u32,
    pub group_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectMessage {
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    pub tag: Tag,
    pub value: f64,
}

/// Serialize a message to a length-prefixed frame
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg)
        .context("Failed to serialize message")?;

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from a length-prefixed frame
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize)> {
    if buf.len() < 4 {
        anyhow::bail!("Buffer too small for message length (need 4 bytes, got {})", buf.len());
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if buf.len() < 4 + msg_len {
        anyhow::bail!("Incomplete message (need {} bytes, got {})", 4 + msg_len, buf.len());
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

/// Read one complete message from a stream
pub async fn read_message<R>(stream: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;
    if msg_len > MAX_MESSAGE_LEN {
        anyhow::bail!("Message too large: {} bytes (max {})", msg_len, MAX_MESSAGE_LEN);
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream.read_exact(&mut msg_buf).await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf)
        .context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write one message to a stream and flush it
pub async fn write_message<W>(stream: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    stream.write_all(&framed).await
        .context("Failed to write message")?;
    stream.flush().await
        .context("Failed to flush stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize_hello() {
        let msg = Message::Hello(HelloMessage {
            protocol_version: PROTOCOL_VERSION,
            participant_id: 3,
            group_size: 4,
            host: "node-a".to_string(),
        });

        let bytes = serialize_message(&msg).unwrap();
        let (deserialized, consumed) = deserialize_message(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(deserialized, msg);
    }

    #[test]
    fn test_data_value_is_bit_exact() {
        let value = 0.1 + 0.2;
        let msg = Message::Data(DataMessage { tag: PARTIAL_RESULT_TAG, value });

        let bytes = serialize_message(&msg).unwrap();
        match deserialize_message(&bytes).unwrap().0 {
            Message::Data(data) => {
                assert_eq!(data.tag, PARTIAL_RESULT_TAG);
                assert_eq!(data.value.to_bits(), value.to_bits());
            }
            other => panic!("Wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_message_framing() {
        let msg = Message::Reject(RejectMessage { reason: "duplicate id".to_string() });
        let bytes = serialize_message(&msg).unwrap();

        assert!(bytes.len() >= 4);
        let msg_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(bytes.len(), 4 + msg_len);
    }

    #[test]
    fn test_incomplete_frame() {
        let bytes = serialize_message(&Message::Data(DataMessage { tag: 1, value: 1.0 })).unwrap();
        assert!(deserialize_message(&bytes[..2]).is_err());
        assert!(deserialize_message(&bytes[..bytes.len() - 1]).is_err());
    }

    #[tokio::test]
    async fn test_stream_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(256);
        let msg = Message::Welcome(WelcomeMessage { protocol_version: PROTOCOL_VERSION, group_size: 2 });

        write_message(&mut client, &msg).await.unwrap();
        let received = read_message(&mut server).await.unwrap();

        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_MESSAGE_LEN as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();

        assert!(read_message(&mut server).await.is_err());
    }
}
