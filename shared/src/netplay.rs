//! Peer-to-peer packets for networked play
//!
//! Packets are serialized with bitcode and wrapped in a small frame so that
//! stray datagrams (port scans, other protocols) are rejected before decoding.
//!
//! # Wire Format
//!
//! ```text
//! [RPST][version:u16][length:u32][bitcode payload...]
//! ```

use bitcode::{Decode, Encode};

use crate::input::{Frame, InputBits};

/// Packet magic bytes
pub const PACKET_MAGIC: [u8; 4] = *b"RPST";

/// Current packet protocol version
pub const PACKET_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + length (4)
pub const PACKET_HEADER_SIZE: usize = 10;

/// Datagram exchanged between two peers.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum PeerPacket {
    /// Sent on connect and answered once, so both sides learn the link is up
    Hello,
    /// Local inputs of the sender, oldest first.
    ///
    /// Each packet repeats the most recent inputs so a single lost datagram
    /// does not lose a frame. Receivers deduplicate by frame.
    Inputs { inputs: Vec<(Frame, InputBits)> },
    /// Sender is leaving the match
    Goodbye,
}

impl PeerPacket {
    /// Serialize with framing: `[RPST][version][length][payload]`
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = bitcode::encode(self);
        let mut bytes = Vec::with_capacity(PACKET_HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&PACKET_MAGIC);
        bytes.extend_from_slice(&PACKET_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        bytes
    }

    /// Deserialize a framed packet, validating magic, version and length first
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketDecodeError> {
        if bytes.len() < PACKET_HEADER_SIZE {
            return Err(PacketDecodeError::TooShort);
        }
        if bytes[0..4] != PACKET_MAGIC {
            return Err(PacketDecodeError::InvalidMagic);
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != PACKET_VERSION {
            return Err(PacketDecodeError::VersionMismatch {
                expected: PACKET_VERSION,
                got: version,
            });
        }

        let length = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let available = bytes.len() - PACKET_HEADER_SIZE;
        if available < length {
            return Err(PacketDecodeError::IncompletePayload {
                expected: length,
                got: available,
            });
        }

        let payload = &bytes[PACKET_HEADER_SIZE..PACKET_HEADER_SIZE + length];
        bitcode::decode(payload).map_err(|e| PacketDecodeError::DecodeFailed(e.to_string()))
    }
}

/// Errors that can occur when decoding a peer packet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketDecodeError {
    #[error("packet too short for header")]
    TooShort,

    #[error("invalid packet magic bytes")]
    InvalidMagic,

    #[error("packet version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u16, got: u16 },

    #[error("incomplete payload: expected {expected} bytes, got {got}")]
    IncompletePayload { expected: usize, got: usize },

    #[error("failed to decode packet: {0}")]
    DecodeFailed(String),
}
