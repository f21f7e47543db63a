//! Transports carrying input between the two peers
//!
//! A transport sends this peer's local input out and feeds the other peer's
//! input in through a [`SessionHandle`](crate::rollback::SessionHandle). Two
//! variants are provided:
//!
//! - [`LoopbackTransport`] cross-wires two sessions in one process (same-host
//!   two-controller play, tests). Zero latency unless injected.
//! - [`UdpTransport`] exchanges framed packets over an unreliable,
//!   possibly-reordering UDP link.
//!
//! Transport failures never reach the session as errors. They are logged,
//! retried by the transport, and surfaced only as [`TransportEvent`]s.

mod loopback;
mod udp;

pub use loopback::LoopbackTransport;
pub use udp::{UdpConfig, UdpTransport};

use riposte_shared::{Frame, InputBits, PacketDecodeError};

/// Capability set the session drives
pub trait Transport: Send {
    /// Start talking to the peer
    fn connect(&mut self);

    /// Tell the peer we are leaving and stop delivering input
    fn disconnect(&mut self);

    /// Send local input stored at `frame`
    fn send_local_input(&mut self, frame: Frame, bits: InputBits);

    /// Deliver whatever remote input has arrived. Called once per tick,
    /// must not block.
    fn poll(&mut self) {}

    /// Connectivity changes since the last call
    fn drain_events(&mut self) -> Vec<TransportEvent>;
}

/// Connectivity change reported to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Link established with the peer
    Connected,
    /// Nothing heard from the peer for a while
    Interrupted {
        /// How long the peer has been silent (ms)
        silent_for_ms: u64,
    },
    /// Traffic resumed after an interruption
    Resumed,
    /// Peer left or timed out
    Disconnected,
}

/// Error type for transport operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the local socket
    #[error("failed to bind socket: {0}")]
    Bind(String),
    /// Failed to resolve or set the peer
    #[error("failed to connect: {0}")]
    Connect(String),
    /// No peer address known yet
    #[error("no peer connected")]
    NoPeer,
    /// Send failed
    #[error("send failed: {0}")]
    Send(String),
    /// Receive failed
    #[error("receive failed: {0}")]
    Receive(String),
    /// Packet could not be decoded
    #[error("bad packet: {0}")]
    Decode(#[from] PacketDecodeError),
}
