//! UDP transport for networked play
//!
//! Both peers bind a non-blocking socket and exchange framed [`PeerPacket`]s
//! (see `riposte_shared::netplay`). There is no retransmission: every
//! `Inputs` packet repeats the most recent local inputs, so a lost datagram
//! is covered by the next one and receivers deduplicate by frame.
//!
//! # Usage
//!
//! ```ignore
//! // Host:
//! let transport = UdpTransport::bind("0.0.0.0:7777", session.handle(), UdpConfig::default())?;
//!
//! // Client:
//! let mut transport = UdpTransport::bind_any(session.handle(), UdpConfig::default())?;
//! transport.set_peer("192.168.1.20:7777")?;
//!
//! session.attach_transport(Box::new(transport));
//! ```
//!
//! A host without a peer address adopts the sender of the first valid packet.
//!
//! [`PeerPacket`]: riposte_shared::PeerPacket

mod socket;

#[cfg(test)]
mod tests;

use std::time::Duration;

pub use socket::UdpTransport;

/// Default number of recent inputs repeated in every packet
pub const DEFAULT_REDUNDANCY: usize = 8;

/// Default silence before an `Interrupted` event
pub const DEFAULT_INTERRUPT_NOTIFY: Duration = Duration::from_millis(750);

/// Default silence before the peer is considered gone
pub const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Link tuning for [`UdpTransport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpConfig {
    /// Recent inputs repeated in each packet (at least 1)
    pub redundancy: usize,
    /// Silence before reporting `Interrupted`
    pub interrupt_notify: Duration,
    /// Silence before reporting `Disconnected`
    pub disconnect_timeout: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            redundancy: DEFAULT_REDUNDANCY,
            interrupt_notify: DEFAULT_INTERRUPT_NOTIFY,
            disconnect_timeout: DEFAULT_DISCONNECT_TIMEOUT,
        }
    }
}
