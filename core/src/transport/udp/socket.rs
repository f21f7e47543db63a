//! Non-blocking UDP socket carrying input between two peers

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use riposte_shared::{Frame, InputBits, PeerPacket};

use super::UdpConfig;
use crate::rollback::SessionHandle;
use crate::transport::{Transport, TransportError, TransportEvent};

/// Buffer size for incoming packets (input packets are small)
const RECV_BUFFER_SIZE: usize = 2048;

/// Interval between `Hello`s while the link is not established
const HELLO_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Idle,
    Connecting,
    Connected,
    Interrupted,
    Disconnected,
}

/// Transport exchanging framed packets over a UDP socket
pub struct UdpTransport {
    socket: UdpSocket,
    local_addr: SocketAddr,
    peer_addr: Option<SocketAddr>,
    /// Remote input is delivered here
    inbound: SessionHandle,
    config: UdpConfig,
    recv_buf: Vec<u8>,
    /// Most recent local inputs, oldest first
    recent: SmallVec<[(Frame, InputBits); 16]>,
    link: LinkState,
    last_heard: Option<Instant>,
    last_hello: Option<Instant>,
    events: Vec<TransportEvent>,
}

impl UdpTransport {
    /// Bind to `addr` (e.g. "0.0.0.0:7777")
    pub fn bind(
        addr: &str,
        inbound: SessionHandle,
        config: UdpConfig,
    ) -> Result<Self, TransportError> {
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| TransportError::Bind(format!("Invalid address '{}': {}", addr, e)))?;

        let socket =
            UdpSocket::bind(socket_addr).map_err(|e| TransportError::Bind(e.to_string()))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| TransportError::Bind(format!("Failed to set non-blocking: {}", e)))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| TransportError::Bind(format!("Failed to get local addr: {}", e)))?;

        tracing::info!(port = local_addr.port(), "UDP transport bound");

        Ok(Self {
            socket,
            local_addr,
            peer_addr: None,
            inbound,
            config: UdpConfig {
                redundancy: config.redundancy.max(1),
                ..config
            },
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
            recent: SmallVec::new(),
            link: LinkState::Idle,
            last_heard: None,
            last_hello: None,
            events: Vec::new(),
        })
    }

    /// Bind to any available port on localhost
    pub fn bind_any(inbound: SessionHandle, config: UdpConfig) -> Result<Self, TransportError> {
        Self::bind("127.0.0.1:0", inbound, config)
    }

    /// Set the peer to send to (e.g. "127.0.0.1:7778")
    pub fn set_peer(&mut self, peer: &str) -> Result<(), TransportError> {
        let peer_addr: SocketAddr = peer
            .parse()
            .map_err(|e| TransportError::Connect(format!("Invalid peer '{}': {}", peer, e)))?;
        tracing::info!(port = peer_addr.port(), "UDP transport peer set");
        self.peer_addr = Some(peer_addr);
        Ok(())
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// True once a packet has been heard from the peer and it has not left
    pub fn is_connected(&self) -> bool {
        matches!(self.link, LinkState::Connected | LinkState::Interrupted)
    }

    fn send(&self, packet: &PeerPacket) -> Result<(), TransportError> {
        let peer = self.peer_addr.ok_or(TransportError::NoPeer)?;
        match self.socket.send_to(&packet.to_bytes(), peer) {
            Ok(_) => Ok(()),
            // Full send buffer; the next packet repeats these inputs
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }

    fn send_hello(&mut self, now: Instant) {
        if self.peer_addr.is_none() {
            return;
        }
        if let Err(e) = self.send(&PeerPacket::Hello) {
            tracing::warn!(error = %e, "Failed to send hello");
        }
        self.last_hello = Some(now);
    }

    /// Read one datagram; `None` once the socket is drained
    fn recv(&mut self) -> Option<Result<(PeerPacket, SocketAddr), TransportError>> {
        match self.socket.recv_from(&mut self.recv_buf) {
            Ok((len, from)) => Some(
                PeerPacket::from_bytes(&self.recv_buf[..len])
                    .map(|packet| (packet, from))
                    .map_err(TransportError::from),
            ),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
        }
    }

    fn handle_packet(&mut self, packet: PeerPacket, from: SocketAddr, now: Instant) {
        match self.peer_addr {
            None => {
                tracing::info!(port = from.port(), "Peer connected");
                self.peer_addr = Some(from);
            }
            Some(peer) if peer != from => {
                tracing::debug!(port = from.port(), "Ignoring packet from unknown sender");
                return;
            }
            Some(_) => {}
        }

        if packet == PeerPacket::Goodbye {
            tracing::info!("Peer left");
            self.set_disconnected();
            return;
        }
        if self.link == LinkState::Disconnected {
            return;
        }

        self.last_heard = Some(now);
        match self.link {
            LinkState::Idle | LinkState::Connecting => {
                self.link = LinkState::Connected;
                self.events.push(TransportEvent::Connected);
                // Answer so a peer still connecting learns the link is up
                if packet == PeerPacket::Hello {
                    self.send_hello(now);
                }
            }
            LinkState::Interrupted => {
                tracing::info!("Peer traffic resumed");
                self.link = LinkState::Connected;
                self.events.push(TransportEvent::Resumed);
            }
            LinkState::Connected | LinkState::Disconnected => {}
        }

        if let PeerPacket::Inputs { inputs } = packet {
            for (frame, bits) in inputs {
                if let Err(e) = self.inbound.remote(frame, bits) {
                    tracing::debug!(frame, error = %e, "Session no longer accepting input");
                    break;
                }
            }
        }
    }

    fn set_disconnected(&mut self) {
        if self.link != LinkState::Disconnected {
            self.link = LinkState::Disconnected;
            self.events.push(TransportEvent::Disconnected);
        }
    }

    /// Report prolonged silence from the peer
    fn check_silence(&mut self, now: Instant) {
        let Some(last_heard) = self.last_heard else {
            return;
        };
        let silent_for = now.saturating_duration_since(last_heard);
        match self.link {
            LinkState::Connected | LinkState::Interrupted
                if silent_for >= self.config.disconnect_timeout =>
            {
                tracing::warn!(silent_ms = silent_for.as_millis() as u64, "Peer timed out");
                self.set_disconnected();
            }
            LinkState::Connected if silent_for >= self.config.interrupt_notify => {
                let silent_for_ms = silent_for.as_millis() as u64;
                tracing::warn!(silent_ms = silent_for_ms, "Peer connection interrupted");
                self.link = LinkState::Interrupted;
                self.events
                    .push(TransportEvent::Interrupted { silent_for_ms });
            }
            _ => {}
        }
    }
}

impl Transport for UdpTransport {
    fn connect(&mut self) {
        if self.link != LinkState::Idle {
            return;
        }
        self.link = LinkState::Connecting;
        self.send_hello(Instant::now());
    }

    fn disconnect(&mut self) {
        if matches!(self.link, LinkState::Idle | LinkState::Disconnected) {
            return;
        }
        if self.peer_addr.is_some()
            && let Err(e) = self.send(&PeerPacket::Goodbye)
        {
            tracing::warn!(error = %e, "Failed to send goodbye");
        }
        self.recent.clear();
        self.set_disconnected();
    }

    fn send_local_input(&mut self, frame: Frame, bits: InputBits) {
        if self.link == LinkState::Disconnected {
            return;
        }
        if self.recent.len() == self.config.redundancy {
            self.recent.remove(0);
        }
        self.recent.push((frame, bits));

        if self.peer_addr.is_none() {
            return;
        }
        let packet = PeerPacket::Inputs {
            inputs: self.recent.to_vec(),
        };
        if let Err(e) = self.send(&packet) {
            tracing::warn!(frame, error = %e, "Failed to send input");
        }
    }

    fn poll(&mut self) {
        if matches!(self.link, LinkState::Idle | LinkState::Disconnected) {
            return;
        }
        let now = Instant::now();
        while let Some(received) = self.recv() {
            match received {
                Ok((packet, from)) => self.handle_packet(packet, from, now),
                Err(e) => tracing::warn!(error = %e, "Discarding packet"),
            }
        }

        self.check_silence(now);

        if matches!(self.link, LinkState::Connecting | LinkState::Interrupted)
            && self
                .last_hello
                .is_none_or(|sent| now.saturating_duration_since(sent) >= HELLO_INTERVAL)
        {
            self.send_hello(now);
        }
    }

    fn drain_events(&mut self) -> Vec<TransportEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for UdpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpTransport")
            .field("local_addr", &self.local_addr)
            .field("peer_addr", &self.peer_addr)
            .field("link", &self.link)
            .finish()
    }
}
