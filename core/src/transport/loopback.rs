//! In-process transport cross-wiring two sessions

use std::collections::VecDeque;

use riposte_shared::{Frame, InputBits};

use super::{Transport, TransportEvent};
use crate::rollback::SessionHandle;

/// Delivers local input straight into the other session's inbox
///
/// Latency is counted in polls (one per tick of the sending session), which
/// keeps delayed delivery deterministic in tests and demos.
#[derive(Debug)]
pub struct LoopbackTransport {
    peer: SessionHandle,
    latency: u32,
    in_flight: VecDeque<(u64, Frame, InputBits)>,
    polls: u64,
    connected: bool,
    events: Vec<TransportEvent>,
}

impl LoopbackTransport {
    /// Transport feeding `peer`'s session as its remote player
    pub fn new(peer: SessionHandle) -> Self {
        Self {
            peer,
            latency: 0,
            in_flight: VecDeque::new(),
            polls: 0,
            connected: false,
            events: Vec::new(),
        }
    }

    /// Transports for two sessions, each delivering into the other
    pub fn pair(a: SessionHandle, b: SessionHandle) -> (Self, Self) {
        (Self::new(b), Self::new(a))
    }

    /// Hold each input for `polls` polls before delivery
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Inputs sent but not yet delivered
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn deliver(&mut self, frame: Frame, bits: InputBits) {
        if let Err(e) = self.peer.remote(frame, bits) {
            tracing::debug!(frame, error = %e, "Loopback peer no longer accepting input");
            self.connected = false;
            self.in_flight.clear();
            self.events.push(TransportEvent::Disconnected);
        }
    }
}

impl Transport for LoopbackTransport {
    fn connect(&mut self) {
        if !self.connected {
            self.connected = true;
            self.events.push(TransportEvent::Connected);
        }
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.in_flight.clear();
            self.events.push(TransportEvent::Disconnected);
        }
    }

    fn send_local_input(&mut self, frame: Frame, bits: InputBits) {
        if !self.connected {
            return;
        }
        if self.latency == 0 {
            self.deliver(frame, bits);
        } else {
            let due = self.polls + u64::from(self.latency);
            self.in_flight.push_back((due, frame, bits));
        }
    }

    fn poll(&mut self) {
        self.polls += 1;
        while self.connected
            && let Some(&(due, frame, bits)) = self.in_flight.front()
            && due <= self.polls
        {
            self.in_flight.pop_front();
            self.deliver(frame, bits);
        }
    }

    fn drain_events(&mut self) -> Vec<TransportEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollback::Session;
    use crate::test_utils::TestSimulation;

    fn linked_sessions(
        latency: u32,
    ) -> (
        Session<TestSimulation>,
        TestSimulation,
        Session<TestSimulation>,
        TestSimulation,
    ) {
        let sim_a = TestSimulation::new();
        let sim_b = TestSimulation::player_two();
        let a = Session::new(sim_a.clone());
        let b = Session::new(sim_b.clone());
        sim_a.attach(a.handle());
        sim_b.attach(b.handle());

        let (to_b, to_a) = LoopbackTransport::pair(a.handle(), b.handle());
        a.attach_transport(Box::new(to_b.with_latency(latency)));
        b.attach_transport(Box::new(to_a.with_latency(latency)));
        a.init(0, 8).unwrap();
        b.init(0, 8).unwrap();
        (a, sim_a, b, sim_b)
    }

    fn input_a(frame: Frame) -> InputBits {
        InputBits::new([0b0001, 0b0101, 0b0000, 0b0100][frame as usize % 4])
    }

    fn input_b(frame: Frame) -> InputBits {
        InputBits::new([0b0010, 0b0010, 0b0110, 0b0000][frame as usize % 4])
    }

    #[test]
    fn test_connect_reports_event_once() {
        let (a, _, b, _) = linked_sessions(0);
        assert_eq!(a.transport_events(), vec![TransportEvent::Connected]);
        assert!(a.transport_events().is_empty());
        assert_eq!(b.transport_events(), vec![TransportEvent::Connected]);
    }

    #[test]
    fn test_zero_latency_never_predicts() {
        let (a, sim_a, b, sim_b) = linked_sessions(0);
        for frame in 0..12 {
            a.add_local_input(input_a(frame)).unwrap();
            b.add_local_input(input_b(frame)).unwrap();
            a.tick().unwrap();
            b.tick().unwrap();
        }

        assert_eq!(a.stats().predicted_frames, 0);
        assert_eq!(b.stats().predicted_frames, 0);
        assert_eq!(a.rollback_count(), 0);
        assert_eq!(sim_a.state(), sim_b.state());
        assert_eq!(a.confirmed_checksum(11), b.confirmed_checksum(11));
    }

    #[test]
    fn test_latency_converges_after_rollbacks() {
        let (a, _sim_a, b, _sim_b) = linked_sessions(2);
        for frame in 0..20 {
            a.add_local_input(input_a(frame)).unwrap();
            b.add_local_input(input_b(frame)).unwrap();
            a.tick().unwrap();
            b.tick().unwrap();
        }

        assert!(a.rollback_count() > 0);
        assert!(b.rollback_count() > 0);
        let checksum = a.confirmed_checksum(16);
        assert!(checksum.is_some());
        assert_eq!(checksum, b.confirmed_checksum(16));
    }

    #[test]
    fn test_raising_delay_keeps_peers_in_sync() {
        let (a, sim_a, b, sim_b) = linked_sessions(0);
        for frame in 0..30 {
            if frame == 5 {
                assert_eq!(a.set_frame_delay(2).unwrap(), 2);
            }
            a.add_local_input(input_a(frame)).unwrap();
            b.add_local_input(input_b(frame)).unwrap();
            a.tick().unwrap();
            b.tick().unwrap();
        }

        assert_eq!(sim_a.state(), sim_b.state());
        let checksum = b.confirmed_checksum(29);
        assert!(checksum.is_some());
        assert_eq!(checksum, a.confirmed_checksum(29));
    }

    #[test]
    fn test_idle_peer_confirms_neutral_input() {
        let (a, _sim_a, b, _sim_b) = linked_sessions(2);
        for frame in 0..24 {
            a.add_local_input(input_a(frame)).unwrap();
            if frame < 6 {
                b.add_local_input(input_b(frame)).unwrap();
            }
            a.tick().unwrap();
            b.tick().unwrap();
        }

        assert_eq!(b.local_input_at(20), InputBits::NEUTRAL);
        assert_eq!(a.confirmed_remote_at(20), Some(InputBits::NEUTRAL));
        let checksum = a.confirmed_checksum(18);
        assert!(checksum.is_some());
        assert_eq!(checksum, b.confirmed_checksum(18));
    }

    #[test]
    fn test_latency_holds_input_until_due() {
        let (a, _sim_a, b, _sim_b) = linked_sessions(3);
        a.add_local_input(input_a(0)).unwrap();
        a.tick().unwrap();
        a.tick().unwrap();
        assert_eq!(b.confirmed_remote_at(0), None);
        a.tick().unwrap();
        assert_eq!(b.confirmed_remote_at(0), Some(input_a(0)));
    }

    #[test]
    fn test_shutdown_peer_disconnects() {
        let (a, _sim_a, b, _sim_b) = linked_sessions(0);
        a.transport_events();
        b.shutdown();
        a.add_local_input(input_a(0)).unwrap();
        assert_eq!(a.transport_events(), vec![TransportEvent::Disconnected]);
    }
}
