//! Tests for the UDP transport

use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use riposte_shared::InputBits;

use super::{UdpConfig, UdpTransport};
use crate::rollback::Session;
use crate::test_utils::TestSimulation;
use crate::transport::{TransportError, TransportEvent};

/// Call `step` until it returns true, sleeping between attempts
fn wait_for(mut step: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if step() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

fn unbound_session() -> (Session<TestSimulation>, TestSimulation) {
    let sim = TestSimulation::new();
    let session = Session::new(sim.clone());
    sim.attach(session.handle());
    (session, sim)
}

/// Host/client pair over localhost with the handshake completed
fn connected_pair(config: UdpConfig) -> (Session<TestSimulation>, Session<TestSimulation>) {
    let (host, _) = unbound_session();
    let (client, _) = unbound_session();

    let host_transport = UdpTransport::bind_any(host.handle(), config).unwrap();
    let host_addr = host_transport.local_addr().to_string();
    let mut client_transport = UdpTransport::bind_any(client.handle(), config).unwrap();
    client_transport.set_peer(&host_addr).unwrap();

    host.attach_transport(Box::new(host_transport));
    client.attach_transport(Box::new(client_transport));
    host.init(0, 64).unwrap();
    client.init(0, 64).unwrap();

    let (mut host_up, mut client_up) = (false, false);
    let connected = wait_for(|| {
        host_up |= host
            .poll_transport()
            .unwrap()
            .contains(&TransportEvent::Connected);
        client_up |= client
            .poll_transport()
            .unwrap()
            .contains(&TransportEvent::Connected);
        host_up && client_up
    });
    assert!(connected, "handshake did not complete");
    assert_eq!(host.current_frame(), 0);
    (host, client)
}

#[test]
fn test_udp_bind_any() {
    let (session, _) = unbound_session();
    let transport = UdpTransport::bind_any(session.handle(), UdpConfig::default()).unwrap();
    assert!(transport.local_addr().port() > 0);
    assert!(transport.peer_addr().is_none());
    assert!(!transport.is_connected());
}

#[test]
fn test_udp_invalid_addresses() {
    let (session, _) = unbound_session();
    assert!(matches!(
        UdpTransport::bind("not an address", session.handle(), UdpConfig::default()),
        Err(TransportError::Bind(_))
    ));

    let mut transport = UdpTransport::bind_any(session.handle(), UdpConfig::default()).unwrap();
    assert!(matches!(
        transport.set_peer("nowhere"),
        Err(TransportError::Connect(_))
    ));
    transport.set_peer("127.0.0.1:9999").unwrap();
    assert_eq!(transport.peer_addr().map(|a| a.port()), Some(9999));
}

#[test]
fn test_udp_handshake() {
    connected_pair(UdpConfig::default());
}

#[test]
fn test_udp_delivers_inputs() {
    let (host, client) = connected_pair(UdpConfig::default());

    let frame = client.add_local_input(InputBits::new(0b0101)).unwrap();
    let delivered = wait_for(|| {
        host.tick().unwrap();
        host.confirmed_remote_at(frame) == Some(InputBits::new(0b0101))
    });
    assert!(delivered);

    let frame = host.add_local_input(InputBits::new(0b0010)).unwrap();
    let delivered = wait_for(|| {
        client.tick().unwrap();
        client.confirmed_remote_at(frame) == Some(InputBits::new(0b0010))
    });
    assert!(delivered);
}

#[test]
fn test_udp_goodbye_disconnects_peer() {
    let (host, client) = connected_pair(UdpConfig::default());
    client.shutdown();

    let disconnected = wait_for(|| {
        host.tick().unwrap();
        host.transport_events()
            .contains(&TransportEvent::Disconnected)
    });
    assert!(disconnected);
}

#[test]
fn test_udp_silence_interrupts_then_resumes() {
    let config = UdpConfig {
        interrupt_notify: Duration::from_millis(20),
        disconnect_timeout: Duration::from_secs(30),
        ..UdpConfig::default()
    };
    let (host, client) = connected_pair(config);

    let interrupted = wait_for(|| {
        host.tick().unwrap();
        host.transport_events()
            .iter()
            .any(|e| matches!(e, TransportEvent::Interrupted { silent_for_ms } if *silent_for_ms >= 20))
    });
    assert!(interrupted);

    client.add_local_input(InputBits::new(0b0001)).unwrap();
    let resumed = wait_for(|| {
        host.tick().unwrap();
        host.transport_events().contains(&TransportEvent::Resumed)
    });
    assert!(resumed);
}

#[test]
fn test_udp_ignores_garbage() {
    let (session, _) = unbound_session();
    let transport = UdpTransport::bind_any(session.handle(), UdpConfig::default()).unwrap();
    let addr = transport.local_addr();
    session.attach_transport(Box::new(transport));
    session.init(0, 8).unwrap();
    session.transport_events();

    let stray = UdpSocket::bind("127.0.0.1:0").unwrap();
    stray.send_to(b"definitely not a packet", addr).unwrap();
    thread::sleep(Duration::from_millis(20));

    session.tick().unwrap();
    assert!(session.transport_events().is_empty());
}
