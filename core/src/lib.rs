//! Riposte Core - Rollback synchronization for two-peer real-time matches
//!
//! This crate keeps two deterministic simulations in lockstep across an
//! unreliable link. It owns no game logic: the simulation lives behind the
//! [`SimulationPort`] collaborator, which is asked to save, load and step
//! frames.
//!
//! # Architecture
//!
//! - [`Session`] - Simulation driver: clock, input timeline, snapshot store
//! - [`SessionHandle`] - Non-blocking producer handle for input and save replies
//! - [`SimulationPort`] - Ordered request channel to the deterministic simulation
//! - [`Transport`] - Carries local input to the peer and remote input back
//! - [`TelemetrySink`] - Receives a [`Stats`] sample after every tick

pub mod rollback;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod transport;

// Re-export rollback types
pub use rollback::{
    Divergence, InputTimeline, RemoteInput, RemoteRecord, Session, SessionConfig, SessionError,
    SessionHandle, SessionState, SimulationClock, SimulationPort, Snapshot, SnapshotStore,
    clamp_frame_delay, clamp_max_rollback, find_divergence,
};

// Re-export transport types
pub use transport::{
    LoopbackTransport, Transport, TransportError, TransportEvent, UdpConfig, UdpTransport,
};

// Re-export telemetry types
pub use telemetry::{TelemetrySink, TracingTelemetry};

// Re-export shared types for convenience
pub use riposte_shared::{Command, Frame, InputBits, SimRequest, Stats};
