//! Shared types for the riposte rollback core.
//!
//! Everything in this crate crosses a process or network boundary: the
//! inbound control messages a session accepts, the requests it issues to the
//! simulation collaborator, the telemetry record it emits after each tick, and
//! the framed packet exchanged between two networked peers. All of them are
//! encoded with bitcode and must stay layout-stable between peers.

pub mod command;
pub mod constants;
pub mod input;
pub mod netplay;
pub mod stats;

pub use command::{Command, SimRequest};
pub use input::{Frame, InputBits};
pub use netplay::{PacketDecodeError, PeerPacket};
pub use stats::Stats;
