//! Control messages and collaborator requests
//!
//! [`Command`] is the inbound tagged union a session accepts, whether it comes
//! from the local application, a transport, or the simulation collaborator.
//! [`SimRequest`] flows the other way, from the session to the collaborator,
//! on a single ordered channel.

use bitcode::{Decode, Encode};

use crate::input::{Frame, InputBits};

/// Inbound control message.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum Command {
    /// Start the session. Valid once, from the idle state.
    Init { frame_delay: u32, max_rollback: u32 },
    /// Advance the simulation by one frame.
    Tick,
    /// Local controls captured for the current frame (buffered by the frame delay).
    Local { bits: InputBits },
    /// Confirmed remote controls for `frame`.
    Remote { frame: Frame, bits: InputBits },
    /// Change the local frame delay for future input.
    SetDelay { delay: u32 },
    /// Collaborator reply to [`SimRequest::Save`].
    Saved {
        frame: Frame,
        checksum: u64,
        state: Option<Vec<u8>>,
    },
    /// Tear the session down. Idempotent.
    Shutdown,
}

impl Command {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Tick => "tick",
            Self::Local { .. } => "local",
            Self::Remote { .. } => "remote",
            Self::SetDelay { .. } => "set_delay",
            Self::Saved { .. } => "saved",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Request from a session to the deterministic simulation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub enum SimRequest {
    /// Capture the state immediately before `frame` is stepped and reply with
    /// [`Command::Saved`].
    Save { frame: Frame },
    /// Restore the state captured by `Save { frame }`.
    ///
    /// `state` carries the bytes from the `Saved` reply when the collaborator
    /// supplied them; otherwise the collaborator restores its own copy.
    Load {
        frame: Frame,
        state: Option<Vec<u8>>,
    },
    /// Advance the simulation across `frame` with the given inputs.
    Step {
        frame: Frame,
        local: InputBits,
        remote: InputBits,
    },
}

impl SimRequest {
    pub fn frame(&self) -> Frame {
        match self {
            Self::Save { frame } | Self::Load { frame, .. } | Self::Step { frame, .. } => *frame,
        }
    }
}
