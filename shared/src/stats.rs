//! Telemetry record emitted after every tick

use bitcode::{Decode, Encode};
use serde::Serialize;

use crate::input::Frame;

/// Frame, rollback and delay counters sampled after a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode, Serialize)]
pub struct Stats {
    /// Next frame to be stepped
    pub current_frame: Frame,
    /// Rollbacks executed since init (monotonically non-decreasing)
    pub rollback_count: u64,
    /// Local frame delay currently applied to new input
    pub frame_delay: u32,
    /// Steps issued with a predicted remote input
    pub predicted_frames: u64,
    /// Steps re-issued during rollback replay
    pub resimulated_frames: u64,
    /// Remote confirmations dropped for arriving outside the retained window
    pub late_inputs_dropped: u64,
    /// Remote confirmations dropped for naming a frame too far ahead
    pub future_inputs_dropped: u64,
    /// Inputs discarded for setting bits outside the valid mask
    pub malformed_inputs: u64,
    /// Newest `(frame, checksum)` reported by the collaborator
    pub last_checksum: Option<(Frame, u64)>,
}
