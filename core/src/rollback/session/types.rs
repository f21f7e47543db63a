//! Core types for rollback sessions

use riposte_shared::Frame;

/// Frame counter and rollback bookkeeping for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationClock {
    /// Next frame to be stepped
    pub current_frame: Frame,
    /// Frames of history kept for rollback
    pub max_rollback: u32,
    /// Rollbacks executed since init
    pub rollback_count: u64,
}

impl SimulationClock {
    pub fn new(max_rollback: u32) -> Self {
        Self {
            current_frame: 0,
            max_rollback,
            rollback_count: 0,
        }
    }

    /// Oldest frame still inside the rollback window
    pub fn window_start(&self) -> Frame {
        self.current_frame.saturating_sub(self.max_rollback)
    }

    pub fn advance(&mut self) {
        self.current_frame += 1;
    }
}
