//! Session configuration
//!
//! Provides configuration types and clamping helpers for rollback sessions.

use serde::{Deserialize, Serialize};

use riposte_shared::constants::{
    DEFAULT_FRAME_DELAY, DEFAULT_INPUT_MASK, DEFAULT_MAX_ROLLBACK, DEFAULT_ONLINE_FRAME_DELAY,
    MAX_FRAME_DELAY, MAX_ROLLBACK_LIMIT,
};

/// Settings for a rollback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local input delay in frames (0 = responsive, higher = fewer rollbacks)
    pub frame_delay: u32,
    /// Frames of history retained for rollback
    pub max_rollback: u32,
    /// Control bits accepted from either player; anything else is malformed
    pub input_mask: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_delay: DEFAULT_FRAME_DELAY,
            max_rollback: DEFAULT_MAX_ROLLBACK,
            input_mask: DEFAULT_INPUT_MASK,
        }
    }
}

impl SessionConfig {
    /// Create config for same-host play (two controllers, loopback transport)
    pub fn local() -> Self {
        Self::default()
    }

    /// Create config for online play
    pub fn online() -> Self {
        Self {
            frame_delay: DEFAULT_ONLINE_FRAME_DELAY,
            ..Default::default()
        }
    }

    /// Copy of this config with every field inside its accepted range
    pub fn clamped(self) -> Self {
        Self {
            frame_delay: clamp_frame_delay(self.frame_delay),
            max_rollback: clamp_max_rollback(self.max_rollback),
            input_mask: self.input_mask,
        }
    }
}

/// Clamp a requested frame delay to `[0, MAX_FRAME_DELAY]`
pub fn clamp_frame_delay(delay: u32) -> u32 {
    delay.min(MAX_FRAME_DELAY)
}

/// Clamp a requested rollback window to `[1, MAX_ROLLBACK_LIMIT]`
///
/// A zero-length window would make every late confirmation unrecoverable.
pub fn clamp_max_rollback(max_rollback: u32) -> u32 {
    max_rollback.clamp(1, MAX_ROLLBACK_LIMIT)
}
