//! Centralized constants for riposte sessions.
//!
//! Bounds here are part of the protocol: two peers with different values
//! cannot interoperate.

/// Largest accepted local frame delay. Requests above this are clamped.
pub const MAX_FRAME_DELAY: u32 = 10;

/// Frame delay used for same-host play.
pub const DEFAULT_FRAME_DELAY: u32 = 0;

/// Frame delay used for online play (trades 2 frames of latency for fewer rollbacks).
pub const DEFAULT_ONLINE_FRAME_DELAY: u32 = 2;

/// Default size of the retained rollback window, in frames.
pub const DEFAULT_MAX_ROLLBACK: u32 = 10;

/// Largest accepted rollback window. Larger requests are clamped.
pub const MAX_ROLLBACK_LIMIT: u32 = 64;

/// Valid control bits: 4 directions + 8 buttons.
pub const DEFAULT_INPUT_MASK: u32 = 0x0FFF;

/// Fixed simulation rate the external scheduler is expected to tick at.
pub const TICK_RATE_HZ: u32 = 60;

/// Default UDP port for networked play.
pub const DEFAULT_PORT: u16 = 7777;
