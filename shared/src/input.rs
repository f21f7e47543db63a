//! Frame numbers and per-frame input samples

use bitcode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Monotonic simulation frame number. One simulation step per unit.
pub type Frame = u32;

/// Fixed-width bitmask of one player's controls for one frame.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InputBits(pub u32);

impl InputBits {
    /// No controls held.
    pub const NEUTRAL: Self = Self(0);

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_neutral(self) -> bool {
        self.0 == 0
    }

    /// True if no bit outside `mask` is set.
    pub const fn fits(self, mask: u32) -> bool {
        self.0 & !mask == 0
    }
}

impl From<u32> for InputBits {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl std::fmt::Binary for InputBits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Binary::fmt(&self.0, f)
    }
}
