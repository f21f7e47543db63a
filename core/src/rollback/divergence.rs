//! Divergence detection over the retained window

use std::ops::Range;

use riposte_shared::Frame;

use super::timeline::{Divergence, InputTimeline};

/// Earliest frame in `window` whose cached prediction disagrees with its
/// confirmation. Later divergences are left for the replay to re-resolve.
pub fn find_divergence(timeline: &InputTimeline, window: Range<Frame>) -> Option<Divergence> {
    window.into_iter().find_map(|frame| timeline.divergence_at(frame))
}
