//! Per-frame input timelines
//!
//! Holds three frame-keyed maps: local inputs (always confirmed, buffered by
//! the frame delay), confirmed remote inputs, and cached remote predictions.
//! A prediction is only kept while it still has something to say: once its
//! frame is confirmed and the divergence check has compared the two, it is
//! dropped.

use std::ops::Range;

use hashbrown::HashMap;

use riposte_shared::{Frame, InputBits};

use super::config::clamp_frame_delay;

#[cfg(test)]
mod tests;

/// Remote input resolved for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteInput {
    Confirmed(InputBits),
    Predicted(InputBits),
}

impl RemoteInput {
    pub fn bits(self) -> InputBits {
        match self {
            Self::Confirmed(bits) | Self::Predicted(bits) => bits,
        }
    }

    pub fn is_predicted(self) -> bool {
        matches!(self, Self::Predicted(_))
    }
}

/// Effect of recording a remote confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteRecord {
    /// First confirmation for this frame
    Confirmed,
    /// Same value as the existing confirmation; nothing changed
    Unchanged,
    /// A different value replaced the existing confirmation
    Replaced { previous: InputBits },
}

/// A cached prediction that disagrees with the later confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divergence {
    pub frame: Frame,
    pub predicted: InputBits,
    pub confirmed: InputBits,
}

#[derive(Debug, Default)]
pub struct InputTimeline {
    local: HashMap<Frame, InputBits>,
    remote_confirmed: HashMap<Frame, InputBits>,
    remote_predicted: HashMap<Frame, InputBits>,
    frame_delay: u32,
    /// First remote frame without a confirmation
    remote_confirmed_until: Frame,
}

impl InputTimeline {
    pub fn new(frame_delay: u32) -> Self {
        Self {
            frame_delay: clamp_frame_delay(frame_delay),
            ..Default::default()
        }
    }

    pub fn frame_delay(&self) -> u32 {
        self.frame_delay
    }

    /// Set the delay applied to local input recorded from now on
    ///
    /// Already-buffered input keeps the frame it was stored at. Returns the
    /// clamped value.
    pub fn set_frame_delay(&mut self, delay: u32) -> u32 {
        self.frame_delay = clamp_frame_delay(delay);
        self.frame_delay
    }

    /// Buffer local input captured while `current_frame` is next to be stepped
    ///
    /// The input lands at `current_frame + frame_delay`, which is returned so
    /// it can be forwarded to the peer under the same frame key. A later
    /// capture for the same target frame replaces the earlier one.
    pub fn record_local(&mut self, current_frame: Frame, bits: InputBits) -> Frame {
        let target = current_frame.saturating_add(self.frame_delay);
        self.local.insert(target, bits);
        target
    }

    /// Record neutral local input for `frame` if none was captured
    ///
    /// Frames inside the initial delay, frames skipped by raising the delay
    /// and idle ticks have no capture. Returns true if neutral was recorded,
    /// in which case the peer still has to be told.
    pub fn fill_local(&mut self, frame: Frame) -> bool {
        if self.local.contains_key(&frame) {
            return false;
        }
        self.local.insert(frame, InputBits::NEUTRAL);
        true
    }

    /// Local input for `frame`, neutral if nothing was recorded
    pub fn local_input(&self, frame: Frame) -> InputBits {
        self.local.get(&frame).copied().unwrap_or(InputBits::NEUTRAL)
    }

    /// Store a confirmed remote input
    ///
    /// `current_frame` is the next frame to be stepped. If a different value
    /// replaces a confirmation the simulation already consumed, the consumed
    /// value is kept as the prediction so the divergence check sees it.
    pub fn record_remote(
        &mut self,
        frame: Frame,
        bits: InputBits,
        current_frame: Frame,
    ) -> RemoteRecord {
        match self.remote_confirmed.insert(frame, bits) {
            None => {
                while self.remote_confirmed.contains_key(&self.remote_confirmed_until) {
                    self.remote_confirmed_until += 1;
                }
                RemoteRecord::Confirmed
            }
            Some(previous) if previous == bits => RemoteRecord::Unchanged,
            Some(previous) => {
                if frame < current_frame {
                    self.remote_predicted.entry(frame).or_insert(previous);
                }
                RemoteRecord::Replaced { previous }
            }
        }
    }

    /// Confirmed remote input for `frame`, if any
    pub fn confirmed_remote(&self, frame: Frame) -> Option<InputBits> {
        self.remote_confirmed.get(&frame).copied()
    }

    /// Cached prediction for `frame`, if any
    pub fn predicted_remote(&self, frame: Frame) -> Option<InputBits> {
        self.remote_predicted.get(&frame).copied()
    }

    /// First frame whose remote input is still unconfirmed
    pub fn remote_confirmed_until(&self) -> Frame {
        self.remote_confirmed_until
    }

    /// Remote input for `frame`: the confirmation, else the cached
    /// prediction, else a fresh prediction which is cached so repeated calls
    /// agree.
    pub fn resolve_remote(&mut self, frame: Frame) -> RemoteInput {
        if let Some(bits) = self.confirmed_remote(frame) {
            return RemoteInput::Confirmed(bits);
        }
        if let Some(bits) = self.predicted_remote(frame) {
            return RemoteInput::Predicted(bits);
        }
        let bits = self.derive_prediction(frame);
        self.remote_predicted.insert(frame, bits);
        RemoteInput::Predicted(bits)
    }

    /// Resolve `frame` again during replay
    ///
    /// A confirmed frame drops its stale prediction. An unconfirmed frame gets
    /// a new prediction derived from the (possibly corrected) previous frame.
    pub fn refresh_remote(&mut self, frame: Frame) -> RemoteInput {
        self.remote_predicted.remove(&frame);
        self.resolve_remote(frame)
    }

    /// Repeat the previous frame's input, confirmed first, else neutral
    fn derive_prediction(&self, frame: Frame) -> InputBits {
        frame
            .checked_sub(1)
            .and_then(|prev| {
                self.confirmed_remote(prev)
                    .or_else(|| self.predicted_remote(prev))
            })
            .unwrap_or(InputBits::NEUTRAL)
    }

    /// Prediction/confirmation mismatch at `frame`, if both exist and differ
    pub fn divergence_at(&self, frame: Frame) -> Option<Divergence> {
        let predicted = self.predicted_remote(frame)?;
        let confirmed = self.confirmed_remote(frame)?;
        (predicted != confirmed).then_some(Divergence {
            frame,
            predicted,
            confirmed,
        })
    }

    /// Drop predictions in `frames` that match their confirmation
    pub fn settle(&mut self, frames: Range<Frame>) {
        for frame in frames {
            if let Some(confirmed) = self.confirmed_remote(frame)
                && self.predicted_remote(frame) == Some(confirmed)
            {
                self.remote_predicted.remove(&frame);
            }
        }
    }

    /// Forget every entry older than `oldest`
    pub fn prune(&mut self, oldest: Frame) {
        self.local.retain(|frame, _| *frame >= oldest);
        self.remote_confirmed.retain(|frame, _| *frame >= oldest);
        self.remote_predicted.retain(|frame, _| *frame >= oldest);
    }

    /// Drop all entries; the delay setting is kept
    pub fn clear(&mut self) {
        self.local.clear();
        self.remote_confirmed.clear();
        self.remote_predicted.clear();
        self.remote_confirmed_until = 0;
    }

    /// Total entries across the three maps
    pub fn len(&self) -> usize {
        self.local.len() + self.remote_confirmed.len() + self.remote_predicted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
