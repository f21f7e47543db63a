//! Bounded frame-keyed snapshot store

use hashbrown::HashMap;

use riposte_shared::Frame;

use super::snapshot::Snapshot;
use crate::rollback::SessionError;

/// Retains one snapshot per frame of the rollback window
///
/// The session reserves an entry just before each step and evicts entries
/// that slide out of the window after the step, so at most
/// `max_rollback + 1` entries exist at any time.
#[derive(Debug)]
pub struct SnapshotStore {
    entries: HashMap<Frame, Snapshot>,
}

impl SnapshotStore {
    /// Create a store sized for a window of `max_rollback` frames
    pub fn new(max_rollback: u32) -> Self {
        Self {
            entries: HashMap::with_capacity(max_rollback as usize + 1),
        }
    }

    /// Reserve a pending entry for `frame`, replacing any older one
    pub fn reserve(&mut self, frame: Frame) {
        self.entries.insert(frame, Snapshot::pending(frame));
    }

    /// Fill in the collaborator's reply for `frame`
    ///
    /// Returns false if the frame is no longer retained.
    pub fn complete(&mut self, frame: Frame, checksum: u64, state: Option<Vec<u8>>) -> bool {
        match self.entries.get_mut(&frame) {
            Some(snapshot) => {
                snapshot.complete(checksum, state);
                true
            }
            None => false,
        }
    }

    /// Exact entry for `frame`
    pub fn load(&self, frame: Frame) -> Result<&Snapshot, SessionError> {
        self.entries
            .get(&frame)
            .ok_or_else(|| SessionError::SnapshotNotFound {
                frame,
                retained: self.bounds(),
            })
    }

    pub fn checksum(&self, frame: Frame) -> Option<u64> {
        self.entries.get(&frame).and_then(Snapshot::checksum)
    }

    /// Drop every entry older than `oldest`
    pub fn evict_before(&mut self, oldest: Frame) {
        self.entries.retain(|frame, _| *frame >= oldest);
    }

    /// Retained frames, oldest first
    pub fn frames(&self) -> Vec<Frame> {
        let mut frames: Vec<Frame> = self.entries.keys().copied().collect();
        frames.sort_unstable();
        frames
    }

    /// Oldest and newest retained frame
    pub fn bounds(&self) -> Option<(Frame, Frame)> {
        let oldest = self.entries.keys().min()?;
        let newest = self.entries.keys().max()?;
        Some((*oldest, *newest))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
