//! Simulation state snapshot for rollback

use riposte_shared::Frame;

/// Snapshot of simulation state taken immediately before a frame is stepped
///
/// The collaborator answers a save request asynchronously, so a snapshot
/// starts out pending and is completed when the `saved` reply arrives. The
/// state bytes are optional: a collaborator may keep its own copy and reply
/// with the checksum alone.
#[derive(Clone, Debug)]
pub struct Snapshot {
    frame: Frame,
    /// Opaque serialized state, when the collaborator supplied it
    state: Option<Vec<u8>>,
    /// Collaborator checksum for cross-peer desync comparison (never verified locally)
    checksum: Option<u64>,
}

impl Snapshot {
    /// Placeholder for a save request that has not been answered yet
    pub fn pending(frame: Frame) -> Self {
        Self {
            frame,
            state: None,
            checksum: None,
        }
    }

    pub fn complete(&mut self, checksum: u64, state: Option<Vec<u8>>) {
        self.checksum = Some(checksum);
        self.state = state;
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn is_pending(&self) -> bool {
        self.checksum.is_none()
    }

    pub fn checksum(&self) -> Option<u64> {
        self.checksum
    }

    pub fn state(&self) -> Option<&[u8]> {
        self.state.as_deref()
    }

    /// Size of the retained state in bytes
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
