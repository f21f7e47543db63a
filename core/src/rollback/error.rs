//! Session lifecycle states and error types

use std::sync::atomic::{AtomicU8, Ordering};

use riposte_shared::Frame;

/// Lifecycle of a session. `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Running = 1,
    Shutdown = 2,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Shutdown => write!(f, "shut down"),
        }
    }
}

/// Atomic cell holding a [`SessionState`], shared between a session and its handles
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::Idle as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::Idle,
            1 => SessionState::Running,
            _ => SessionState::Shutdown,
        }
    }

    /// Move from `from` to `to`; returns the observed state on failure
    pub(crate) fn transition(&self, from: SessionState, to: SessionState) -> Result<(), SessionState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| self.get())
    }

    /// Enter `Shutdown`; returns false if already there
    pub(crate) fn shut_down(&self) -> bool {
        self.0.swap(SessionState::Shutdown as u8, Ordering::SeqCst) != SessionState::Shutdown as u8
    }

    pub(crate) fn ensure_running(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.get() {
            SessionState::Running => Ok(()),
            state => Err(SessionError::InvalidState { operation, state }),
        }
    }
}

/// Session errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Operation invoked outside `Running`, or a second concurrent tick
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Load requested for a frame outside the retained window
    #[error("no snapshot for frame {frame} (retained: {retained:?})")]
    SnapshotNotFound {
        frame: Frame,
        retained: Option<(Frame, Frame)>,
    },

    /// Input set bits outside the valid mask
    #[error("input {bits:#x} sets bits outside mask {mask:#x}")]
    MalformedInput { bits: u32, mask: u32 },
}

impl SessionError {
    /// Whether this error means a session invariant is broken
    ///
    /// A deterministic simulation cannot continue past a broken invariant,
    /// so fatal errors shut the session down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SnapshotNotFound { .. })
    }
}
