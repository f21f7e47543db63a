//! Non-blocking producer handle

use std::sync::Arc;
use std::sync::mpsc;

use riposte_shared::{Command, Frame, InputBits};

use crate::rollback::SessionError;
use crate::rollback::error::{Lifecycle, SessionState};

/// Cloneable, thread-safe sender into a session's inbox
///
/// Capture threads, transports and the simulation collaborator use this to
/// hand input and save replies to the session without ever blocking on a
/// tick in progress. Queued commands are applied at the start of the next
/// tick, or by the next synchronous call on the session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    pub(super) inbox: mpsc::Sender<Command>,
    pub(super) lifecycle: Arc<Lifecycle>,
}

impl SessionHandle {
    /// Queue a producer command
    ///
    /// Only `Local`, `Remote`, `SetDelay` and `Saved` can be queued; `Shutdown`
    /// is applied immediately. `Init` and `Tick` belong to the session owner.
    pub fn send(&self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Shutdown => {
                self.shutdown();
                Ok(())
            }
            Command::Init { .. } | Command::Tick => Err(SessionError::InvalidState {
                operation: command.name(),
                state: self.lifecycle.get(),
            }),
            command => {
                self.lifecycle.ensure_running(command.name())?;
                // The receiver lives as long as the session
                self.inbox
                    .send(command)
                    .map_err(|e| SessionError::InvalidState {
                        operation: e.0.name(),
                        state: SessionState::Shutdown,
                    })
            }
        }
    }

    pub fn local(&self, bits: InputBits) -> Result<(), SessionError> {
        self.send(Command::Local { bits })
    }

    pub fn remote(&self, frame: Frame, bits: InputBits) -> Result<(), SessionError> {
        self.send(Command::Remote { frame, bits })
    }

    pub fn set_delay(&self, delay: u32) -> Result<(), SessionError> {
        self.send(Command::SetDelay { delay })
    }

    pub fn saved(
        &self,
        frame: Frame,
        checksum: u64,
        state: Option<Vec<u8>>,
    ) -> Result<(), SessionError> {
        self.send(Command::Saved {
            frame,
            checksum,
            state,
        })
    }

    /// Mark the session shut down from any thread
    ///
    /// Safe mid-tick: the tick in progress stops at its next step and the
    /// session releases its state once the tick returns.
    pub fn shutdown(&self) {
        if self.lifecycle.shut_down() {
            tracing::info!("Session shutdown requested via handle");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.get() == SessionState::Running
    }
}
