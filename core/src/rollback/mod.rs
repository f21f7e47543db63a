//! Rollback synchronization core
//!
//! Keeps two peers' simulations in lockstep over an unreliable link by
//! predicting the remote player's input, stepping optimistically, and
//! rewinding to a snapshot when a late confirmation proves a prediction wrong.
//!
//! # Frame Flow
//!
//! 1. Local input is buffered at `current_frame + frame_delay`
//! 2. `tick()` saves the current frame, steps it with local input and the
//!    confirmed (or predicted) remote input, then advances the clock
//! 3. The divergence check compares cached predictions with confirmations
//!    inside the retained window
//! 4. On a mismatch the session loads the snapshot at the earliest diverged
//!    frame and replays up to the current frame with corrected input
//!
//! # Module Structure
//!
//! - `config`: session settings and clamping rules
//! - `timeline`: local, confirmed and predicted input per frame
//! - `state`: snapshot store for the rollback window
//! - `divergence`: earliest prediction/confirmation mismatch
//! - `simulation`: request channel to the deterministic collaborator
//! - `session`: the driver, its handle, and the tick loop

mod config;
mod divergence;
pub(crate) mod error;
mod session;
mod simulation;
mod state;
mod timeline;

// Re-export public types from config
pub use config::{SessionConfig, clamp_frame_delay, clamp_max_rollback};

// Re-export public types from error
pub use error::{SessionError, SessionState};

// Re-export public types from timeline/state
pub use divergence::find_divergence;
pub use state::{Snapshot, SnapshotStore};
pub use timeline::{Divergence, InputTimeline, RemoteInput, RemoteRecord};

// Re-export public types from session
pub use session::{Session, SessionHandle, SimulationClock};
pub use simulation::SimulationPort;
