//! Rollback session: the simulation driver
//!
//! [`Session`] owns the simulation clock, the input timeline and the snapshot
//! store for one match. It is the only writer of the clock. Input producers
//! talk to it through [`SessionHandle`]s, which never block.

mod handle;
mod inner;
mod session;
mod types;


// Re-export public types
pub use handle::SessionHandle;
pub use session::Session;
pub use types::SimulationClock;
