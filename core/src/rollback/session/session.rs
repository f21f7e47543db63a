//! Public session API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use riposte_shared::{Command, Frame, InputBits, Stats};

use super::handle::SessionHandle;
use super::inner::SessionInner;
use crate::rollback::config::SessionConfig;
use crate::rollback::error::{Lifecycle, SessionError, SessionState};
use crate::rollback::simulation::SimulationPort;
use crate::telemetry::TelemetrySink;
use crate::transport::{Transport, TransportEvent};

/// Deterministic rollback driver for one two-player match
///
/// Lifecycle: `Idle` until [`init`](Self::init), `Running` until
/// [`shutdown`](Self::shutdown), then `Shutdown` for good. All methods take
/// `&self`, so a session can be shared across threads behind an `Arc`; ticks
/// are serialized and a concurrent second tick is rejected rather than queued.
pub struct Session<P: SimulationPort> {
    lifecycle: Arc<Lifecycle>,
    ticking: AtomicBool,
    torn_down: AtomicBool,
    inbox: mpsc::Sender<Command>,
    inner: Mutex<SessionInner<P>>,
}

impl<P: SimulationPort> Session<P> {
    /// Create an idle session with default settings
    pub fn new(port: P) -> Self {
        Self::with_config(port, SessionConfig::default())
    }

    /// Create an idle session
    ///
    /// `config` supplies the input mask and the defaults that
    /// [`init`](Self::init) overrides.
    pub fn with_config(port: P, config: SessionConfig) -> Self {
        let (inbox, receiver) = mpsc::channel();
        Self {
            lifecycle: Arc::new(Lifecycle::new()),
            ticking: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
            inbox,
            inner: Mutex::new(SessionInner::new(receiver, config, port)),
        }
    }

    /// Non-blocking producer handle for other threads
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            inbox: self.inbox.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Start the session at frame 0
    ///
    /// Valid once, from `Idle`. Values outside the accepted ranges are clamped.
    pub fn init(&self, frame_delay: u32, max_rollback: u32) -> Result<(), SessionError> {
        let mut inner = self.lock();
        self.lifecycle
            .transition(SessionState::Idle, SessionState::Running)
            .map_err(|state| SessionError::InvalidState {
                operation: "init",
                state,
            })?;
        inner.reset(frame_delay, max_rollback);
        if let Some(transport) = inner.transport.as_mut() {
            transport.connect();
        }
        tracing::info!(
            frame_delay = inner.config.frame_delay,
            max_rollback = inner.config.max_rollback,
            "Session started"
        );
        Ok(())
    }

    /// Advance the simulation by one frame
    ///
    /// Saves and steps the current frame, then rolls back at most once if a
    /// confirmed remote input contradicts a prediction still in the window.
    /// Returns the stats sampled at the end of the tick.
    pub fn tick(&self) -> Result<Stats, SessionError> {
        self.ensure_running("tick")?;
        if self
            .ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::InvalidState {
                operation: "re-enter tick",
                state: SessionState::Running,
            });
        }

        let result = {
            let mut inner = self.lock();
            inner.tick(&self.lifecycle)
        };
        self.ticking.store(false, Ordering::Release);

        if let Err(e) = &result
            && e.is_fatal()
        {
            tracing::error!(error = %e, "Rollback invariant broken, shutting session down");
            self.lifecycle.shut_down();
        }
        self.reap();
        result
    }

    /// Apply one inbound command
    ///
    /// Returns the tick stats for `Tick`, the current stats otherwise.
    pub fn dispatch(&self, command: Command) -> Result<Stats, SessionError> {
        match command {
            Command::Init {
                frame_delay,
                max_rollback,
            } => {
                self.init(frame_delay, max_rollback)?;
                Ok(self.stats())
            }
            Command::Tick => self.tick(),
            Command::Local { bits } => self.add_local_input(bits).map(|_| self.stats()),
            Command::Remote { frame, bits } => {
                self.add_remote_input(frame, bits).map(|_| self.stats())
            }
            Command::SetDelay { delay } => self.set_frame_delay(delay).map(|_| self.stats()),
            Command::Saved {
                frame,
                checksum,
                state,
            } => self.saved(frame, checksum, state).map(|_| self.stats()),
            Command::Shutdown => {
                self.shutdown();
                Ok(self.stats())
            }
        }
    }

    /// Buffer local input; returns the frame it was stored at
    pub fn add_local_input(&self, bits: InputBits) -> Result<Frame, SessionError> {
        self.with_inner("add local input", |inner| inner.record_local(bits))
    }

    /// Record a confirmed remote input
    ///
    /// Inputs older than the rollback window are dropped and counted; the
    /// call still succeeds.
    pub fn add_remote_input(&self, frame: Frame, bits: InputBits) -> Result<(), SessionError> {
        self.with_inner("add remote input", |inner| inner.record_remote(frame, bits))
    }

    /// Change the delay applied to future local input; returns the clamped value
    pub fn set_frame_delay(&self, delay: u32) -> Result<u32, SessionError> {
        self.with_inner("set frame delay", |inner| inner.set_frame_delay(delay))
    }

    /// Complete a pending snapshot with the collaborator's reply
    pub fn saved(
        &self,
        frame: Frame,
        checksum: u64,
        state: Option<Vec<u8>>,
    ) -> Result<(), SessionError> {
        self.with_inner("record save", |inner| {
            inner.record_saved(frame, checksum, state)
        })
    }

    /// Shut the session down and release its state. Idempotent.
    pub fn shutdown(&self) {
        if self.lifecycle.shut_down() {
            tracing::info!("Session shutting down");
        }
        self.reap();
    }

    /// Attach the transport carrying input to and from the peer
    ///
    /// The transport is connected immediately if the session is running, and
    /// otherwise at [`init`](Self::init).
    pub fn attach_transport(&self, mut transport: Box<dyn Transport>) {
        let mut inner = self.lock();
        if self.lifecycle.get() == SessionState::Running {
            transport.connect();
        }
        inner.transport = Some(transport);
    }

    /// Receive a stats sample after every tick
    pub fn set_telemetry(&self, sink: impl TelemetrySink + 'static) {
        self.lock().telemetry = Some(Box::new(sink));
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.lifecycle.get()
    }

    pub fn current_frame(&self) -> Frame {
        self.lock().clock.current_frame
    }

    pub fn rollback_count(&self) -> u64 {
        self.lock().clock.rollback_count
    }

    pub fn frame_delay(&self) -> u32 {
        self.drained().timeline.frame_delay()
    }

    /// Counters as of now, including any input still queued by handles
    pub fn stats(&self) -> Stats {
        self.drained().sample_stats()
    }

    /// Frames with a retained snapshot, ascending
    pub fn snapshot_frames(&self) -> Vec<Frame> {
        self.lock().snapshots.frames()
    }

    /// Checksum of the latest completed snapshot at `frame`
    pub fn checksum(&self, frame: Frame) -> Option<u64> {
        self.drained().snapshots.checksum(frame)
    }

    /// Checksum at `frame` once every remote input before it is confirmed
    ///
    /// Two peers fed the same inputs report equal values here, which makes it
    /// the comparison point for desync detection.
    pub fn confirmed_checksum(&self, frame: Frame) -> Option<u64> {
        self.drained().confirmed_checksum(frame)
    }

    pub fn local_input_at(&self, frame: Frame) -> InputBits {
        self.drained().timeline.local_input(frame)
    }

    pub fn confirmed_remote_at(&self, frame: Frame) -> Option<InputBits> {
        self.drained().timeline.confirmed_remote(frame)
    }

    pub fn predicted_remote_at(&self, frame: Frame) -> Option<InputBits> {
        self.drained().timeline.predicted_remote(frame)
    }

    /// Connectivity changes reported by the attached transport
    pub fn transport_events(&self) -> Vec<TransportEvent> {
        self.lock().transport_events()
    }

    /// Poll the transport without advancing the clock
    ///
    /// Lets a networked session wait for its peer before the first tick.
    /// Returns the connectivity changes seen so far.
    pub fn poll_transport(&self) -> Result<Vec<TransportEvent>, SessionError> {
        self.with_inner("poll transport", |inner| {
            if let Some(transport) = inner.transport.as_mut() {
                transport.poll();
            }
            inner.drain_inbox();
            inner.transport_events()
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, SessionInner<P>> {
        // Inner state stays consistent between steps, so a poisoned lock is usable
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock after applying queued commands, so queries see handle traffic
    fn drained(&self) -> MutexGuard<'_, SessionInner<P>> {
        let mut inner = self.lock();
        if self.lifecycle.get() == SessionState::Running {
            inner.drain_inbox();
        }
        inner
    }

    /// Run `f` against the inner state of a running session
    fn with_inner<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut SessionInner<P>) -> T,
    ) -> Result<T, SessionError> {
        self.ensure_running(operation)?;
        let result = {
            let mut inner = self.lock();
            inner.drain_inbox();
            f(&mut inner)
        };
        self.reap();
        // A shutdown may have landed while we held the lock
        self.lifecycle.ensure_running(operation)?;
        Ok(result)
    }

    fn ensure_running(&self, operation: &'static str) -> Result<(), SessionError> {
        self.lifecycle.ensure_running(operation).inspect_err(|_| self.reap())
    }

    /// Release match state once the session is shut down
    ///
    /// Runs at most once. If another caller holds the lock, that caller reaps
    /// when it releases it.
    fn reap(&self) {
        if self.lifecycle.get() != SessionState::Shutdown || self.torn_down.load(Ordering::Acquire)
        {
            return;
        }
        let mut inner = match self.inner.try_lock() {
            Ok(inner) => inner,
            Err(std::sync::TryLockError::Poisoned(e)) => e.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => return,
        };
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        inner.teardown();
        tracing::debug!(frame = inner.clock.current_frame, "Session state released");
    }
}

impl<P: SimulationPort> Drop for Session<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
