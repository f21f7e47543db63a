//! Per-tick driver logic: snapshot, step, detect, roll back

use std::sync::mpsc;

use riposte_shared::constants::MAX_FRAME_DELAY;
use riposte_shared::{Command, Frame, InputBits, SimRequest, Stats};

use super::types::SimulationClock;
use crate::rollback::config::SessionConfig;
use crate::rollback::divergence::find_divergence;
use crate::rollback::error::{Lifecycle, SessionError, SessionState};
use crate::rollback::simulation::SimulationPort;
use crate::rollback::state::SnapshotStore;
use crate::rollback::timeline::{Divergence, InputTimeline, RemoteInput, RemoteRecord};
use crate::telemetry::TelemetrySink;
use crate::transport::{Transport, TransportEvent};

/// Session state guarded by the session mutex
pub(super) struct SessionInner<P: SimulationPort> {
    pub(super) inbox: mpsc::Receiver<Command>,
    pub(super) config: SessionConfig,
    pub(super) clock: SimulationClock,
    pub(super) timeline: InputTimeline,
    pub(super) snapshots: SnapshotStore,
    pub(super) port: P,
    pub(super) transport: Option<Box<dyn Transport>>,
    pub(super) telemetry: Option<Box<dyn TelemetrySink>>,
    pub(super) stats: Stats,
}

impl<P: SimulationPort> SessionInner<P> {
    pub(super) fn new(inbox: mpsc::Receiver<Command>, config: SessionConfig, port: P) -> Self {
        let config = config.clamped();
        Self {
            inbox,
            config,
            clock: SimulationClock::new(config.max_rollback),
            timeline: InputTimeline::new(config.frame_delay),
            snapshots: SnapshotStore::new(config.max_rollback),
            port,
            transport: None,
            telemetry: None,
            stats: Stats::default(),
        }
    }

    /// Reset clock, timelines, snapshots and counters for a fresh match
    pub(super) fn reset(&mut self, frame_delay: u32, max_rollback: u32) {
        self.config = SessionConfig {
            frame_delay,
            max_rollback,
            ..self.config
        }
        .clamped();
        self.clock = SimulationClock::new(self.config.max_rollback);
        self.timeline = InputTimeline::new(self.config.frame_delay);
        self.snapshots = SnapshotStore::new(self.config.max_rollback);
        self.stats = Stats::default();
        while self.inbox.try_recv().is_ok() {}
    }

    /// Release everything tied to the match
    pub(super) fn teardown(&mut self) {
        while self.inbox.try_recv().is_ok() {}
        self.timeline.clear();
        self.snapshots.clear();
        if let Some(transport) = self.transport.as_mut() {
            transport.disconnect();
        }
    }

    // ------------------------------------------------------------------
    // Inbound commands
    // ------------------------------------------------------------------

    /// Apply everything producers queued since the last call
    pub(super) fn drain_inbox(&mut self) {
        while let Ok(command) = self.inbox.try_recv() {
            match command {
                Command::Local { bits } => {
                    self.record_local(bits);
                }
                Command::Remote { frame, bits } => self.record_remote(frame, bits),
                Command::SetDelay { delay } => {
                    self.set_frame_delay(delay);
                }
                Command::Saved {
                    frame,
                    checksum,
                    state,
                } => self.record_saved(frame, checksum, state),
                // Handles refuse these
                Command::Init { .. } | Command::Tick | Command::Shutdown => {}
            }
        }
    }

    /// Replace input outside the valid mask with neutral controls
    fn sanitize(&mut self, bits: InputBits) -> InputBits {
        match validate_input(bits, self.config.input_mask) {
            Ok(bits) => bits,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed input");
                self.stats.malformed_inputs += 1;
                InputBits::NEUTRAL
            }
        }
    }

    pub(super) fn record_local(&mut self, bits: InputBits) -> Frame {
        let bits = self.sanitize(bits);
        let frame = self
            .timeline
            .record_local(self.clock.current_frame, bits);
        tracing::trace!(frame, bits = bits.bits(), "Local input buffered");
        if let Some(transport) = self.transport.as_mut() {
            transport.send_local_input(frame, bits);
        }
        frame
    }

    pub(super) fn record_remote(&mut self, frame: Frame, bits: InputBits) {
        let window_start = self.clock.window_start();
        if frame < window_start {
            tracing::warn!(
                frame,
                oldest = window_start,
                "Dropping remote input older than the rollback window"
            );
            self.stats.late_inputs_dropped += 1;
            return;
        }
        let newest = self.clock.current_frame + self.config.max_rollback + MAX_FRAME_DELAY;
        if frame > newest {
            tracing::warn!(frame, newest, "Dropping remote input too far ahead of the session");
            self.stats.future_inputs_dropped += 1;
            return;
        }

        let bits = self.sanitize(bits);
        match self
            .timeline
            .record_remote(frame, bits, self.clock.current_frame)
        {
            RemoteRecord::Confirmed => {
                tracing::trace!(frame, bits = bits.bits(), "Remote input confirmed");
            }
            RemoteRecord::Unchanged => {}
            RemoteRecord::Replaced { previous } => {
                tracing::debug!(
                    frame,
                    previous = previous.bits(),
                    bits = bits.bits(),
                    "Remote input re-confirmed with a different value"
                );
            }
        }
    }

    pub(super) fn set_frame_delay(&mut self, delay: u32) -> u32 {
        let applied = self.timeline.set_frame_delay(delay);
        if applied != delay {
            tracing::debug!(requested = delay, applied, "Frame delay clamped");
        }
        self.config.frame_delay = applied;
        applied
    }

    pub(super) fn record_saved(&mut self, frame: Frame, checksum: u64, state: Option<Vec<u8>>) {
        if self.snapshots.complete(frame, checksum, state) {
            self.stats.last_checksum = Some((frame, checksum));
        } else {
            tracing::debug!(frame, "Ignoring save reply for a frame no longer retained");
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Snapshot, step and reconcile one frame
    pub(super) fn tick(&mut self, lifecycle: &Lifecycle) -> Result<Stats, SessionError> {
        if let Some(transport) = self.transport.as_mut() {
            transport.poll();
        }
        self.drain_inbox();

        let frame = self.clock.current_frame;
        // Confirmations at the oldest retained frame are still reconciled
        let oldest = self.clock.window_start();
        self.save(frame);
        let local = self.confirm_local(frame);
        let remote = self.timeline.resolve_remote(frame);
        self.step(frame, local, remote);
        self.clock.advance();

        let current_frame = self.clock.current_frame;
        match find_divergence(&self.timeline, oldest..current_frame) {
            Some(divergence) => {
                self.timeline.settle(oldest..divergence.frame);
                self.rollback(divergence, lifecycle)?;
            }
            None => self.timeline.settle(oldest..current_frame),
        }

        let window_start = self.clock.window_start();
        self.snapshots.evict_before(window_start);
        self.timeline.prune(window_start);

        if lifecycle.get() != SessionState::Running {
            return Err(SessionError::InvalidState {
                operation: "finish tick",
                state: lifecycle.get(),
            });
        }

        let stats = self.sample_stats();
        if let Some(telemetry) = self.telemetry.as_mut() {
            telemetry.record(&stats);
        }
        Ok(stats)
    }

    /// Local input for `frame`, sending neutral controls to the peer when
    /// nothing was captured for it
    fn confirm_local(&mut self, frame: Frame) -> InputBits {
        if self.timeline.fill_local(frame) {
            tracing::trace!(frame, "No local input captured, sending neutral");
            if let Some(transport) = self.transport.as_mut() {
                transport.send_local_input(frame, InputBits::NEUTRAL);
            }
        }
        self.timeline.local_input(frame)
    }

    fn save(&mut self, frame: Frame) {
        self.snapshots.reserve(frame);
        self.port.submit(SimRequest::Save { frame });
    }

    fn step(&mut self, frame: Frame, local: InputBits, remote: RemoteInput) {
        if remote.is_predicted() {
            self.stats.predicted_frames += 1;
        }
        tracing::trace!(
            frame,
            local = local.bits(),
            remote = remote.bits().bits(),
            predicted = remote.is_predicted(),
            "Step"
        );
        self.port.submit(SimRequest::Step {
            frame,
            local,
            remote: remote.bits(),
        });
    }

    /// Restore the state before `divergence.frame` and replay up to the
    /// current frame with corrected input
    fn rollback(&mut self, divergence: Divergence, lifecycle: &Lifecycle) -> Result<(), SessionError> {
        let target = divergence.frame;
        let end = self.clock.current_frame;
        tracing::debug!(
            frame = target,
            depth = end - target,
            predicted = divergence.predicted.bits(),
            confirmed = divergence.confirmed.bits(),
            "Rolling back"
        );

        let state = self.snapshots.load(target)?.state().map(<[u8]>::to_vec);
        self.port.submit(SimRequest::Load {
            frame: target,
            state,
        });

        for frame in target..end {
            if lifecycle.get() != SessionState::Running {
                return Err(SessionError::InvalidState {
                    operation: "replay",
                    state: lifecycle.get(),
                });
            }
            // Later snapshots captured the mispredicted history
            if frame > target {
                self.save(frame);
            }
            let local = self.timeline.local_input(frame);
            let remote = self.timeline.refresh_remote(frame);
            self.step(frame, local, remote);
            self.stats.resimulated_frames += 1;
        }

        self.clock.rollback_count += 1;
        Ok(())
    }

    pub(super) fn sample_stats(&self) -> Stats {
        Stats {
            current_frame: self.clock.current_frame,
            rollback_count: self.clock.rollback_count,
            frame_delay: self.timeline.frame_delay(),
            ..self.stats
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Checksum at `frame` if every remote input before it is confirmed and
    /// reconciled, i.e. the value a peer with the same inputs must also report
    pub(super) fn confirmed_checksum(&self, frame: Frame) -> Option<u64> {
        if frame > self.timeline.remote_confirmed_until() {
            return None;
        }
        if find_divergence(&self.timeline, self.clock.window_start()..frame).is_some() {
            return None;
        }
        self.snapshots.checksum(frame)
    }

    pub(super) fn transport_events(&mut self) -> Vec<TransportEvent> {
        self.transport
            .as_mut()
            .map(|transport| transport.drain_events())
            .unwrap_or_default()
    }
}

/// Reject input that sets bits outside `mask`
pub(crate) fn validate_input(bits: InputBits, mask: u32) -> Result<InputBits, SessionError> {
    if bits.fits(mask) {
        Ok(bits)
    } else {
        Err(SessionError::MalformedInput {
            bits: bits.bits(),
            mask,
        })
    }
}
