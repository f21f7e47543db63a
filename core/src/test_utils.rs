//! Shared test utilities for session and transport tests

use std::sync::{Arc, Mutex, MutexGuard};

use bytemuck::{Pod, Zeroable};
use hashbrown::HashMap;

use riposte_shared::{Frame, InputBits, SimRequest};

use crate::rollback::{Session, SessionHandle, SimulationPort};

// ============================================================================
// Deterministic Test Game
// ============================================================================

/// Minimal two-fighter game state
///
/// Plain old data so snapshots are a byte copy and checksums are a hash of
/// the bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FighterState {
    pub frames_stepped: u32,
    pub p1_x: i32,
    pub p1_hp: u32,
    pub p2_x: i32,
    pub p2_hp: u32,
    /// Order-sensitive fold of every input pair seen
    pub history: u32,
}

const RIGHT: u32 = 0b0001;
const LEFT: u32 = 0b0010;
const ATTACK: u32 = 0b0100;

impl FighterState {
    pub fn new() -> Self {
        Self {
            p1_hp: 100,
            p2_hp: 100,
            p2_x: 50,
            ..Default::default()
        }
    }

    /// Advance one frame with player one and player two input
    pub fn step(&mut self, p1: InputBits, p2: InputBits) {
        self.p1_x += walk(p1);
        self.p2_x += walk(p2);
        if p1.bits() & ATTACK != 0 {
            self.p2_hp = self.p2_hp.saturating_sub(1);
        }
        if p2.bits() & ATTACK != 0 {
            self.p1_hp = self.p1_hp.saturating_sub(1);
        }
        self.history = self
            .history
            .rotate_left(5)
            .wrapping_mul(31)
            .wrapping_add((p1.bits() << 16) | p2.bits());
        self.frames_stepped += 1;
    }

    pub fn checksum(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(bytemuck::bytes_of(self))
    }
}

fn walk(bits: InputBits) -> i32 {
    match (bits.bits() & RIGHT != 0, bits.bits() & LEFT != 0) {
        (true, false) => 1,
        (false, true) => -1,
        _ => 0,
    }
}

// ============================================================================
// Test Simulation Collaborator
// ============================================================================

#[derive(Default)]
pub struct TestSimulationInner {
    pub state: FighterState,
    pub saved: HashMap<Frame, FighterState>,
    pub requests: Vec<SimRequest>,
    /// Replies go here when attached
    pub handle: Option<SessionHandle>,
    /// Include state bytes in `Saved` replies
    pub reply_with_state: bool,
    /// This peer controls player two
    pub player_two: bool,
}

/// Recording, deterministic simulation collaborator
///
/// Clones share state, so a test keeps one clone for inspection and hands
/// the other to the session.
#[derive(Clone, Default)]
pub struct TestSimulation {
    inner: Arc<Mutex<TestSimulationInner>>,
}

impl TestSimulation {
    pub fn new() -> Self {
        let sim = Self::default();
        sim.lock().state = FighterState::new();
        sim
    }

    /// Collaborator for the peer controlling player two
    pub fn player_two() -> Self {
        let sim = Self::new();
        sim.lock().player_two = true;
        sim
    }

    /// Send `Saved` replies to `handle`
    pub fn attach(&self, handle: SessionHandle) {
        self.lock().handle = Some(handle);
    }

    pub fn reply_with_state(&self, enabled: bool) {
        self.lock().reply_with_state = enabled;
    }

    pub fn lock(&self) -> MutexGuard<'_, TestSimulationInner> {
        self.inner.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<SimRequest> {
        self.lock().requests.clone()
    }

    pub fn take_requests(&self) -> Vec<SimRequest> {
        std::mem::take(&mut self.lock().requests)
    }

    pub fn state(&self) -> FighterState {
        self.lock().state
    }
}

impl SimulationPort for TestSimulation {
    fn submit(&mut self, request: SimRequest) {
        let mut inner = self.lock();
        inner.requests.push(request.clone());
        match request {
            SimRequest::Save { frame } => {
                let state = inner.state;
                inner.saved.insert(frame, state);
                if let Some(handle) = &inner.handle {
                    let bytes = inner
                        .reply_with_state
                        .then(|| bytemuck::bytes_of(&state).to_vec());
                    let _ = handle.saved(frame, state.checksum(), bytes);
                }
            }
            SimRequest::Load { frame, state } => {
                inner.state = match state {
                    Some(bytes) => bytemuck::pod_read_unaligned(&bytes),
                    None => inner.saved[&frame],
                };
            }
            SimRequest::Step {
                local, remote, ..
            } => {
                let (p1, p2) = if inner.player_two {
                    (remote, local)
                } else {
                    (local, remote)
                };
                inner.state.step(p1, p2);
            }
        }
    }
}

// ============================================================================
// Session Helpers
// ============================================================================

/// Running session wired to a fresh [`TestSimulation`]
pub fn running_session(
    frame_delay: u32,
    max_rollback: u32,
) -> (Session<TestSimulation>, TestSimulation) {
    let sim = TestSimulation::new();
    let session = Session::new(sim.clone());
    sim.attach(session.handle());
    session.init(frame_delay, max_rollback).unwrap();
    (session, sim)
}

/// Frames of every `Step` request, in order
pub fn step_frames(requests: &[SimRequest]) -> Vec<Frame> {
    requests
        .iter()
        .filter_map(|r| match r {
            SimRequest::Step { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect()
}

/// Frames of every `Load` request, in order
pub fn load_frames(requests: &[SimRequest]) -> Vec<Frame> {
    requests
        .iter()
        .filter_map(|r| match r {
            SimRequest::Load { frame, .. } => Some(*frame),
            _ => None,
        })
        .collect()
}
