//! Demo game and collaborator used by the CLI commands
//!
//! The game is deliberately tiny: two fighters on a line who walk, jump and
//! attack. It exists so the session has a real deterministic state to save,
//! load and checksum.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use riposte_core::SessionHandle;
use riposte_shared::constants::MAX_ROLLBACK_LIMIT;
use riposte_shared::{Frame, InputBits, SimRequest};

const RIGHT: u32 = 1 << 0;
const LEFT: u32 = 1 << 1;
const JUMP: u32 = 1 << 2;
const ATTACK: u32 = 1 << 4;

const STAGE_WIDTH: i32 = 320;
const ATTACK_RANGE: i32 = 24;

/// Plain old data so a snapshot is a byte copy
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable, Serialize)]
pub struct DemoState {
    pub frame: u32,
    pub p1_x: i32,
    pub p1_y: i32,
    pub p1_hp: i32,
    pub p2_x: i32,
    pub p2_y: i32,
    pub p2_hp: i32,
    pub hits: u32,
}

impl DemoState {
    pub fn new() -> Self {
        Self {
            p1_x: 80,
            p1_hp: 1000,
            p2_x: 240,
            p2_hp: 1000,
            ..Default::default()
        }
    }

    pub fn step(&mut self, p1: InputBits, p2: InputBits) {
        move_fighter(&mut self.p1_x, &mut self.p1_y, p1.bits());
        move_fighter(&mut self.p2_x, &mut self.p2_y, p2.bits());

        let in_range = (self.p1_x - self.p2_x).abs() <= ATTACK_RANGE;
        if in_range && p1.bits() & ATTACK != 0 && self.p2_y == 0 {
            self.p2_hp -= 7;
            self.hits += 1;
        }
        if in_range && p2.bits() & ATTACK != 0 && self.p1_y == 0 {
            self.p1_hp -= 7;
            self.hits += 1;
        }
        self.frame += 1;
    }

    pub fn checksum(&self) -> u64 {
        xxhash_rust::xxh3::xxh3_64(bytemuck::bytes_of(self))
    }
}

fn move_fighter(x: &mut i32, y: &mut i32, bits: u32) {
    if bits & RIGHT != 0 {
        *x += 2;
    }
    if bits & LEFT != 0 {
        *x -= 2;
    }
    *x = (*x).clamp(0, STAGE_WIDTH);

    if *y > 0 {
        *y -= 1;
    } else if bits & JUMP != 0 {
        *y = 12;
    }
}

/// Deterministic collaborator answering a session's requests
pub struct DemoSimulation {
    state: DemoState,
    saved: HashMap<Frame, DemoState>,
    replies: SessionHandle,
    player_two: bool,
}

impl DemoSimulation {
    /// `player_two` selects which fighter the local input drives
    pub fn new(replies: SessionHandle, player_two: bool) -> Self {
        Self {
            state: DemoState::new(),
            saved: HashMap::new(),
            replies,
            player_two,
        }
    }

    pub fn state(&self) -> &DemoState {
        &self.state
    }

    pub fn apply(&mut self, request: SimRequest) {
        match request {
            SimRequest::Save { frame } => {
                self.saved.insert(frame, self.state);
                if let Some(stale) = frame.checked_sub(MAX_ROLLBACK_LIMIT + 1) {
                    self.saved.remove(&stale);
                }
                if let Err(e) = self.replies.saved(frame, self.state.checksum(), None) {
                    tracing::debug!(frame, error = %e, "Session gone, dropping save reply");
                }
            }
            SimRequest::Load { frame, state } => {
                let restored = state
                    .and_then(|bytes| bytemuck::try_pod_read_unaligned(&bytes).ok())
                    .or_else(|| self.saved.get(&frame).copied());
                match restored {
                    Some(restored) => self.state = restored,
                    None => tracing::warn!(frame, "No saved state to load"),
                }
            }
            SimRequest::Step { local, remote, .. } => {
                let (p1, p2) = if self.player_two {
                    (remote, local)
                } else {
                    (local, remote)
                };
                self.state.step(p1, p2);
            }
        }
    }
}

/// Seeded stand-in for a human on a controller
///
/// Holds each input for a few frames before picking a new one, like a player
/// would, so predictions are right most of the time.
pub struct InputScript {
    rng: Pcg32,
    current: InputBits,
}

impl InputScript {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            current: InputBits::NEUTRAL,
        }
    }

    pub fn next_input(&mut self) -> InputBits {
        if self.rng.random_bool(0.15) {
            const MOVES: [u32; 7] = [0, RIGHT, LEFT, JUMP, ATTACK, RIGHT | ATTACK, LEFT | JUMP];
            self.current = InputBits::new(MOVES[self.rng.random_range(0..MOVES.len())]);
        }
        self.current
    }
}
