use crate::engine::ghost::GhostState;
use crate::map::Collectible;
use crate::types::{Direction, GhostMode, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub cell: Vec2,
    pub pixel_x: i32,
    pub pixel_y: i32,
    pub dir: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GhostSnapshot {
    pub cell: Vec2,
    pub pixel_x: i32,
    pub pixel_y: i32,
    pub eaten: bool,
    pub jailed: bool,
    pub jail_ticks: u32,
    pub dir: Direction,
}

impl GhostSnapshot {
    pub fn flags_for(state: GhostState) -> (bool, bool, u32) {
        match state {
            GhostState::Jailed { ticks } => (false, true, ticks),
            GhostState::Releasing => (false, true, 0),
            GhostState::Active => (false, false, 0),
            GhostState::Eaten => (true, false, 0),
        }
    }

    pub fn state(&self) -> GhostState {
        if self.eaten {
            GhostState::Eaten
        } else if self.jailed && self.jail_ticks > 0 {
            GhostState::Jailed {
                ticks: self.jail_ticks,
            }
        } else if self.jailed {
            GhostState::Releasing
        } else {
            GhostState::Active
        }
    }
}

/// Host-authoritative match state at one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Player two is `None` in solo matches.
    pub players: [Option<PlayerSnapshot>; 2],
    pub scores: [i32; 2],
    pub alive: [bool; 2],
    pub mode: GhostMode,
    pub frightened_ticks: u32,
    pub pellets_eaten: u32,
    pub has_key: [bool; 2],
    pub key_spawned: bool,
    pub ghosts: Vec<GhostSnapshot>,
    pub collectibles: Vec<Collectible>,
    pub seq: u64,
    pub global_tick: u64,
    pub sim_tick: u64,
}

/// Accepts a sequence number only if it is newer than every one seen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SequenceGate {
    last: Option<u64>,
}

impl SequenceGate {
    pub fn accept(&mut self, seq: u64) -> bool {
        if self.last.is_some_and(|last| seq <= last) {
            return false;
        }
        self.last = Some(seq);
        true
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }
}
