use crate::constants::{FRIGHTENED_TICKS, TICK_RATE};
use crate::types::GhostMode;

/// Scatter/chase phase for a global tick, ignoring the frightened timer.
pub fn cycle_mode(tick: u64, scatter_secs: u32, chase_secs: u32) -> GhostMode {
    let period = u64::from(scatter_secs) + u64::from(chase_secs);
    if period == 0 {
        return GhostMode::Chase;
    }
    let elapsed_secs = tick / u64::from(TICK_RATE);
    if elapsed_secs % period < u64::from(scatter_secs) {
        GhostMode::Scatter
    } else {
        GhostMode::Chase
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModeCycle {
    scatter_secs: u32,
    chase_secs: u32,
    frightened_ticks: u32,
    current: GhostMode,
}

impl ModeCycle {
    pub fn new(scatter_secs: u32, chase_secs: u32) -> Self {
        Self {
            scatter_secs,
            chase_secs,
            frightened_ticks: 0,
            current: GhostMode::Scatter,
        }
    }

    pub fn current(&self) -> GhostMode {
        self.current
    }

    pub fn frightened_ticks(&self) -> u32 {
        self.frightened_ticks
    }

    /// Runs once per unfrozen tick before anything moves.
    pub fn advance(&mut self, global_tick: u64) -> GhostMode {
        if self.frightened_ticks > 0 {
            self.frightened_ticks -= 1;
            self.current = GhostMode::Frightened;
        } else {
            self.current = cycle_mode(global_tick, self.scatter_secs, self.chase_secs);
        }
        self.current
    }

    /// Power-pellet pickup. An already running timer is left alone.
    pub fn frighten(&mut self) {
        if self.frightened_ticks == 0 {
            self.frightened_ticks = FRIGHTENED_TICKS;
        }
        self.current = GhostMode::Frightened;
    }

    /// Overwrites the cycle with host-reported values.
    pub fn sync(&mut self, mode: GhostMode, frightened_ticks: u32) {
        self.current = mode;
        self.frightened_ticks = frightened_ticks;
    }
}
