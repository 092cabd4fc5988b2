use std::time::Duration;

pub const TICK_RATE: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);
pub const BROADCAST_PERIOD: Duration = Duration::from_millis(33);

pub const TILE_SIZE: f64 = 25.0;
/// Player/ghost contact distance as a fraction of one tile.
pub const COLLISION_FACTOR: f64 = 0.7;

pub const FRIGHTENED_TICKS: u32 = 720;
pub const DEATH_FREEZE_TICKS: u32 = 60;

pub const BONUS_SPAWN_INTERVAL: u32 = 1_800;
pub const FRUIT_SPAWN_CHANCE: f32 = 0.15;
pub const KEY_SPAWN_CHANCE: f32 = 0.05;
pub const KEY_RESCUE_RADIUS: f64 = 8.0;

pub const DOT_POINTS: i32 = 10;
pub const PELLET_POINTS: i32 = 50;
pub const GHOST_POINTS: i32 = 200;
pub const FRUIT_POINTS_STEP: i32 = 100;
pub const KEY_POINTS: i32 = 1_000;

pub const AMBUSH_LOOKAHEAD: i32 = 4;
pub const FLANK_LOOKAHEAD: i32 = 2;
pub const THRESHOLD_SOLO: f64 = 4.0;
pub const THRESHOLD_DUO: f64 = 8.0;
pub const FLEE_DISTANCE: f64 = 10.0;

/// Display interpolation window for remote entities.
pub const INTERPOLATION_WINDOW: Duration = Duration::from_millis(33);
/// Ticks over which a mispredicted local player is pulled onto the host's position.
pub const RECONCILE_TICKS: u32 = 6;

/// Ghosts simulated as the match escalates with power-pellets eaten.
pub fn active_ghost_count(pellets_eaten: u32) -> usize {
    if pellets_eaten >= 2 {
        return 4;
    }
    if pellets_eaten >= 1 {
        return 3;
    }
    2
}

pub fn scaled_points(base: i32, multiplier: f64) -> i32 {
    (base as f64 * multiplier) as i32
}
