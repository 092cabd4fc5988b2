use crate::map::{MapTemplate, TileMap};
use crate::types::{Difficulty, Role, Vec2};

/// Per-difficulty tuning fixed at match start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyProfile {
    /// Pixels per tick for every entity.
    pub speed: f64,
    pub scatter_secs: u32,
    pub chase_secs: u32,
    pub point_multiplier: f64,
    pub jail_ticks: u32,
    pub map: MapTemplate,
    pub player_spawns: [Vec2; 2],
    pub ghost_spawn: Vec2,
}

impl DifficultyProfile {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self {
                speed: 0.75,
                scatter_secs: 10,
                chase_secs: 10,
                point_multiplier: 0.8,
                jail_ticks: 600,
                map: MapTemplate::Easy,
                player_spawns: [Vec2::new(14, 10), Vec2::new(13, 10)],
                ghost_spawn: Vec2::new(13, 6),
            },
            Difficulty::Normal => Self {
                speed: 0.75,
                scatter_secs: 8,
                chase_secs: 12,
                point_multiplier: 1.0,
                jail_ticks: 480,
                map: MapTemplate::Easy,
                player_spawns: [Vec2::new(14, 10), Vec2::new(13, 10)],
                ghost_spawn: Vec2::new(13, 10),
            },
            Difficulty::Hard => Self {
                speed: 0.9,
                scatter_secs: 7,
                chase_secs: 15,
                point_multiplier: 1.2,
                jail_ticks: 360,
                map: MapTemplate::Hard,
                player_spawns: [Vec2::new(14, 16), Vec2::new(13, 16)],
                ghost_spawn: Vec2::new(13, 11),
            },
            Difficulty::Insane => Self {
                speed: 1.05,
                scatter_secs: 6,
                chase_secs: 20,
                point_multiplier: 1.5,
                jail_ticks: 240,
                map: MapTemplate::Hard,
                player_spawns: [Vec2::new(14, 16), Vec2::new(13, 16)],
                ghost_spawn: Vec2::new(13, 10),
            },
        }
    }

    /// The column of the ghost spawn, on the row just outside the jail.
    pub fn jail_exit(&self, map: &TileMap) -> Vec2 {
        let spawn = map.clamp(self.ghost_spawn);
        let row = if map.height() == 12 { 4 } else { 8 };
        map.clamp(Vec2::new(spawn.x, row))
    }
}

/// Everything needed to build one match. Threaded explicitly into the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchConfig {
    pub difficulty: Difficulty,
    pub role: Role,
    pub seed: u32,
}

impl MatchConfig {
    pub fn new(difficulty: Difficulty, role: Role, seed: u32) -> Self {
        Self {
            difficulty,
            role,
            seed,
        }
    }

    pub fn profile(&self) -> DifficultyProfile {
        DifficultyProfile::for_difficulty(self.difficulty)
    }
}
