use crate::map::TileMap;
use crate::rng::Rng;
use crate::types::{Direction, GhostKind, GhostMode, GhostPhase, Vec2};

use super::entity::{destination, Entity};
use super::targeting::{chase_target, flee_target, Pursuit, TargetContext};
use super::utils::{euclid, random_cell};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GhostState {
    Jailed { ticks: u32 },
    Releasing,
    Active,
    Eaten,
}

impl GhostState {
    pub fn phase(self) -> GhostPhase {
        match self {
            Self::Jailed { .. } => GhostPhase::Jailed,
            Self::Releasing => GhostPhase::Releasing,
            Self::Active => GhostPhase::Active,
            Self::Eaten => GhostPhase::Eaten,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ghost {
    pub kind: GhostKind,
    pub body: Entity,
    pub state: GhostState,
    /// Direction picked this tick; applied whenever the body next settles.
    pub heading: Direction,
    pub target: Vec2,
    pub spawn: Vec2,
    pub jail_exit: Vec2,
    jail_duration: u32,
}

impl Ghost {
    pub fn new(kind: GhostKind, spawn: Vec2, jail_exit: Vec2, jail_duration: u32, speed: f64) -> Self {
        Self {
            kind,
            body: Entity::new(spawn, speed, true),
            state: GhostState::Jailed {
                ticks: jail_duration,
            },
            heading: Direction::Right,
            target: jail_exit,
            spawn,
            jail_exit,
            jail_duration,
        }
    }

    pub fn cell(&self) -> Vec2 {
        self.body.cell
    }

    pub fn is_tangible(&self) -> bool {
        matches!(self.state, GhostState::Releasing | GhostState::Active)
    }

    pub fn in_jail(&self) -> bool {
        matches!(self.state, GhostState::Jailed { .. } | GhostState::Releasing)
    }

    /// Jail and gate tiles are open to this ghost right now.
    pub fn may_cross_gate(&self) -> bool {
        self.in_jail() || self.state == GhostState::Eaten
    }

    pub fn set_eaten(&mut self) {
        self.state = GhostState::Eaten;
        self.heading = Direction::Up;
    }

    /// Runs the jail timer. Returns false while the ghost must stay put.
    pub fn tick_jail(&mut self) -> bool {
        match self.state {
            GhostState::Jailed { ticks } if ticks > 0 => {
                self.state = GhostState::Jailed { ticks: ticks - 1 };
                return false;
            }
            GhostState::Jailed { .. } => {
                self.state = GhostState::Releasing;
                self.heading = Direction::Up;
            }
            _ => {}
        }
        if self.state == GhostState::Releasing && self.body.cell.y <= self.jail_exit.y {
            self.state = GhostState::Active;
        }
        true
    }

    pub fn retarget(
        &mut self,
        mode: GhostMode,
        pursuit: Option<Pursuit>,
        reference: Vec2,
        map: &TileMap,
        rng: &mut Rng,
    ) {
        self.target = match self.state {
            GhostState::Eaten => self.spawn,
            GhostState::Jailed { .. } | GhostState::Releasing => self.jail_exit,
            GhostState::Active => match (mode, pursuit) {
                (GhostMode::Scatter, _) | (GhostMode::Chase, None) => self.kind.scatter_corner(),
                (GhostMode::Frightened, Some(Pursuit::Pair(one, two))) => flee_target(
                    self.body.cell,
                    one.cell,
                    two.cell,
                    map.width(),
                    map.height(),
                )
                .unwrap_or_else(|| random_cell(rng, map.width(), map.height())),
                (GhostMode::Frightened, _) => random_cell(rng, map.width(), map.height()),
                (GhostMode::Chase, Some(pursuit)) => chase_target(
                    self.kind,
                    &TargetContext {
                        ghost: self.body.cell,
                        scatter: self.kind.scatter_corner(),
                        reference,
                        pursuit,
                    },
                ),
            },
        };
    }

    /// Best non-reverse legal direction toward `target`; the reverse only when
    /// nothing else is legal. `None` holds position.
    pub fn choose_direction(&self, map: &TileMap) -> Option<Direction> {
        let reverse = self.heading.opposite();
        let mut best: Option<(Direction, f64)> = None;
        for dir in Direction::ALL {
            if dir == reverse {
                continue;
            }
            let Some(next) = self.legal_step(map, dir) else {
                continue;
            };
            let dist = euclid(next, self.target);
            if best.map_or(true, |(_, current)| dist < current) {
                best = Some((dir, dist));
            }
        }
        if let Some((dir, _)) = best {
            return Some(dir);
        }
        self.legal_step(map, reverse).map(|_| reverse)
    }

    fn legal_step(&self, map: &TileMap, dir: Direction) -> Option<Vec2> {
        let (next, _) = destination(map, self.body.cell, dir)?;
        let tile = map.get(next.x, next.y)?;
        if !map.is_passable(next.x, next.y, true) {
            return None;
        }
        if tile.is_jail() {
            if !self.may_cross_gate() {
                return None;
            }
            if self.in_jail()
                && euclid(next, self.jail_exit) > euclid(self.body.cell, self.jail_exit)
            {
                return None;
            }
        }
        Some(next)
    }

    /// Steers, moves and handles the eaten ghost reaching home.
    pub fn step(&mut self, map: &mut TileMap) {
        if let Some(dir) = self.choose_direction(map) {
            self.heading = dir;
            self.body.advance(Some(dir), map);
        } else {
            self.body.advance(None, map);
        }
        if self.state == GhostState::Eaten && self.body.cell == self.spawn && self.body.is_settled()
        {
            self.respawn();
        }
    }

    fn respawn(&mut self) {
        self.body.place(self.spawn);
        self.state = GhostState::Jailed {
            ticks: self.jail_duration,
        };
        self.heading = Direction::Up;
    }
}
