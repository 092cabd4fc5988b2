use crate::map::{Tile, TileMap};
use crate::types::{Direction, Vec2};

use super::utils::{cell_pixel, offset};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Still sliding toward the current cell.
    Sliding,
    /// Snapped and stayed put (no direction, or the move was refused).
    Blocked,
    Stepped,
    /// Crossed a tunnel; pixel position was set directly.
    Wrapped,
}

/// Grid cell plus a pixel position that converges on it.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub cell: Vec2,
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub last_dir: Direction,
    pub speed: f64,
    pub ate_dot: bool,
    /// Ghost bodies may stand on jail tiles and never eat dots.
    pub ghost_body: bool,
}

impl Entity {
    pub fn new(cell: Vec2, speed: f64, ghost_body: bool) -> Self {
        let (pixel_x, pixel_y) = cell_pixel(cell);
        Self {
            cell,
            pixel_x,
            pixel_y,
            last_dir: Direction::Right,
            speed,
            ate_dot: false,
            ghost_body,
        }
    }

    /// Puts the entity on `cell` with no sliding.
    pub fn place(&mut self, cell: Vec2) {
        self.cell = cell;
        let (pixel_x, pixel_y) = cell_pixel(cell);
        self.pixel_x = pixel_x;
        self.pixel_y = pixel_y;
    }

    pub fn target_pixel(&self) -> (f64, f64) {
        cell_pixel(self.cell)
    }

    /// True once the pixel position is within one tick of the cell.
    pub fn is_settled(&self) -> bool {
        let (tx, ty) = self.target_pixel();
        (self.pixel_x - tx).abs() < self.speed && (self.pixel_y - ty).abs() < self.speed
    }

    pub fn advance(&mut self, dir: Option<Direction>, map: &mut TileMap) -> MoveOutcome {
        self.ate_dot = false;
        let (tx, ty) = self.target_pixel();
        self.pixel_x = approach(self.pixel_x, tx, self.speed);
        self.pixel_y = approach(self.pixel_y, ty, self.speed);

        if !self.is_settled() {
            return MoveOutcome::Sliding;
        }
        self.pixel_x = tx;
        self.pixel_y = ty;

        let Some(dir) = dir else {
            return MoveOutcome::Blocked;
        };
        let Some((next, wrapped)) = destination(map, self.cell, dir) else {
            return MoveOutcome::Blocked;
        };
        if !map.is_passable(next.x, next.y, self.ghost_body) {
            return MoveOutcome::Blocked;
        }

        self.last_dir = dir;
        if wrapped {
            self.place(next);
        } else {
            self.cell = next;
        }
        if !self.ghost_body && map.get(next.x, next.y) == Some(Tile::Dot) {
            map.set(next.x, next.y, Tile::Empty);
            self.ate_dot = true;
        }
        if wrapped {
            MoveOutcome::Wrapped
        } else {
            MoveOutcome::Stepped
        }
    }
}

/// Neighbour of `cell` along `dir`, and whether reaching it crosses a tunnel.
/// Leaving the grid is only possible sideways from a tunnel tile.
pub(crate) fn destination(map: &TileMap, cell: Vec2, dir: Direction) -> Option<(Vec2, bool)> {
    let next = offset(cell, dir);
    if map.in_bounds(next.x, next.y) {
        return Some((next, false));
    }
    if !dir.is_horizontal() || map.get(cell.x, cell.y) != Some(Tile::Tunnel) {
        return None;
    }
    let x = if next.x < 0 { map.width() - 1 } else { 0 };
    if map.get(x, cell.y) != Some(Tile::Tunnel) {
        return None;
    }
    Some((Vec2::new(x, cell.y), true))
}

fn approach(value: f64, target: f64, step: f64) -> f64 {
    if value < target {
        (value + step).min(target)
    } else if value > target {
        (value - step).max(target)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TILE_SIZE;
    use crate::map::MapTemplate;

    fn easy_map() -> TileMap {
        TileMap::from_template(MapTemplate::Easy)
    }

    #[test]
    fn pixel_moves_less_than_two_speeds_per_tick() {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(1, 1), 0.75, false);
        let dirs = [Direction::Right, Direction::Down, Direction::Left, Direction::Up];
        for tick in 0..2_000 {
            let before = (entity.pixel_x, entity.pixel_y);
            let outcome = entity.advance(Some(dirs[(tick / 200) % 4]), &mut map);
            if outcome == MoveOutcome::Wrapped {
                continue;
            }
            assert!((entity.pixel_x - before.0).abs() < 2.0 * entity.speed);
            assert!((entity.pixel_y - before.1).abs() < 2.0 * entity.speed);
        }
    }

    fn ticks_per_cell(speed: f64) -> u32 {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(1, 1), speed, false);
        assert_eq!(entity.advance(Some(Direction::Right), &mut map), MoveOutcome::Stepped);
        let mut ticks = 0;
        loop {
            ticks += 1;
            match entity.advance(Some(Direction::Right), &mut map) {
                MoveOutcome::Sliding => {}
                MoveOutcome::Stepped => return ticks,
                other => panic!("unexpected {other:?} after {ticks} ticks"),
            }
        }
    }

    #[test]
    fn snaps_and_steps_once_within_one_tick_of_the_cell() {
        assert_eq!(ticks_per_cell(0.75), 33);
        assert_eq!(ticks_per_cell(0.9), 27);
        assert_eq!(ticks_per_cell(1.05), 23);
    }

    #[test]
    fn snap_lands_exactly_on_the_cell_pixel() {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(1, 1), 0.75, false);
        entity.advance(Some(Direction::Right), &mut map);
        for _ in 0..32 {
            assert_eq!(entity.advance(None, &mut map), MoveOutcome::Sliding);
        }
        assert_eq!(entity.advance(None, &mut map), MoveOutcome::Blocked);
        assert_eq!(entity.pixel_x, 2.0 * TILE_SIZE);
        assert_eq!(entity.pixel_y, TILE_SIZE);
    }

    #[test]
    fn pixel_never_overshoots_cell() {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(1, 1), 1.05, false);
        entity.advance(Some(Direction::Right), &mut map);
        for _ in 0..30 {
            entity.advance(None, &mut map);
            let (tx, _) = entity.target_pixel();
            assert!(entity.pixel_x <= tx);
        }
        assert_eq!(entity.pixel_x, 2.0 * TILE_SIZE);
    }

    #[test]
    fn tunnel_wraps_left_edge_to_right_edge_in_one_tick() {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(0, 4), 0.75, false);
        let outcome = entity.advance(Some(Direction::Left), &mut map);
        assert_eq!(outcome, MoveOutcome::Wrapped);
        assert_eq!(entity.cell, Vec2::new(27, 4));
        assert_eq!(entity.pixel_x, 27.0 * TILE_SIZE);
        assert_eq!(entity.pixel_y, 4.0 * TILE_SIZE);
    }

    #[test]
    fn walls_and_jail_block_players() {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(1, 1), 0.75, false);
        assert_eq!(entity.advance(Some(Direction::Up), &mut map), MoveOutcome::Blocked);
        assert_eq!(entity.cell, Vec2::new(1, 1));

        let mut player = Entity::new(Vec2::new(12, 4), 0.75, false);
        assert_eq!(player.advance(Some(Direction::Down), &mut map), MoveOutcome::Blocked);

        let mut ghost = Entity::new(Vec2::new(12, 4), 0.75, true);
        assert_eq!(ghost.advance(Some(Direction::Down), &mut map), MoveOutcome::Stepped);
        assert_eq!(ghost.cell, Vec2::new(12, 5));
    }

    #[test]
    fn stepping_onto_dot_eats_it_for_players_only() {
        let mut map = easy_map();
        let mut ghost = Entity::new(Vec2::new(1, 1), 0.75, true);
        ghost.advance(Some(Direction::Right), &mut map);
        assert!(!ghost.ate_dot);
        assert_eq!(map.get(2, 1), Some(Tile::Dot));

        let mut player = Entity::new(Vec2::new(1, 1), 0.75, false);
        player.advance(Some(Direction::Right), &mut map);
        assert!(player.ate_dot);
        assert_eq!(map.get(2, 1), Some(Tile::Empty));
        player.advance(Some(Direction::Right), &mut map);
        assert!(!player.ate_dot);
    }

    #[test]
    fn refused_move_keeps_last_direction() {
        let mut map = easy_map();
        let mut entity = Entity::new(Vec2::new(1, 1), 0.75, false);
        entity.last_dir = Direction::Down;
        entity.advance(Some(Direction::Up), &mut map);
        assert_eq!(entity.last_dir, Direction::Down);
    }
}
