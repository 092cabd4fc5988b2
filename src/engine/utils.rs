use crate::constants::TILE_SIZE;
use crate::rng::Rng;
use crate::types::{Direction, Vec2};

/// Neighbouring cell one tile along `dir`, with no bounds or tunnel handling.
pub fn offset(cell: Vec2, dir: Direction) -> Vec2 {
    match dir {
        Direction::Up => Vec2::new(cell.x, cell.y - 1),
        Direction::Down => Vec2::new(cell.x, cell.y + 1),
        Direction::Left => Vec2::new(cell.x - 1, cell.y),
        Direction::Right => Vec2::new(cell.x + 1, cell.y),
    }
}

/// `cell` pushed `steps` tiles along `dir`. Looking ahead UP also shifts left
/// by the same amount, as the arcade targeting always has.
pub(crate) fn lookahead(cell: Vec2, dir: Direction, steps: i32) -> Vec2 {
    match dir {
        Direction::Up => Vec2::new(cell.x - steps, cell.y - steps),
        Direction::Down => Vec2::new(cell.x, cell.y + steps),
        Direction::Left => Vec2::new(cell.x - steps, cell.y),
        Direction::Right => Vec2::new(cell.x + steps, cell.y),
    }
}

pub(crate) fn euclid(a: Vec2, b: Vec2) -> f64 {
    f64::from(a.x - b.x).hypot(f64::from(a.y - b.y))
}

pub(crate) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Integer midpoint, truncating toward zero.
pub(crate) fn midpoint(a: Vec2, b: Vec2) -> Vec2 {
    Vec2::new((a.x + b.x) / 2, (a.y + b.y) / 2)
}

pub(crate) fn cell_pixel(cell: Vec2) -> (f64, f64) {
    (f64::from(cell.x) * TILE_SIZE, f64::from(cell.y) * TILE_SIZE)
}

pub(crate) fn pixel_distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    (ax - bx).hypot(ay - by)
}

pub(crate) fn random_cell(rng: &mut Rng, width: i32, height: i32) -> Vec2 {
    let x = rng.below(width);
    let y = rng.below(height);
    Vec2::new(x, y)
}
