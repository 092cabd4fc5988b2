use crate::constants::{
    AMBUSH_LOOKAHEAD, FLANK_LOOKAHEAD, FLEE_DISTANCE, THRESHOLD_DUO, THRESHOLD_SOLO,
};
use crate::types::{Direction, GhostKind, Vec2};

use super::utils::{euclid, lookahead, midpoint};

/// What a ghost knows about one living player when picking a target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quarry {
    pub cell: Vec2,
    pub dir: Direction,
    pub dots_eaten: u32,
}

/// Living players, in slot order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pursuit {
    Single(Quarry),
    Pair(Quarry, Quarry),
}

/// Inputs every strategy reads. `reference` is the first ghost's cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetContext {
    pub ghost: Vec2,
    pub scatter: Vec2,
    pub reference: Vec2,
    pub pursuit: Pursuit,
}

pub fn chase_target(kind: GhostKind, ctx: &TargetContext) -> Vec2 {
    match (kind, ctx.pursuit) {
        (GhostKind::Direct, Pursuit::Single(player)) => player.cell,
        (GhostKind::Direct, Pursuit::Pair(one, two)) => direct_pair(ctx.ghost, one, two),
        (GhostKind::Ambusher, Pursuit::Single(player)) => {
            lookahead(player.cell, player.dir, AMBUSH_LOOKAHEAD)
        }
        (GhostKind::Ambusher, Pursuit::Pair(one, two)) => ambush_pair(one, two),
        (GhostKind::Flanker, Pursuit::Single(player)) => {
            let pivot = lookahead(player.cell, player.dir, FLANK_LOOKAHEAD);
            reflect(ctx.reference, pivot)
        }
        (GhostKind::Flanker, Pursuit::Pair(one, two)) => {
            reflect(ctx.reference, midpoint(one.cell, two.cell))
        }
        (GhostKind::Threshold, Pursuit::Single(player)) => {
            if euclid(ctx.ghost, player.cell) > THRESHOLD_SOLO {
                player.cell
            } else {
                ctx.scatter
            }
        }
        (GhostKind::Threshold, Pursuit::Pair(one, two)) => threshold_pair(ctx, one, two),
    }
}

/// Point `FLEE_DISTANCE` tiles from the ghost, directly away from the
/// players' midpoint, clamped to the grid. `None` when the ghost sits on the
/// midpoint or is already pinned against the edge it would flee to.
pub fn flee_target(ghost: Vec2, one: Vec2, two: Vec2, width: i32, height: i32) -> Option<Vec2> {
    let center = midpoint(one, two);
    let dx = f64::from(ghost.x - center.x);
    let dy = f64::from(ghost.y - center.y);
    let dist = dx.hypot(dy);
    if dist <= 0.1 {
        return None;
    }
    let x = ghost.x + (dx / dist * FLEE_DISTANCE) as i32;
    let y = ghost.y + (dy / dist * FLEE_DISTANCE) as i32;
    let target = Vec2::new(
        x.clamp(0, (width - 1).max(0)),
        y.clamp(0, (height - 1).max(0)),
    );
    (target != ghost).then_some(target)
}

fn direct_pair(ghost: Vec2, one: Quarry, two: Quarry) -> Vec2 {
    let d1 = euclid(ghost, one.cell);
    let d2 = euclid(ghost, two.cell);
    if d2 < d1 || (d2 == d1 && two.dots_eaten > one.dots_eaten) {
        two.cell
    } else {
        one.cell
    }
}

fn ambush_pair(one: Quarry, two: Quarry) -> Vec2 {
    let center = midpoint(one.cell, two.cell);
    let ahead1 = lookahead(one.cell, one.dir, AMBUSH_LOOKAHEAD);
    let ahead2 = lookahead(two.cell, two.dir, AMBUSH_LOOKAHEAD);
    if euclid(ahead1, center) > euclid(ahead2, center) {
        ahead1
    } else {
        ahead2
    }
}

fn threshold_pair(ctx: &TargetContext, one: Quarry, two: Quarry) -> Vec2 {
    let d1 = euclid(ctx.ghost, one.cell);
    let d2 = euclid(ctx.ghost, two.cell);
    if d1 < THRESHOLD_DUO || d2 < THRESHOLD_DUO {
        return ctx.scatter;
    }
    if d1 < d2 {
        one.cell
    } else {
        two.cell
    }
}

fn reflect(reference: Vec2, pivot: Vec2) -> Vec2 {
    Vec2::new(
        reference.x + 2 * (pivot.x - reference.x),
        reference.y + 2 * (pivot.y - reference.y),
    )
}
