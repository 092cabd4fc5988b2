use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::engine::utils::{manhattan, offset};
use crate::map::TileMap;
use crate::types::{Direction, Vec2};

/// 4-directional A* with a Manhattan heuristic. Returns the cells from
/// `start` to `goal` inclusive, or an empty route when the goal is off the
/// grid, blocked, or unreachable. Jail tiles are only crossed with
/// `allow_gate`.
pub fn find_path(map: &TileMap, start: Vec2, goal: Vec2, allow_gate: bool) -> Vec<Vec2> {
    if !map.is_passable(start.x, start.y, allow_gate) || !map.is_passable(goal.x, goal.y, allow_gate)
    {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    // (f, insertion order) keeps expansion deterministic among equal scores.
    let mut open: BinaryHeap<Reverse<(i32, u32, i32, i32)>> = BinaryHeap::new();
    let mut came_from: HashMap<Vec2, Vec2> = HashMap::new();
    let mut g_score: HashMap<Vec2, i32> = HashMap::new();
    let mut order = 0u32;

    g_score.insert(start, 0);
    open.push(Reverse((manhattan(start, goal), order, start.x, start.y)));

    while let Some(Reverse((_, _, x, y))) = open.pop() {
        let current = Vec2::new(x, y);
        if current == goal {
            return reconstruct(&came_from, goal);
        }
        let current_g = g_score.get(&current).copied().unwrap_or(i32::MAX);
        for dir in Direction::ALL {
            let next = offset(current, dir);
            if !map.is_passable(next.x, next.y, allow_gate) {
                continue;
            }
            let tentative = current_g + 1;
            if tentative < g_score.get(&next).copied().unwrap_or(i32::MAX) {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                order += 1;
                open.push(Reverse((
                    tentative + manhattan(next, goal),
                    order,
                    next.x,
                    next.y,
                )));
            }
        }
    }
    Vec::new()
}

fn reconstruct(came_from: &HashMap<Vec2, Vec2>, goal: Vec2) -> Vec<Vec2> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from.get(&current) {
        path.push(*prev);
        current = *prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapTemplate, Tile};

    fn assert_contiguous(path: &[Vec2]) {
        for pair in path.windows(2) {
            assert_eq!(manhattan(pair[0], pair[1]), 1, "{pair:?}");
        }
    }

    #[test]
    fn finds_shortest_route_across_open_row() {
        let map = TileMap::from_template(MapTemplate::Easy);
        let path = find_path(&map, Vec2::new(1, 1), Vec2::new(12, 1), false);
        assert_eq!(path.len(), 12);
        assert_eq!(path.first(), Some(&Vec2::new(1, 1)));
        assert_eq!(path.last(), Some(&Vec2::new(12, 1)));
        assert_contiguous(&path);
    }

    #[test]
    fn route_without_gate_permission_avoids_jail_tiles() {
        let map = TileMap::from_template(MapTemplate::Hard);
        for (start, goal) in [
            (Vec2::new(1, 1), Vec2::new(26, 20)),
            (Vec2::new(9, 8), Vec2::new(18, 13)),
            (Vec2::new(6, 10), Vec2::new(21, 10)),
        ] {
            let path = find_path(&map, start, goal, false);
            assert!(!path.is_empty());
            assert_contiguous(&path);
            for cell in &path {
                let tile = map.get(cell.x, cell.y);
                assert!(tile.is_some_and(|tile| tile != Tile::Wall && !tile.is_jail()));
            }
        }
    }

    #[test]
    fn gate_permission_opens_the_jail() {
        let map = TileMap::from_template(MapTemplate::Easy);
        let inside = Vec2::new(12, 6);
        assert!(find_path(&map, inside, Vec2::new(13, 4), false).is_empty());
        let path = find_path(&map, inside, Vec2::new(13, 4), true);
        assert!(!path.is_empty());
        assert!(path
            .iter()
            .any(|cell| map.get(cell.x, cell.y) == Some(Tile::JailGate)));
    }

    #[test]
    fn unreachable_or_out_of_bounds_goal_is_empty() {
        let map = TileMap::from_template(MapTemplate::Easy);
        assert!(find_path(&map, Vec2::new(1, 1), Vec2::new(40, 1), true).is_empty());
        assert!(find_path(&map, Vec2::new(1, 1), Vec2::new(0, 0), true).is_empty());
        assert_eq!(
            find_path(&map, Vec2::new(1, 1), Vec2::new(1, 1), false),
            vec![Vec2::new(1, 1)]
        );
    }
}
