//! Escape planner
//!
//! Breadth-first search from an entity's tile to the nearest tile outside all
//! danger. Only the first step is returned; agents re-plan every tick.

use std::collections::VecDeque;

use glam::IVec2;

use super::danger::is_position_safe;
use super::grid::Grid;
use super::state::{BlastSource, Bomb};
use crate::Direction;
use crate::consts::ESCAPE_MAX_DEPTH;

/// Read-only inputs shared by every step of the search
struct Search<'a> {
    grid: &'a Grid,
    bombs: &'a [Bomb],
    hypothetical: Option<BlastSource>,
    blocked: &'a [IVec2],
}

impl Search<'_> {
    /// Empty floor with no bomb (real or hypothetical) and no blocker
    fn is_open(&self, pos: IVec2) -> bool {
        self.grid.is_walkable(pos)
            && !self.bombs.iter().any(|b| b.pos == pos)
            && self.hypothetical.is_none_or(|h| h.pos != pos)
            && !self.blocked.contains(&pos)
    }
}

/// First step toward the nearest safe tile, or `None` if no safe tile is
/// reachable within [`ESCAPE_MAX_DEPTH`] steps.
///
/// Each open neighbour of `start` roots its own branch; ties at equal depth
/// resolve in [`Direction::ALL`] order. `hypothetical` is treated as an armed
/// bomb for both occupancy and safety.
pub fn find_escape_direction(
    start: IVec2,
    grid: &Grid,
    bombs: &[Bomb],
    hypothetical: Option<BlastSource>,
) -> Option<Direction> {
    find_escape_direction_avoiding(start, grid, bombs, hypothetical, &[])
}

/// [`find_escape_direction`] that also routes around `blocked` tiles
/// (typically other live entities).
pub fn find_escape_direction_avoiding(
    start: IVec2,
    grid: &Grid,
    bombs: &[Bomb],
    hypothetical: Option<BlastSource>,
    blocked: &[IVec2],
) -> Option<Direction> {
    let search = Search {
        grid,
        bombs,
        hypothetical,
        blocked,
    };
    let width = grid.width().max(0) as usize;
    let mut visited = vec![false; width * grid.height().max(0) as usize];
    let mut mark = |pos: IVec2| -> bool {
        if !grid.in_bounds(pos) {
            return false;
        }
        let i = pos.y as usize * width + pos.x as usize;
        !std::mem::replace(&mut visited[i], true)
    };
    mark(start);

    let mut queue: VecDeque<(IVec2, Direction, u32)> = VecDeque::new();
    for dir in Direction::ALL {
        let next = start + dir.delta();
        if search.is_open(next) && mark(next) {
            queue.push_back((next, dir, 1));
        }
    }

    while let Some((pos, first, depth)) = queue.pop_front() {
        if is_position_safe(pos, grid, bombs, hypothetical) {
            return Some(first);
        }
        if depth >= ESCAPE_MAX_DEPTH {
            continue;
        }
        for dir in Direction::ALL {
            let next = pos + dir.delta();
            if search.is_open(next) && mark(next) {
                queue.push_back((next, first, depth + 1));
            }
        }
    }

    None
}
