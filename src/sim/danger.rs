//! Danger and blast analysis
//!
//! Two related models that differ on destructibles:
//! - [`is_position_safe`]: the AI's danger check. Walls and destructibles both
//!   stop a danger line, and pierce is ignored.
//! - [`blast_tiles`]: the tiles a detonation actually hits. A ray includes the
//!   first destructible it meets (and may pierce through it).

use glam::IVec2;

use super::grid::{Grid, Tile};
use super::state::{BlastSource, Bomb};
use crate::Direction;

/// Whether `pos` is outside every bomb's danger lines.
///
/// `additional` is a hypothetical bomb checked alongside the real ones
/// ("would this tile be safe if I placed a bomb there?"). Off-grid is unsafe.
pub fn is_position_safe(
    pos: IVec2,
    grid: &Grid,
    bombs: &[Bomb],
    additional: Option<BlastSource>,
) -> bool {
    if !grid.in_bounds(pos) {
        return false;
    }
    !bombs
        .iter()
        .map(Bomb::source)
        .chain(additional)
        .any(|source| threatens(grid, source, pos))
}

/// Whether a single bomb's danger lines reach `pos`
pub fn threatens(grid: &Grid, source: BlastSource, pos: IVec2) -> bool {
    if pos == source.pos {
        return true;
    }
    let offset = pos - source.pos;
    if offset.x != 0 && offset.y != 0 {
        return false;
    }
    let dist = offset.x.abs() + offset.y.abs();
    if dist > source.radius as i32 {
        return false;
    }

    let step = offset.signum();
    !(1..dist).any(|d| grid.blocks_blast(source.pos + step * d))
}

/// Tiles hit by a detonation: the bomb tile first, then each ray in
/// [`Direction::ALL`] order. Rays stop before walls and the grid edge, and
/// include then stop at a destructible unless `pierce` is set.
pub fn blast_tiles(grid: &Grid, origin: IVec2, radius: u32, pierce: bool) -> Vec<IVec2> {
    let mut tiles = Vec::with_capacity(1 + 4 * radius as usize);
    tiles.push(origin);

    for dir in Direction::ALL {
        let step = dir.delta();
        for d in 1..=radius as i32 {
            let pos = origin + step * d;
            match grid.tile(pos) {
                Tile::Wall => break,
                Tile::Destructible => {
                    tiles.push(pos);
                    if !pierce {
                        break;
                    }
                }
                Tile::Empty => tiles.push(pos),
            }
        }
    }
    tiles
}
