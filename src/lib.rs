//! Bomb Arena - tile-grid arena combat core
//!
//! Core modules:
//! - `sim`: Tick-driven simulation (grid, bombs, danger analysis, escape planning, AI)
//! - `settings`: Difficulty tiers and per-match configuration
//! - `stats`: Match statistics built from tick outcomes
//!
//! Rendering, audio, input and persistence live outside this crate and observe
//! state through [`sim::GameState`] queries and [`sim::TickOutcome`] events.

pub mod settings;
pub mod sim;
pub mod stats;

pub use settings::{Difficulty, MatchSettings};
pub use stats::MatchStats;

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Game configuration constants
pub mod consts {
    /// Nominal frame step used by the headless runner (60 Hz)
    pub const SIM_DT_MS: f32 = 1000.0 / 60.0;

    /// Bomb fuse duration
    pub const FUSE_MS: f32 = 2500.0;
    /// Damage immunity after taking a hit
    pub const INVULNERABILITY_MS: f32 = 1500.0;
    /// Ghost power-up duration
    pub const GHOST_MS: f32 = 8000.0;

    /// Escape BFS depth cap (steps)
    pub const ESCAPE_MAX_DEPTH: u32 = 6;

    /// Movement interval at speed stat 1
    pub const BASE_MOVE_INTERVAL_MS: f32 = 220.0;
    /// Interval reduction per extra speed level
    pub const SPEED_STEP_MS: f32 = 25.0;
    /// Floor on the movement interval
    pub const MIN_MOVE_INTERVAL_MS: f32 = 90.0;
    pub const MAX_SPEED: u32 = 5;

    /// Starting stats
    pub const START_MAX_BOMBS: u32 = 1;
    pub const START_BLAST_RADIUS: u32 = 2;
    pub const MAX_BLAST_RADIUS: u32 = 8;
    pub const MAX_BOMBS_CAP: u32 = 8;

    /// How far a thrown bomb travels
    pub const THROW_DISTANCE: i32 = 3;

    pub const MIN_GRID_SIZE: i32 = 5;
}

/// Orthogonal step direction on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Fixed scan order used by blast rays and the escape BFS
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step. Up is -y (row 0 is the top border).
    #[inline]
    pub fn delta(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }

    /// Inverse of [`Direction::delta`]; `None` for zero or diagonal input
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            _ => None,
        }
    }
}

/// Manhattan distance between two tiles
#[inline]
pub fn manhattan(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x + d.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roundtrip() {
        for dir in Direction::ALL {
            let d = dir.delta();
            assert_eq!(Direction::from_delta(d.x, d.y), Some(dir));
        }
        assert_eq!(Direction::from_delta(1, 1), None);
        assert_eq!(Direction::from_delta(0, 0), None);
        assert_eq!(Direction::from_delta(2, 0), None);
    }

    #[test]
    fn test_manhattan() {
        assert_eq!(manhattan(IVec2::new(1, 1), IVec2::new(4, 3)), 5);
        assert_eq!(manhattan(IVec2::new(4, 3), IVec2::new(1, 1)), 5);
    }
}
