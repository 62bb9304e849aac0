//! Tile grid and map generation
//!
//! The grid is fixed-size for a whole match. The outer border is always
//! `Wall`, and the only mutation ever applied is `Destructible -> Empty`.
//! Every lookup is bounds-checked and treats off-grid coordinates as `Wall`.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::rng::RandomSource;
use crate::consts::MIN_GRID_SIZE;

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    Wall,
    Destructible,
}

/// Visual theme, which also drives layout density
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Wall pillars, moderate crates
    #[default]
    Classic,
    /// No pillars, sparse crates
    Open,
    /// Wall pillars, packed crates
    Fortress,
}

impl Theme {
    /// Whether (even, even) pillar tiles are walls
    pub fn has_pillars(&self) -> bool {
        !matches!(self, Theme::Open)
    }

    /// Chance that a free tile starts as a destructible
    pub fn destructible_density(&self) -> f64 {
        match self {
            Theme::Classic => 0.55,
            Theme::Open => 0.45,
            Theme::Fortress => 0.75,
        }
    }
}

/// Map generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapParams {
    pub width: i32,
    pub height: i32,
    pub theme: Theme,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            width: 13,
            height: 11,
            theme: Theme::Classic,
        }
    }
}

impl MapParams {
    /// Dimensions clamped to the minimum and bumped to odd values
    pub fn dimensions(&self) -> (i32, i32) {
        let fix = |n: i32| {
            let n = n.max(MIN_GRID_SIZE);
            if n % 2 == 0 { n + 1 } else { n }
        };
        (fix(self.width), fix(self.height))
    }
}

/// Fixed-size tile grid (row-major)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Open grid: border walls, everything else empty
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(3);
        let height = height.max(3);
        let mut grid = Self {
            width,
            height,
            tiles: vec![Tile::Empty; (width * height) as usize],
        };
        grid.seal_border();
        grid
    }

    /// Build from ASCII rows: `#` wall, `+` destructible, anything else empty.
    /// The border is forced to `Wall`. Returns `None` for ragged or tiny input.
    pub fn from_rows(rows: &[&str]) -> Option<Self> {
        let height = rows.len() as i32;
        let width = rows.first()?.chars().count() as i32;
        if width < 3 || height < 3 || rows.iter().any(|r| r.chars().count() as i32 != width) {
            return None;
        }

        let tiles = rows
            .iter()
            .flat_map(|row| {
                row.chars().map(|c| match c {
                    '#' => Tile::Wall,
                    '+' => Tile::Destructible,
                    _ => Tile::Empty,
                })
            })
            .collect();

        let mut grid = Self {
            width,
            height,
            tiles,
        };
        grid.seal_border();
        Some(grid)
    }

    /// Generate a match map: border, theme pillars, random destructibles.
    /// Spawn corners and their two inward neighbours are left clear.
    pub fn generate(params: &MapParams, rng: &mut impl RandomSource) -> Self {
        let (width, height) = params.dimensions();
        let mut grid = Self::new(width, height);
        let safe: Vec<IVec2> = grid
            .spawn_points()
            .iter()
            .flat_map(|&s| {
                let inward = IVec2::new(
                    if s.x < width / 2 { 1 } else { -1 },
                    if s.y < height / 2 { 1 } else { -1 },
                );
                [s, s + IVec2::new(inward.x, 0), s + IVec2::new(0, inward.y)]
            })
            .collect();

        let density = params.theme.destructible_density();
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let pos = IVec2::new(x, y);
                if x % 2 == 0 && y % 2 == 0 && params.theme.has_pillars() {
                    grid.set(pos, Tile::Wall);
                } else if !safe.contains(&pos) && rng.chance(density) {
                    grid.set(pos, Tile::Destructible);
                }
            }
        }

        log::info!(
            "Generated {}x{} {:?} map with {} destructibles",
            width,
            height,
            params.theme,
            grid.destructible_count()
        );
        grid
    }

    fn seal_border(&mut self) {
        for x in 0..self.width {
            self.tiles[x as usize] = Tile::Wall;
            self.tiles[((self.height - 1) * self.width + x) as usize] = Tile::Wall;
        }
        for y in 0..self.height {
            self.tiles[(y * self.width) as usize] = Tile::Wall;
            self.tiles[(y * self.width + self.width - 1) as usize] = Tile::Wall;
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, pos: IVec2) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    #[inline]
    pub fn is_border(&self, pos: IVec2) -> bool {
        pos.x == 0 || pos.y == 0 || pos.x == self.width - 1 || pos.y == self.height - 1
    }

    fn index(&self, pos: IVec2) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Tile at `pos`, `None` off-grid
    pub fn get(&self, pos: IVec2) -> Option<Tile> {
        self.index(pos).map(|i| self.tiles[i])
    }

    /// Tile at `pos`; off-grid reads as `Wall`
    #[inline]
    pub fn tile(&self, pos: IVec2) -> Tile {
        self.get(pos).unwrap_or(Tile::Wall)
    }

    /// Whether a blast ray or danger line stops at this tile
    #[inline]
    pub fn blocks_blast(&self, pos: IVec2) -> bool {
        self.tile(pos) != Tile::Empty
    }

    /// Empty and on-grid (bomb occupancy is checked by callers)
    #[inline]
    pub fn is_walkable(&self, pos: IVec2) -> bool {
        self.tile(pos) == Tile::Empty
    }

    /// Overwrite an inner tile. Border tiles are never changed.
    pub fn set(&mut self, pos: IVec2, tile: Tile) -> bool {
        if self.is_border(pos) {
            return false;
        }
        match self.index(pos) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Turn a destructible into empty floor. Returns false for any other tile.
    pub fn destroy(&mut self, pos: IVec2) -> bool {
        match self.index(pos) {
            Some(i) if self.tiles[i] == Tile::Destructible => {
                self.tiles[i] = Tile::Empty;
                true
            }
            _ => false,
        }
    }

    pub fn destructible_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|&&t| t == Tile::Destructible)
            .count()
    }

    /// The four inner corners, in player-slot order
    pub fn spawn_points(&self) -> [IVec2; 4] {
        let (r, b) = (self.width - 2, self.height - 2);
        [
            IVec2::new(1, 1),
            IVec2::new(r, b),
            IVec2::new(r, 1),
            IVec2::new(1, b),
        ]
    }

    /// Row-major iterator over (position, tile)
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, Tile)> + '_ {
        self.tiles.iter().enumerate().map(|(i, &t)| {
            let i = i as i32;
            (IVec2::new(i % self.width, i / self.width), t)
        })
    }
}
