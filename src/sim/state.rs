//! Game state and core simulation types
//!
//! The simulation holds only positions and stats keyed by opaque ids.
//! Presentation layers map ids to their own visual handles by observing
//! state after each tick.

use glam::IVec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::grid::{Grid, MapParams, Tile};
use super::rng::seeded;
use crate::Direction;
use crate::consts::*;
use crate::settings::MatchSettings;

/// Opaque entity handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Opaque bomb handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BombId(pub u32);

/// Who drives an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// Human player slot (1 or 2)
    Player(u8),
    /// AI agent by index
    Ai(u8),
}

/// Position and radius of a (real or hypothetical) bomb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastSource {
    pub pos: IVec2,
    pub radius: u32,
}

/// An armed bomb
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bomb {
    pub id: BombId,
    pub pos: IVec2,
    /// Time left before detonation (ms)
    pub timer_ms: f32,
    /// Full fuse length (ms)
    pub fuse_ms: f32,
    pub radius: u32,
    pub owner: EntityId,
    /// Blast rays continue through destructibles
    pub pierce: bool,
}

impl Bomb {
    #[inline]
    pub fn source(&self) -> BlastSource {
        BlastSource {
            pos: self.pos,
            radius: self.radius,
        }
    }

    /// Remaining fuse as 0-1 (for pulsing visuals)
    pub fn fuse_fraction(&self) -> f32 {
        if self.fuse_ms <= 0.0 {
            return 0.0;
        }
        (self.timer_ms / self.fuse_ms).clamp(0.0, 1.0)
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUpKind {
    BombUp,
    FireUp,
    SpeedUp,
    Kick,
    Throw,
    Pierce,
    Shield,
    Ghost,
}

impl PowerUpKind {
    /// Drop table, most common first
    pub const DROP_TABLE: [PowerUpKind; 8] = [
        PowerUpKind::BombUp,
        PowerUpKind::FireUp,
        PowerUpKind::SpeedUp,
        PowerUpKind::BombUp,
        PowerUpKind::FireUp,
        PowerUpKind::Kick,
        PowerUpKind::Shield,
        PowerUpKind::Pierce,
    ];

    /// Rare drops rolled separately from the main table
    pub const RARE: [PowerUpKind; 2] = [PowerUpKind::Throw, PowerUpKind::Ghost];
}

/// A power-up lying on the floor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerUp {
    pub pos: IVec2,
    pub kind: PowerUpKind,
    /// Tick it appeared on (blasts in that same tick leave it alone)
    pub spawned_tick: u64,
}

/// Result of a blast hitting an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitResult {
    Shielded,
    Damaged,
    Defeated,
}

/// A player or AI agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub controller: Controller,
    pub pos: IVec2,
    pub facing: Direction,
    pub lives: i32,
    /// Damage immunity left (ms)
    pub invulnerable_ms: f32,
    pub shield: u32,
    pub max_bombs: u32,
    /// Bombs currently armed
    pub active_bombs: u32,
    pub blast_radius: u32,
    /// Speed stat (1 = base)
    pub speed: u32,
    /// Time until the next move is allowed (ms)
    pub move_cooldown_ms: f32,
    pub can_kick: bool,
    pub can_throw: bool,
    pub pierce: bool,
    /// Ghost time left (ms)
    pub ghost_ms: f32,
    /// Time until the next AI bomb decision (ms)
    pub think_cooldown_ms: f32,
}

impl Entity {
    pub fn new(id: EntityId, controller: Controller, pos: IVec2, lives: i32) -> Self {
        Self {
            id,
            controller,
            pos,
            facing: Direction::Down,
            lives,
            invulnerable_ms: 0.0,
            shield: 0,
            max_bombs: START_MAX_BOMBS,
            active_bombs: 0,
            blast_radius: START_BLAST_RADIUS,
            speed: 1,
            move_cooldown_ms: 0.0,
            can_kick: false,
            can_throw: false,
            pierce: false,
            ghost_ms: 0.0,
            think_cooldown_ms: 0.0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ms > 0.0
    }

    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.ghost_ms > 0.0
    }

    #[inline]
    pub fn is_ai(&self) -> bool {
        matches!(self.controller, Controller::Ai(_))
    }

    pub fn can_place_bomb(&self) -> bool {
        self.is_alive() && self.active_bombs < self.max_bombs
    }

    /// Apply one point of blast damage. `None` if the hit was ignored.
    pub fn take_hit(&mut self, invulnerability_ms: f32) -> Option<HitResult> {
        if !self.is_alive() || self.is_invulnerable() {
            return None;
        }
        self.invulnerable_ms = invulnerability_ms;
        if self.shield > 0 {
            self.shield -= 1;
            return Some(HitResult::Shielded);
        }
        self.lives -= 1;
        Some(if self.is_alive() {
            HitResult::Damaged
        } else {
            HitResult::Defeated
        })
    }

    pub fn apply_powerup(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::BombUp => self.max_bombs = (self.max_bombs + 1).min(MAX_BOMBS_CAP),
            PowerUpKind::FireUp => {
                self.blast_radius = (self.blast_radius + 1).min(MAX_BLAST_RADIUS)
            }
            PowerUpKind::SpeedUp => self.speed = (self.speed + 1).min(MAX_SPEED),
            PowerUpKind::Kick => self.can_kick = true,
            PowerUpKind::Throw => self.can_throw = true,
            PowerUpKind::Pierce => self.pierce = true,
            PowerUpKind::Shield => self.shield += 1,
            PowerUpKind::Ghost => self.ghost_ms = GHOST_MS,
        }
    }
}

/// Current phase of the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// `winner` is `None` for a draw
    GameOver { winner: Option<EntityId> },
}

/// Things that happened, for stats/achievement/presentation collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BombPlaced {
        bomb: BombId,
        owner: EntityId,
        pos: IVec2,
    },
    BombDetonated {
        bomb: BombId,
        owner: EntityId,
        pos: IVec2,
        tiles: Vec<IVec2>,
        /// Set off by another bomb's blast
        chained: bool,
    },
    BombKicked {
        bomb: BombId,
        from: IVec2,
        to: IVec2,
    },
    BombThrown {
        bomb: BombId,
        from: IVec2,
        to: IVec2,
    },
    BlockDestroyed {
        pos: IVec2,
    },
    PowerUpSpawned {
        pos: IVec2,
        kind: PowerUpKind,
    },
    PowerUpBurned {
        pos: IVec2,
        kind: PowerUpKind,
    },
    PowerUpCollected {
        entity: EntityId,
        kind: PowerUpKind,
    },
    EntityDamaged {
        entity: EntityId,
        by: EntityId,
        result: HitResult,
        lives_left: i32,
    },
    EntityDefeated {
        entity: EntityId,
        by: EntityId,
    },
    MatchOver {
        winner: Option<EntityId>,
    },
}

/// Everything a tick produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickOutcome {
    /// Events in the order they happened (includes mutator events since the last tick)
    pub events: Vec<GameEvent>,
    pub blocks_destroyed: u32,
    pub bombs_detonated: u32,
    /// Entities defeated this tick
    pub enemies_defeated: Vec<EntityId>,
    /// Longest chain this tick (1 = a lone detonation, 0 = none)
    pub chain_reaction_length: u32,
}

/// Complete match state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Match seed
    pub seed: u64,
    pub settings: MatchSettings,
    pub(crate) grid: Grid,
    /// Armed bombs (sorted by id)
    pub(crate) bombs: Vec<Bomb>,
    /// Entities (sorted by id; defeated ones stay)
    pub(crate) entities: Vec<Entity>,
    pub(crate) powerups: Vec<PowerUp>,
    pub(crate) phase: GamePhase,
    /// Elapsed match time (ms)
    pub time_ms: f32,
    pub time_ticks: u64,
    pub(crate) rng: Pcg32,
    /// Events raised by mutators between ticks
    pub(crate) pending_events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Empty match on a generated map
    pub fn new(settings: MatchSettings, map: &MapParams, seed: u64) -> Self {
        let mut rng = seeded(seed);
        let grid = Grid::generate(map, &mut rng);
        Self::from_parts(settings, grid, rng, seed)
    }

    /// Empty match on a prepared grid
    pub fn with_grid(settings: MatchSettings, grid: Grid, seed: u64) -> Self {
        Self::from_parts(settings, grid, seeded(seed), seed)
    }

    fn from_parts(settings: MatchSettings, grid: Grid, rng: Pcg32, seed: u64) -> Self {
        Self {
            seed,
            settings,
            grid,
            bombs: Vec::new(),
            entities: Vec::new(),
            powerups: Vec::new(),
            phase: GamePhase::Playing,
            time_ms: 0.0,
            time_ticks: 0,
            rng,
            pending_events: Vec::new(),
            next_id: 1,
        }
    }

    /// Generated map with humans then AI agents on the spawn corners (max 4 total)
    pub fn new_match(
        settings: MatchSettings,
        map: &MapParams,
        seed: u64,
        players: u8,
        ai_agents: u8,
    ) -> Self {
        let mut state = Self::new(settings, map, seed);
        let controllers = (1..=players)
            .map(Controller::Player)
            .chain((0..ai_agents).map(Controller::Ai));
        for (spawn, controller) in state.grid.spawn_points().into_iter().zip(controllers) {
            state.add_entity(controller, spawn);
        }
        log::info!(
            "Match started: seed={}, difficulty={}, entities={}",
            seed,
            state.settings.difficulty.as_str(),
            state.entities.len()
        );
        state
    }

    /// Allocate a new id (shared by entities and bombs)
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add an entity on a free, walkable tile
    pub fn add_entity(&mut self, controller: Controller, pos: IVec2) -> Option<EntityId> {
        if !self.grid.is_walkable(pos) || self.live_entity_at(pos).is_some() {
            return None;
        }
        let id = EntityId(self.next_entity_id());
        let lives = self.settings.starting_lives;
        self.entities.push(Entity::new(id, controller, pos, lives));
        Some(id)
    }

    // === Queries ===

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Tile at (x, y); off-grid reads as `Wall`
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        self.grid.tile(IVec2::new(x, y))
    }

    pub fn bombs(&self) -> &[Bomb] {
        &self.bombs
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn powerups(&self) -> &[PowerUp] {
        &self.powerups
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn bomb_at(&self, pos: IVec2) -> Option<&Bomb> {
        self.bombs.iter().find(|b| b.pos == pos)
    }

    pub fn live_entity_at(&self, pos: IVec2) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.is_alive() && e.pos == pos)
    }

    pub fn live_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_alive())
    }

    /// Ensure collections are sorted by id for stable iteration
    pub fn normalize_order(&mut self) {
        self.bombs.sort_by_key(|b| b.id);
        self.entities.sort_by_key(|e| e.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_hit_shield_then_lives() {
        let mut e = Entity::new(EntityId(1), Controller::Player(1), IVec2::ONE, 2);
        e.apply_powerup(PowerUpKind::Shield);

        assert_eq!(e.take_hit(1000.0), Some(HitResult::Shielded));
        assert_eq!(e.lives, 2);
        // Still invulnerable
        assert_eq!(e.take_hit(1000.0), None);

        e.invulnerable_ms = 0.0;
        assert_eq!(e.take_hit(1000.0), Some(HitResult::Damaged));
        e.invulnerable_ms = 0.0;
        assert_eq!(e.take_hit(1000.0), Some(HitResult::Defeated));
        assert!(!e.is_alive());

        e.invulnerable_ms = 0.0;
        assert_eq!(e.take_hit(1000.0), None);
        assert_eq!(e.lives, 0);
    }

    #[test]
    fn test_powerup_caps() {
        let mut e = Entity::new(EntityId(1), Controller::Ai(0), IVec2::ONE, 3);
        for _ in 0..20 {
            e.apply_powerup(PowerUpKind::FireUp);
            e.apply_powerup(PowerUpKind::BombUp);
            e.apply_powerup(PowerUpKind::SpeedUp);
        }
        assert_eq!(e.blast_radius, MAX_BLAST_RADIUS);
        assert_eq!(e.max_bombs, MAX_BOMBS_CAP);
        assert_eq!(e.speed, MAX_SPEED);
    }

    #[test]
    fn test_fuse_fraction() {
        let mut bomb = Bomb {
            id: BombId(1),
            pos: IVec2::ONE,
            timer_ms: 2500.0,
            fuse_ms: 2500.0,
            radius: 2,
            owner: EntityId(1),
            pierce: false,
        };
        assert_eq!(bomb.fuse_fraction(), 1.0);
        bomb.timer_ms = 625.0;
        assert!((bomb.fuse_fraction() - 0.25).abs() < 1e-6);
        bomb.timer_ms = -10.0;
        assert_eq!(bomb.fuse_fraction(), 0.0);
    }

    #[test]
    fn test_new_match_spawns_on_corners() {
        let state = GameState::new_match(MatchSettings::default(), &MapParams::default(), 1, 1, 3);
        assert_eq!(state.entities().len(), 4);
        let spawns = state.grid().spawn_points();
        for (entity, spawn) in state.entities().iter().zip(spawns) {
            assert_eq!(entity.pos, spawn);
            assert_eq!(entity.lives, state.settings.starting_lives);
        }
        assert_eq!(state.entities()[0].controller, Controller::Player(1));
        assert!(state.entities()[1].is_ai());
    }

    #[test]
    fn test_add_entity_rejects_blocked_tiles() {
        let grid = Grid::from_rows(&["#####", "#.+.#", "#####"]).unwrap();
        let mut state = GameState::with_grid(MatchSettings::default(), grid, 3);
        assert!(state.add_entity(Controller::Player(1), IVec2::new(2, 1)).is_none());
        assert!(state.add_entity(Controller::Player(1), IVec2::new(0, 0)).is_none());
        assert!(state.add_entity(Controller::Player(1), IVec2::new(1, 1)).is_some());
        assert!(state.add_entity(Controller::Ai(0), IVec2::new(1, 1)).is_none());
    }
}
