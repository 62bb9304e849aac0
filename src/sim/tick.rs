//! Simulation tick and player-facing mutators
//!
//! One tick runs to completion in a fixed order:
//! 1. age bombs and detonate expired ones (chains resolve in the same tick)
//! 2. AI decisions and movement, by entity id
//! 3. invulnerability and ghost countdowns
//! 4. session checks (time limit, last one standing)
//!
//! Invalid actions never panic; they are rejected and leave state untouched.

use std::collections::VecDeque;

use glam::IVec2;

use super::ai::{AiAction, AiView, choose_action};
use super::danger::blast_tiles;
use super::grid::Tile;
use super::rng::RandomSource;
use super::state::{
    Bomb, BombId, EntityId, GameEvent, GamePhase, GameState, HitResult, PowerUp, PowerUpKind,
    TickOutcome,
};
use crate::consts::THROW_DISTANCE;
use crate::{Direction, manhattan};

/// Chance that a drop comes from the rare table
const RARE_DROP_CHANCE: f64 = 0.1;

impl GameState {
    /// Advance the match by `dt_ms` milliseconds.
    ///
    /// The returned outcome also carries events raised by mutators since the
    /// previous tick. Callers poll grid/bomb/entity state afterwards.
    pub fn simulate_tick(&mut self, dt_ms: f32) -> TickOutcome {
        if self.phase != GamePhase::Playing {
            return TickOutcome::from_events(std::mem::take(&mut self.pending_events), 0);
        }

        let dt_ms = dt_ms.max(0.0);
        self.time_ticks += 1;
        self.time_ms += dt_ms;

        let chain = self.update_bombs(dt_ms);
        self.update_entities(dt_ms);
        self.update_timers(dt_ms);
        self.update_session();

        // Ensure deterministic ordering
        self.normalize_order();

        TickOutcome::from_events(std::mem::take(&mut self.pending_events), chain)
    }

    // === Mutators (input layer) ===

    /// Place a bomb for `owner` at (x, y). `blast_radius` overrides the
    /// owner's stat. Rejected if the owner is dead or at capacity, or the
    /// tile is not empty floor or already holds a bomb.
    pub fn place_bomb(
        &mut self,
        x: i32,
        y: i32,
        owner: EntityId,
        blast_radius: Option<u32>,
    ) -> Option<BombId> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        let pos = IVec2::new(x, y);
        let entity = self.entity(owner)?;
        if !entity.can_place_bomb() || !self.grid.is_walkable(pos) || self.bomb_at(pos).is_some()
        {
            return None;
        }
        let radius = blast_radius.unwrap_or(entity.blast_radius).max(1);
        let pierce = entity.pierce;

        let id = BombId(self.next_entity_id());
        let fuse_ms = self.settings.fuse_ms;
        self.bombs.push(Bomb {
            id,
            pos,
            timer_ms: fuse_ms,
            fuse_ms,
            radius,
            owner,
            pierce,
        });
        if let Some(entity) = self.entity_mut(owner) {
            entity.active_bombs += 1;
        }
        self.pending_events.push(GameEvent::BombPlaced {
            bomb: id,
            owner,
            pos,
        });
        Some(id)
    }

    /// Move an entity one tile. Returns whether it moved.
    pub fn request_move(&mut self, entity: EntityId, dx: i32, dy: i32) -> bool {
        match Direction::from_delta(dx, dy) {
            Some(dir) => self.try_move(entity, dir),
            None => false,
        }
    }

    /// Kick the bomb next to `entity` in direction (dx, dy)
    pub fn kick_bomb(&mut self, entity: EntityId, dx: i32, dy: i32) -> bool {
        let Some(dir) = Direction::from_delta(dx, dy) else {
            return false;
        };
        let Some(kicker) = self.entity(entity) else {
            return false;
        };
        if self.phase != GamePhase::Playing || !kicker.is_alive() || !kicker.can_kick {
            return false;
        }
        let target = kicker.pos + dir.delta();
        self.slide_bomb(target, dir)
    }

    /// Throw the bomb under `entity` (or just ahead of it) up to
    /// [`THROW_DISTANCE`] tiles, landing on the farthest free floor tile.
    pub fn throw_bomb(&mut self, entity: EntityId, dx: i32, dy: i32) -> bool {
        let Some(dir) = Direction::from_delta(dx, dy) else {
            return false;
        };
        let Some(thrower) = self.entity(entity) else {
            return false;
        };
        if self.phase != GamePhase::Playing || !thrower.is_alive() || !thrower.can_throw {
            return false;
        }
        let here = thrower.pos;
        let Some(from) = [here, here + dir.delta()]
            .into_iter()
            .find(|&p| self.bomb_at(p).is_some())
        else {
            return false;
        };

        let landing = (1..=THROW_DISTANCE)
            .rev()
            .map(|d| from + dir.delta() * d)
            .find(|&p| self.is_free_floor(p));
        let Some(to) = landing else {
            return false;
        };

        let Some(bomb) = self.bombs.iter_mut().find(|b| b.pos == from) else {
            return false;
        };
        bomb.pos = to;
        let id = bomb.id;
        self.pending_events.push(GameEvent::BombThrown { bomb: id, from, to });
        true
    }

    // === Movement ===

    /// Floor tile with no bomb and no live entity
    fn is_free_floor(&self, pos: IVec2) -> bool {
        self.grid.is_walkable(pos) && self.bomb_at(pos).is_none() && self.live_entity_at(pos).is_none()
    }

    pub(crate) fn try_move(&mut self, id: EntityId, dir: Direction) -> bool {
        if self.phase != GamePhase::Playing {
            return false;
        }
        let Some(mover) = self.entity_mut(id) else {
            return false;
        };
        if !mover.is_alive() || mover.move_cooldown_ms > 0.0 {
            return false;
        }
        mover.facing = dir;
        let (from, ghost, can_kick, speed) = (mover.pos, mover.is_ghost(), mover.can_kick, mover.speed);
        let to = from + dir.delta();

        let passable = match self.grid.get(to) {
            Some(Tile::Empty) => true,
            Some(Tile::Destructible) => ghost,
            _ => false,
        };
        if !passable || self.live_entity_at(to).is_some() {
            return false;
        }

        let interval = self.settings.move_interval_ms(speed);
        if self.bomb_at(to).is_some() && !ghost {
            if can_kick && self.slide_bomb(to, dir) {
                if let Some(kicker) = self.entity_mut(id) {
                    kicker.move_cooldown_ms = interval;
                }
            }
            return false;
        }

        if let Some(mover) = self.entity_mut(id) {
            mover.pos = to;
            mover.move_cooldown_ms = interval;
        }
        self.collect_powerup(id, to);
        true
    }

    /// Slide the bomb at `pos` until the next tile is blocked
    fn slide_bomb(&mut self, pos: IVec2, dir: Direction) -> bool {
        if self.bomb_at(pos).is_none() {
            return false;
        }
        let mut dest = pos;
        while self.is_free_floor(dest + dir.delta()) {
            dest += dir.delta();
        }
        if dest == pos {
            return false;
        }
        let Some(bomb) = self.bombs.iter_mut().find(|b| b.pos == pos) else {
            return false;
        };
        bomb.pos = dest;
        let id = bomb.id;
        self.pending_events.push(GameEvent::BombKicked {
            bomb: id,
            from: pos,
            to: dest,
        });
        true
    }

    fn collect_powerup(&mut self, id: EntityId, pos: IVec2) {
        let Some(index) = self.powerups.iter().position(|p| p.pos == pos) else {
            return;
        };
        let kind = self.powerups.remove(index).kind;
        if let Some(entity) = self.entity_mut(id) {
            entity.apply_powerup(kind);
        }
        self.pending_events
            .push(GameEvent::PowerUpCollected { entity: id, kind });
    }

    // === Bombs ===

    /// Age bombs and resolve detonations. Returns the longest chain length.
    fn update_bombs(&mut self, dt_ms: f32) -> u32 {
        for bomb in &mut self.bombs {
            bomb.timer_ms -= dt_ms;
        }

        let mut queue: VecDeque<(BombId, u32)> = self
            .bombs
            .iter()
            .filter(|b| b.timer_ms <= 0.0)
            .map(|b| (b.id, 1))
            .collect();
        let mut longest = 0;

        while let Some((id, depth)) = queue.pop_front() {
            let Some(index) = self.bombs.iter().position(|b| b.id == id) else {
                continue;
            };
            let bomb = self.bombs.remove(index);
            let tiles = blast_tiles(&self.grid, bomb.pos, bomb.radius, bomb.pierce);

            // Chain: every still-armed bomb inside this blast goes off this tick
            for other in &mut self.bombs {
                if other.timer_ms > 0.0 && tiles.contains(&other.pos) {
                    other.timer_ms = 0.0;
                    queue.push_back((other.id, depth + 1));
                }
            }

            longest = longest.max(depth);
            log::debug!(
                "Bomb {:?} at {} detonated ({} tiles, chain depth {})",
                bomb.id,
                bomb.pos,
                tiles.len(),
                depth
            );
            self.pending_events.push(GameEvent::BombDetonated {
                bomb: bomb.id,
                owner: bomb.owner,
                pos: bomb.pos,
                tiles: tiles.clone(),
                chained: depth > 1,
            });

            self.apply_blast(&bomb, &tiles);
            if let Some(owner) = self.entity_mut(bomb.owner) {
                owner.active_bombs = owner.active_bombs.saturating_sub(1);
            }
        }

        if longest > 1 {
            log::info!("Chain reaction of {} bombs", longest);
        }
        longest
    }

    fn apply_blast(&mut self, bomb: &Bomb, tiles: &[IVec2]) {
        let tick = self.time_ticks;

        // Older power-ups burn; drops from this tick survive the rest of the chain
        let mut burned = Vec::new();
        self.powerups.retain(|p| {
            let burn = p.spawned_tick < tick && tiles.contains(&p.pos);
            if burn {
                burned.push(GameEvent::PowerUpBurned {
                    pos: p.pos,
                    kind: p.kind,
                });
            }
            !burn
        });
        self.pending_events.extend(burned);

        for &pos in tiles {
            if !self.grid.destroy(pos) {
                continue;
            }
            self.pending_events.push(GameEvent::BlockDestroyed { pos });
            if self.rng.chance(self.settings.powerup_drop_rate) {
                let kind = roll_powerup(&mut self.rng);
                self.powerups.push(PowerUp {
                    pos,
                    kind,
                    spawned_tick: tick,
                });
                self.pending_events
                    .push(GameEvent::PowerUpSpawned { pos, kind });
            }
        }

        let invulnerability_ms = self.settings.invulnerability_ms;
        for entity in &mut self.entities {
            if !entity.is_alive() || !tiles.contains(&entity.pos) {
                continue;
            }
            let Some(result) = entity.take_hit(invulnerability_ms) else {
                continue;
            };
            self.pending_events.push(GameEvent::EntityDamaged {
                entity: entity.id,
                by: bomb.owner,
                result,
                lives_left: entity.lives,
            });
            if result == HitResult::Defeated {
                log::info!("Entity {:?} defeated by {:?}", entity.id, bomb.owner);
                self.pending_events.push(GameEvent::EntityDefeated {
                    entity: entity.id,
                    by: bomb.owner,
                });
            }
        }
    }

    // === Entities ===

    fn update_entities(&mut self, dt_ms: f32) {
        for entity in &mut self.entities {
            entity.move_cooldown_ms = (entity.move_cooldown_ms - dt_ms).max(0.0);
            entity.think_cooldown_ms = (entity.think_cooldown_ms - dt_ms).max(0.0);
        }

        let agents: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| e.is_ai() && e.is_alive())
            .map(|e| e.id)
            .collect();
        for id in agents {
            self.run_agent(id);
        }
    }

    fn run_agent(&mut self, id: EntityId) {
        let Some(me) = self.entity(id).cloned() else {
            return;
        };
        // Defeated earlier this tick, or still mid-step
        if !me.is_alive() || me.move_cooldown_ms > 0.0 {
            return;
        }

        let target = self
            .live_entities()
            .filter(|e| e.id != id)
            .min_by_key(|e| (manhattan(me.pos, e.pos), e.id))
            .map(|e| e.pos);
        let occupied: Vec<IVec2> = self
            .live_entities()
            .filter(|e| e.id != id)
            .map(|e| e.pos)
            .collect();
        let think_ready = me.think_cooldown_ms <= 0.0;

        let view = AiView {
            grid: &self.grid,
            bombs: &self.bombs,
            powerups: &self.powerups,
            occupied: &occupied,
        };
        let action = choose_action(
            &me,
            target,
            &view,
            self.settings.difficulty,
            think_ready,
            &mut self.rng,
        );

        if think_ready {
            let interval = self.settings.ai_think_interval_ms;
            if let Some(agent) = self.entity_mut(id) {
                agent.think_cooldown_ms = interval;
            }
        }

        match action {
            AiAction::Stay => {}
            AiAction::Move(dir) => {
                self.try_move(id, dir);
            }
            AiAction::PlaceBomb { escape } => {
                if self.place_bomb(me.pos.x, me.pos.y, id, None).is_some() {
                    self.try_move(id, escape);
                }
            }
        }
    }

    /// Count down status timers. Invulnerability granted by a hit this tick
    /// starts counting on the next tick.
    fn update_timers(&mut self, dt_ms: f32) {
        let hit_now: Vec<EntityId> = self
            .pending_events
            .iter()
            .filter_map(|event| match event {
                GameEvent::EntityDamaged { entity, .. } => Some(*entity),
                _ => None,
            })
            .collect();
        for entity in &mut self.entities {
            if !hit_now.contains(&entity.id) {
                entity.invulnerable_ms = (entity.invulnerable_ms - dt_ms).max(0.0);
            }
            entity.ghost_ms = (entity.ghost_ms - dt_ms).max(0.0);
        }
    }

    // === Session ===

    fn update_session(&mut self) {
        let timed_out = self
            .settings
            .time_limit_ms
            .is_some_and(|limit| self.time_ms >= limit);

        let alive: Vec<EntityId> = self.live_entities().map(|e| e.id).collect();
        let last_standing = if self.entities.len() >= 2 {
            match alive.as_slice() {
                [] => Some(None),
                [winner] => Some(Some(*winner)),
                _ => None,
            }
        } else {
            None
        };

        let winner = match (last_standing, timed_out) {
            (Some(winner), _) => winner,
            (None, true) => None,
            (None, false) => return,
        };

        self.phase = GamePhase::GameOver { winner };
        log::info!(
            "Match over after {:.1}s: winner {:?}",
            self.time_ms / 1000.0,
            winner
        );
        self.pending_events.push(GameEvent::MatchOver { winner });
    }
}

fn roll_powerup(rng: &mut impl RandomSource) -> PowerUpKind {
    if rng.chance(RARE_DROP_CHANCE) {
        PowerUpKind::RARE[rng.pick(PowerUpKind::RARE.len())]
    } else {
        PowerUpKind::DROP_TABLE[rng.pick(PowerUpKind::DROP_TABLE.len())]
    }
}

impl TickOutcome {
    /// Summarise an event list
    pub fn from_events(events: Vec<GameEvent>, chain_reaction_length: u32) -> Self {
        let mut outcome = Self {
            chain_reaction_length,
            ..Default::default()
        };
        for event in &events {
            match event {
                GameEvent::BlockDestroyed { .. } => outcome.blocks_destroyed += 1,
                GameEvent::BombDetonated { .. } => outcome.bombs_detonated += 1,
                GameEvent::EntityDefeated { entity, .. } => outcome.enemies_defeated.push(*entity),
                _ => {}
            }
        }
        outcome.events = events;
        outcome
    }
}
