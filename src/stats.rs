//! Match statistics
//!
//! Built by folding tick outcomes, so the simulation never touches counters
//! directly. Serializable for whatever stats/achievement layer stores it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sim::{EntityId, GameEvent, GamePhase, TickOutcome};

/// Per-entity tallies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    pub bombs_placed: u32,
    pub kills: u32,
    pub deaths: u32,
    pub hits_taken: u32,
    pub powerups_collected: u32,
}

/// Whole-match statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchStats {
    pub ticks: u64,
    /// Simulated time (ms)
    pub elapsed_ms: f32,
    pub blocks_destroyed: u32,
    pub bombs_placed: u32,
    pub bombs_detonated: u32,
    /// Longest chain reaction seen
    pub longest_chain: u32,
    pub enemies_defeated: u32,
    pub powerups_spawned: u32,
    pub powerups_collected: u32,
    pub powerups_burned: u32,
    pub kicks: u32,
    pub throws: u32,
    /// Keyed by entity id (ordered for stable output)
    pub entities: BTreeMap<u32, EntityStats>,
    /// Set once the match ends; `Some(None)` is a draw
    pub winner: Option<Option<EntityId>>,
}

impl MatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn entity(&mut self, id: EntityId) -> &mut EntityStats {
        self.entities.entry(id.0).or_default()
    }

    /// Fold one tick's outcome (covering `dt_ms`) into the totals
    pub fn record(&mut self, outcome: &TickOutcome, dt_ms: f32) {
        self.ticks += 1;
        self.elapsed_ms += dt_ms;
        self.blocks_destroyed += outcome.blocks_destroyed;
        self.bombs_detonated += outcome.bombs_detonated;
        self.enemies_defeated += outcome.enemies_defeated.len() as u32;
        self.longest_chain = self.longest_chain.max(outcome.chain_reaction_length);

        for event in &outcome.events {
            match event {
                GameEvent::BombPlaced { owner, .. } => {
                    self.bombs_placed += 1;
                    self.entity(*owner).bombs_placed += 1;
                }
                GameEvent::BombKicked { .. } => self.kicks += 1,
                GameEvent::BombThrown { .. } => self.throws += 1,
                GameEvent::PowerUpSpawned { .. } => self.powerups_spawned += 1,
                GameEvent::PowerUpBurned { .. } => self.powerups_burned += 1,
                GameEvent::PowerUpCollected { entity, .. } => {
                    self.powerups_collected += 1;
                    self.entity(*entity).powerups_collected += 1;
                }
                GameEvent::EntityDamaged { entity, .. } => self.entity(*entity).hits_taken += 1,
                GameEvent::EntityDefeated { entity, by } => {
                    self.entity(*entity).deaths += 1;
                    if by != entity {
                        self.entity(*by).kills += 1;
                    }
                }
                GameEvent::MatchOver { winner } => self.winner = Some(*winner),
                GameEvent::BombDetonated { .. } | GameEvent::BlockDestroyed { .. } => {}
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Final phase as seen through the recorded events
    pub fn phase(&self) -> GamePhase {
        match self.winner {
            Some(winner) => GamePhase::GameOver { winner },
            None => GamePhase::Playing,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
