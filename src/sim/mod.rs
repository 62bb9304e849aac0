//! Tick-driven arena simulation
//!
//! All gameplay logic lives here. This module must stay single-threaded and
//! free of side effects outside [`GameState`]:
//! - Seeded RNG only (through [`RandomSource`])
//! - Stable iteration order (by id)
//! - No rendering, audio or platform dependencies

pub mod ai;
pub mod danger;
pub mod escape;
pub mod grid;
pub mod rng;
pub mod state;
pub mod tick;

pub use ai::{AiAction, AiContext, BombDecision, DecisionReason, choose_action, should_ai_place_bomb};
pub use danger::{blast_tiles, is_position_safe, threatens};
pub use escape::{find_escape_direction, find_escape_direction_avoiding};
pub use grid::{Grid, MapParams, Theme, Tile};
pub use rng::{RandomSource, ScriptedRolls};
pub use state::{
    BlastSource, Bomb, BombId, Controller, Entity, EntityId, GameEvent, GamePhase, GameState,
    HitResult, PowerUp, PowerUpKind, TickOutcome,
};
