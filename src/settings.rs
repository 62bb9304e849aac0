//! Difficulty tiers and per-match settings
//!
//! Supplied once at match start and never mutated by the simulation.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" | "normal" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Bomb aggressiveness for AI agents of this tier
    pub fn bomb_policy(&self) -> BombPolicy {
        match self {
            Difficulty::Easy => BombPolicy {
                target_chance: 0.25,
                target_max_distance: Some(1),
                destructible_chance: 0.05,
                proximity: None,
                baseline_chance: 0.005,
            },
            Difficulty::Medium => BombPolicy {
                target_chance: 1.0,
                target_max_distance: None,
                destructible_chance: 0.30,
                proximity: Some((3, 0.15)),
                baseline_chance: 0.02,
            },
            Difficulty::Hard => BombPolicy {
                target_chance: 1.0,
                target_max_distance: None,
                destructible_chance: 0.60,
                proximity: Some((4, 0.30)),
                baseline_chance: 0.04,
            },
        }
    }

    /// Chance that an idle AI agent wanders instead of closing in
    pub fn wander_chance(&self) -> f64 {
        match self {
            Difficulty::Easy => 0.5,
            Difficulty::Medium => 0.25,
            Difficulty::Hard => 0.1,
        }
    }
}

/// Per-tick bomb placement probabilities, evaluated as an ordered cascade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BombPolicy {
    /// Chance when the target sits inside the would-be blast
    pub target_chance: f64,
    /// Target rule only applies within this Manhattan distance
    pub target_max_distance: Option<i32>,
    /// Chance when a destructible tile is adjacent
    pub destructible_chance: f64,
    /// (max distance, chance) when the target is close
    pub proximity: Option<(i32, f64)>,
    /// Chance when nothing else applies
    pub baseline_chance: f64,
}

/// Match configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    pub difficulty: Difficulty,

    // === Entities ===
    /// Lives each entity starts with
    pub starting_lives: i32,
    /// Movement speed multiplier (1.0 = base pace)
    pub movement_speed: f32,

    // === Bombs ===
    /// Fuse length (ms)
    pub fuse_ms: f32,
    /// Chance that a destroyed block drops a power-up (0.0 - 1.0)
    pub powerup_drop_rate: f64,

    // === Damage ===
    /// Immunity window after a hit (ms)
    pub invulnerability_ms: f32,

    // === AI ===
    /// Interval between AI bomb decisions (ms)
    pub ai_think_interval_ms: f32,

    // === Session ===
    /// Match ends in a draw when this runs out
    pub time_limit_ms: Option<f32>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self::for_difficulty(Difficulty::Medium)
    }
}

impl MatchSettings {
    /// Settings preset for a difficulty tier
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let (starting_lives, movement_speed, powerup_drop_rate, ai_think_interval_ms) =
            match difficulty {
                Difficulty::Easy => (4, 0.85, 0.40, 1000.0),
                Difficulty::Medium => (3, 1.0, 0.30, 800.0),
                Difficulty::Hard => (2, 1.15, 0.20, 600.0),
            };

        Self {
            difficulty,
            starting_lives,
            movement_speed,
            fuse_ms: FUSE_MS,
            powerup_drop_rate,
            invulnerability_ms: INVULNERABILITY_MS,
            ai_think_interval_ms,
            time_limit_ms: None,
        }
    }

    /// Parse settings from JSON. Missing fields take the Medium preset.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let settings: Self = serde_json::from_str(json)?;
        log::debug!("Loaded match settings: {:?}", settings);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Movement interval for a given speed stat
    pub fn move_interval_ms(&self, speed: u32) -> f32 {
        let level = speed.clamp(1, MAX_SPEED) - 1;
        let base = (BASE_MOVE_INTERVAL_MS - level as f32 * SPEED_STEP_MS).max(MIN_MOVE_INTERVAL_MS);
        base / self.movement_speed.max(0.1)
    }
}
