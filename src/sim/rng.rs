//! Random source used by AI decisions, map generation and power-up drops
//!
//! The simulation never calls a global RNG. Production code uses a seeded
//! `Pcg32`; tests can substitute [`ScriptedRolls`] to force exact outcomes.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

pub trait RandomSource {
    /// Uniform sample in [0, 1)
    fn next_f64(&mut self) -> f64;

    /// Bernoulli draw. Certain and impossible outcomes consume no roll.
    fn chance(&mut self, p: f64) -> bool {
        if p >= 1.0 {
            true
        } else if p <= 0.0 {
            false
        } else {
            self.next_f64() < p
        }
    }

    /// Uniform index in 0..n (n must be non-zero)
    fn pick(&mut self, n: usize) -> usize {
        ((self.next_f64() * n as f64) as usize).min(n.saturating_sub(1))
    }
}

impl RandomSource for Pcg32 {
    fn next_f64(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Seeded production RNG
pub fn seeded(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Replays a fixed list of rolls, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    rolls: Vec<f64>,
    cursor: usize,
}

impl ScriptedRolls {
    pub fn new(rolls: Vec<f64>) -> Self {
        Self { rolls, cursor: 0 }
    }

    /// Every roll returns the same value
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of rolls consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRolls {
    fn next_f64(&mut self) -> f64 {
        if self.rolls.is_empty() {
            return 0.0;
        }
        let roll = self.rolls[self.cursor % self.rolls.len()];
        self.cursor += 1;
        roll
    }
}
