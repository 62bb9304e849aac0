//! Bomb Arena entry point
//!
//! Runs a headless AI-only match and prints the final statistics as JSON.
//!
//! Usage: `bomb-arena [difficulty] [seed] [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use bomb_arena::consts::SIM_DT_MS;
    use bomb_arena::sim::{GameEvent, GamePhase, GameState, MapParams};
    use bomb_arena::{Difficulty, MatchSettings, MatchStats};

    /// Stop runaway matches after ten simulated minutes
    const MAX_TICKS: u64 = 60 * 60 * 10;

    fn load_settings(difficulty: Difficulty, path: Option<&str>) -> MatchSettings {
        let Some(path) = path else {
            return MatchSettings::for_difficulty(difficulty);
        };
        match std::fs::read_to_string(path) {
            Ok(json) => match MatchSettings::from_json(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Invalid settings in {}: {}", path, e);
                    MatchSettings::for_difficulty(difficulty)
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path, e);
                MatchSettings::for_difficulty(difficulty)
            }
        }
    }

    pub fn run() {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let difficulty = match args.first() {
            Some(name) => Difficulty::from_str(name).unwrap_or_else(|| {
                log::warn!("Unknown difficulty '{}', using medium", name);
                Difficulty::Medium
            }),
            None => Difficulty::Medium,
        };
        let seed = args
            .get(1)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0xB0B);
        let settings = load_settings(difficulty, args.get(2).map(String::as_str));

        let mut state = GameState::new_match(settings, &MapParams::default(), seed, 0, 4);
        let mut stats = MatchStats::new();

        while state.phase() == GamePhase::Playing && state.time_ticks < MAX_TICKS {
            let outcome = state.simulate_tick(SIM_DT_MS);
            for event in &outcome.events {
                match event {
                    GameEvent::EntityDefeated { entity, by } => {
                        log::info!("{:?} defeated by {:?}", entity, by)
                    }
                    GameEvent::BlockDestroyed { pos } => log::debug!("Block destroyed at {}", pos),
                    _ => log::trace!("{:?}", event),
                }
            }
            stats.record(&outcome, SIM_DT_MS);
        }

        if state.phase() == GamePhase::Playing {
            log::warn!("Match stopped after {} ticks without a result", state.time_ticks);
        }

        match stats.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Failed to serialize stats: {}", e),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Bomb Arena (headless) starting...");
    headless::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The wasm build only exposes the library
}
