//! AI decision engine
//!
//! Bomb placement is gated on a confirmed escape route: an agent never places
//! a bomb it cannot survive. Movement is local (one greedy step per move) and
//! never enters a tile that is currently in danger.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::danger::{is_position_safe, threatens};
use super::escape::find_escape_direction_avoiding;
use super::grid::{Grid, Tile};
use super::rng::RandomSource;
use super::state::{BlastSource, Bomb, Entity, PowerUp};
use crate::settings::Difficulty;
use crate::{Direction, manhattan};

/// Inputs to a bomb decision
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    pub pos: IVec2,
    /// Opponent position, if any opponent is alive
    pub target: Option<IVec2>,
    pub grid: &'a Grid,
    pub bombs: &'a [Bomb],
    /// Tiles the escape route may not pass through (other live entities)
    pub blocked: &'a [IVec2],
    pub blast_radius: u32,
    pub difficulty: Difficulty,
}

/// Why a decision came out the way it did (diagnostics only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionReason {
    StandingOnBomb,
    AlreadyInDanger,
    NoEscapeRoute,
    TargetInBlast,
    AdjacentDestructible,
    TargetNearby,
    Random,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::StandingOnBomb => "standing on a bomb",
            DecisionReason::AlreadyInDanger => "already in danger",
            DecisionReason::NoEscapeRoute => "no escape route",
            DecisionReason::TargetInBlast => "target in blast",
            DecisionReason::AdjacentDestructible => "adjacent destructible",
            DecisionReason::TargetNearby => "target nearby",
            DecisionReason::Random => "random",
        }
    }
}

/// Outcome of [`should_ai_place_bomb`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BombDecision {
    pub should_place: bool,
    pub reason: DecisionReason,
    /// Pre-validated first step away from the new bomb. Always `Some` when
    /// `should_place` is true.
    pub escape: Option<Direction>,
}

impl BombDecision {
    fn reject(reason: DecisionReason) -> Self {
        Self {
            should_place: false,
            reason,
            escape: None,
        }
    }
}

/// Decide whether an agent should place a bomb this tick.
///
/// Guards run in order and short-circuit: standing on a bomb, already in
/// danger, no escape from a bomb at our own tile. Only then is the tier's
/// cascade rolled (first matching condition wins, with its own roll).
pub fn should_ai_place_bomb(ctx: &AiContext, rng: &mut impl RandomSource) -> BombDecision {
    if ctx.bombs.iter().any(|b| b.pos == ctx.pos) {
        return BombDecision::reject(DecisionReason::StandingOnBomb);
    }
    if !is_position_safe(ctx.pos, ctx.grid, ctx.bombs, None) {
        return BombDecision::reject(DecisionReason::AlreadyInDanger);
    }

    let hypothetical = BlastSource {
        pos: ctx.pos,
        radius: ctx.blast_radius,
    };
    let Some(escape) = find_escape_direction_avoiding(
        ctx.pos,
        ctx.grid,
        ctx.bombs,
        Some(hypothetical),
        ctx.blocked,
    ) else {
        return BombDecision::reject(DecisionReason::NoEscapeRoute);
    };

    let target_in_blast = ctx
        .target
        .is_some_and(|t| threatens(ctx.grid, hypothetical, t));
    let adjacent_destructible = Direction::ALL
        .iter()
        .any(|d| ctx.grid.tile(ctx.pos + d.delta()) == Tile::Destructible);
    let distance = ctx.target.map(|t| manhattan(ctx.pos, t));
    let within = |max: i32| distance.is_some_and(|d| d <= max);

    let policy = ctx.difficulty.bomb_policy();
    let (chance, reason) = if target_in_blast && policy.target_max_distance.is_none_or(within) {
        (policy.target_chance, DecisionReason::TargetInBlast)
    } else if adjacent_destructible {
        (policy.destructible_chance, DecisionReason::AdjacentDestructible)
    } else if let Some((_, p)) = policy.proximity.filter(|&(max, _)| within(max)) {
        (p, DecisionReason::TargetNearby)
    } else {
        (policy.baseline_chance, DecisionReason::Random)
    };

    let should_place = rng.chance(chance);
    BombDecision {
        should_place,
        reason,
        escape: should_place.then_some(escape),
    }
}

/// What an agent does this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    Stay,
    Move(Direction),
    /// Place a bomb and step `escape` in the same tick
    PlaceBomb { escape: Direction },
}

/// Read-only world view for agent movement
#[derive(Debug, Clone, Copy)]
pub struct AiView<'a> {
    pub grid: &'a Grid,
    pub bombs: &'a [Bomb],
    pub powerups: &'a [PowerUp],
    /// Tiles held by other live entities
    pub occupied: &'a [IVec2],
}

impl AiView<'_> {
    fn can_step(&self, pos: IVec2) -> bool {
        self.grid.is_walkable(pos)
            && !self.bombs.iter().any(|b| b.pos == pos)
            && !self.occupied.contains(&pos)
    }
}

/// Pick an agent's action. `think_ready` gates the (throttled) bomb decision.
pub fn choose_action(
    me: &Entity,
    target: Option<IVec2>,
    view: &AiView,
    difficulty: Difficulty,
    think_ready: bool,
    rng: &mut impl RandomSource,
) -> AiAction {
    // Flee first. No route means stand still rather than walk into danger.
    if !is_position_safe(me.pos, view.grid, view.bombs, None) {
        return match find_escape_direction_avoiding(
            me.pos,
            view.grid,
            view.bombs,
            None,
            view.occupied,
        ) {
            Some(dir) if view.can_step(me.pos + dir.delta()) => AiAction::Move(dir),
            _ => AiAction::Stay,
        };
    }

    if think_ready && me.can_place_bomb() {
        let ctx = AiContext {
            pos: me.pos,
            target,
            grid: view.grid,
            bombs: view.bombs,
            blocked: view.occupied,
            blast_radius: me.blast_radius,
            difficulty,
        };
        let decision = should_ai_place_bomb(&ctx, rng);
        log::trace!(
            "AI {:?} bomb decision: place={} ({})",
            me.id,
            decision.should_place,
            decision.reason.as_str()
        );
        if let Some(escape) = decision
            .escape
            .filter(|d| view.can_step(me.pos + d.delta()))
        {
            return AiAction::PlaceBomb { escape };
        }
    }

    let options: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|d| {
            let next = me.pos + d.delta();
            view.can_step(next) && is_position_safe(next, view.grid, view.bombs, None)
        })
        .collect();
    if options.is_empty() {
        return AiAction::Stay;
    }

    if let Some(&dir) = options
        .iter()
        .find(|d| view.powerups.iter().any(|p| p.pos == me.pos + d.delta()))
    {
        return AiAction::Move(dir);
    }

    let closer = target.and_then(|t| {
        let current = manhattan(me.pos, t);
        options
            .iter()
            .copied()
            .filter(|d| manhattan(me.pos + d.delta(), t) < current)
            .min_by_key(|d| manhattan(me.pos + d.delta(), t))
    });

    match closer {
        Some(dir) if !rng.chance(difficulty.wander_chance()) => AiAction::Move(dir),
        _ => AiAction::Move(options[rng.pick(options.len())]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::rng::{ScriptedRolls, seeded};
    use crate::sim::state::{BombId, Controller, EntityId, PowerUpKind};
    use proptest::prelude::*;

    fn bomb(x: i32, y: i32, radius: u32) -> Bomb {
        Bomb {
            id: BombId(0),
            pos: IVec2::new(x, y),
            timer_ms: 2500.0,
            fuse_ms: 2500.0,
            radius,
            owner: EntityId(0),
            pierce: false,
        }
    }

    fn open_grid() -> Grid {
        Grid::new(11, 11)
    }

    fn ctx<'a>(
        grid: &'a Grid,
        bombs: &'a [Bomb],
        pos: (i32, i32),
        target: Option<(i32, i32)>,
        difficulty: Difficulty,
    ) -> AiContext<'a> {
        AiContext {
            pos: IVec2::new(pos.0, pos.1),
            target: target.map(|(x, y)| IVec2::new(x, y)),
            grid,
            bombs,
            blocked: &[],
            blast_radius: 2,
            difficulty,
        }
    }

    #[test]
    fn test_rejects_when_standing_on_bomb() {
        let grid = open_grid();
        let bombs = [bomb(5, 5, 2)];
        let mut rolls = ScriptedRolls::constant(0.0);
        let d = should_ai_place_bomb(&ctx(&grid, &bombs, (5, 5), None, Difficulty::Hard), &mut rolls);
        assert!(!d.should_place);
        assert_eq!(d.reason, DecisionReason::StandingOnBomb);
        assert_eq!(rolls.consumed(), 0);
    }

    #[test]
    fn test_rejects_when_in_danger() {
        let grid = open_grid();
        let bombs = [bomb(5, 3, 2)];
        let mut rolls = ScriptedRolls::constant(0.0);
        let d = should_ai_place_bomb(&ctx(&grid, &bombs, (5, 5), None, Difficulty::Hard), &mut rolls);
        assert_eq!(d.reason, DecisionReason::AlreadyInDanger);
        assert!(d.escape.is_none());
    }

    #[test]
    fn test_rejects_without_escape() {
        let grid = Grid::from_rows(&["#####", "#...#", "#####"]).unwrap();
        let mut rolls = ScriptedRolls::constant(0.0);
        // Target right next to us would normally be a certain bomb
        let d = should_ai_place_bomb(
            &ctx(&grid, &[], (1, 1), Some((2, 1)), Difficulty::Hard),
            &mut rolls,
        );
        assert!(!d.should_place);
        assert_eq!(d.reason, DecisionReason::NoEscapeRoute);
        assert_eq!(rolls.consumed(), 0);
    }

    #[test]
    fn test_target_in_blast_is_certain_on_medium() {
        let grid = open_grid();
        let mut rolls = ScriptedRolls::constant(0.999);
        let d = should_ai_place_bomb(
            &ctx(&grid, &[], (3, 5), Some((5, 5)), Difficulty::Medium),
            &mut rolls,
        );
        assert!(d.should_place);
        assert_eq!(d.reason, DecisionReason::TargetInBlast);
        assert!(d.escape.is_some());
        assert_eq!(rolls.consumed(), 0);
    }

    #[test]
    fn test_easy_target_rule_needs_adjacency() {
        let grid = open_grid();
        let adjacent = ctx(&grid, &[], (4, 5), Some((5, 5)), Difficulty::Easy);
        let d = should_ai_place_bomb(&adjacent, &mut ScriptedRolls::constant(0.2));
        assert!(d.should_place);
        assert_eq!(d.reason, DecisionReason::TargetInBlast);

        let d = should_ai_place_bomb(&adjacent, &mut ScriptedRolls::constant(0.3));
        assert!(!d.should_place);
        assert_eq!(d.reason, DecisionReason::TargetInBlast);

        // In blast but two tiles away: falls through to the baseline roll
        let far = ctx(&grid, &[], (3, 5), Some((5, 5)), Difficulty::Easy);
        let d = should_ai_place_bomb(&far, &mut ScriptedRolls::constant(0.2));
        assert!(!d.should_place);
        assert_eq!(d.reason, DecisionReason::Random);
    }

    #[test]
    fn test_adjacent_destructible() {
        let mut grid = open_grid();
        grid.set(IVec2::new(5, 4), Tile::Destructible);
        let c = ctx(&grid, &[], (5, 5), None, Difficulty::Hard);

        let d = should_ai_place_bomb(&c, &mut ScriptedRolls::constant(0.59));
        assert!(d.should_place);
        assert_eq!(d.reason, DecisionReason::AdjacentDestructible);

        let d = should_ai_place_bomb(&c, &mut ScriptedRolls::constant(0.61));
        assert!(!d.should_place);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let mut grid = open_grid();
        grid.set(IVec2::new(5, 4), Tile::Destructible);
        // Target nearby (diagonal, not in blast) and a destructible adjacent.
        // A failed destructible roll must not fall through to the proximity roll.
        let c = ctx(&grid, &[], (5, 5), Some((6, 6)), Difficulty::Hard);
        let mut rolls = ScriptedRolls::new(vec![0.9, 0.0]);
        let d = should_ai_place_bomb(&c, &mut rolls);
        assert!(!d.should_place);
        assert_eq!(d.reason, DecisionReason::AdjacentDestructible);
        assert_eq!(rolls.consumed(), 1);
    }

    #[test]
    fn test_proximity_and_baseline() {
        let grid = open_grid();
        let near = ctx(&grid, &[], (3, 3), Some((5, 4)), Difficulty::Medium);
        let d = should_ai_place_bomb(&near, &mut ScriptedRolls::constant(0.1));
        assert!(d.should_place);
        assert_eq!(d.reason, DecisionReason::TargetNearby);

        let far = ctx(&grid, &[], (2, 2), Some((8, 8)), Difficulty::Medium);
        let d = should_ai_place_bomb(&far, &mut ScriptedRolls::constant(0.019));
        assert!(d.should_place);
        assert_eq!(d.reason, DecisionReason::Random);
        let d = should_ai_place_bomb(&far, &mut ScriptedRolls::constant(0.021));
        assert!(!d.should_place);
    }

    fn agent(x: i32, y: i32) -> Entity {
        Entity::new(EntityId(9), Controller::Ai(0), IVec2::new(x, y), 3)
    }

    #[test]
    fn test_choose_action_flees_danger() {
        let grid = open_grid();
        let bombs = [bomb(5, 5, 2)];
        let view = AiView {
            grid: &grid,
            bombs: &bombs,
            powerups: &[],
            occupied: &[],
        };
        let me = agent(5, 4);
        let action = choose_action(&me, None, &view, Difficulty::Hard, true, &mut seeded(1));
        let expected = find_escape_direction_avoiding(me.pos, &grid, &bombs, None, &[]).unwrap();
        assert_eq!(action, AiAction::Move(expected));
    }

    #[test]
    fn test_choose_action_flees_around_occupied_tile() {
        let grid = Grid::from_rows(&[
            "#######", //
            "#.....#", //
            "#.###.#", //
            "#.....#", //
            "#######",
        ])
        .unwrap();
        let bombs = [bomb(3, 1, 2)];
        let view = AiView {
            grid: &grid,
            bombs: &bombs,
            powerups: &[],
            occupied: &[IVec2::new(4, 1)],
        };
        // Shortest route is right, but that tile is held
        let action = choose_action(&agent(3, 1), None, &view, Difficulty::Hard, false, &mut seeded(1));
        assert_eq!(action, AiAction::Move(Direction::Left));
    }

    #[test]
    fn test_no_bomb_when_only_exit_is_occupied() {
        let grid = Grid::from_rows(&["#######", "#.....#", "#######"]).unwrap();
        let view = AiView {
            grid: &grid,
            bombs: &[],
            powerups: &[],
            occupied: &[IVec2::new(2, 1)],
        };
        let me = agent(1, 1);
        for roll in [0.0, 0.5, 0.99] {
            let action = choose_action(
                &me,
                Some(IVec2::new(2, 1)),
                &view,
                Difficulty::Medium,
                true,
                &mut ScriptedRolls::constant(roll),
            );
            assert!(!matches!(action, AiAction::PlaceBomb { .. }));
        }

        let c = AiContext {
            pos: me.pos,
            target: Some(IVec2::new(2, 1)),
            grid: &grid,
            bombs: &[],
            blocked: view.occupied,
            blast_radius: 2,
            difficulty: Difficulty::Medium,
        };
        let d = should_ai_place_bomb(&c, &mut ScriptedRolls::constant(0.0));
        assert_eq!(d.reason, DecisionReason::NoEscapeRoute);
    }

    #[test]
    fn test_choose_action_stays_when_trapped() {
        let grid = Grid::from_rows(&["#####", "#...#", "#####"]).unwrap();
        let bombs = [bomb(3, 1, 3)];
        let view = AiView {
            grid: &grid,
            bombs: &bombs,
            powerups: &[],
            occupied: &[],
        };
        let action = choose_action(&agent(1, 1), None, &view, Difficulty::Hard, true, &mut seeded(1));
        assert_eq!(action, AiAction::Stay);
    }

    #[test]
    fn test_choose_action_bombs_target() {
        let grid = open_grid();
        let view = AiView {
            grid: &grid,
            bombs: &[],
            powerups: &[],
            occupied: &[IVec2::new(5, 5)],
        };
        let action = choose_action(
            &agent(3, 5),
            Some(IVec2::new(5, 5)),
            &view,
            Difficulty::Medium,
            true,
            &mut seeded(1),
        );
        assert!(matches!(action, AiAction::PlaceBomb { .. }));

        // Not thinking this tick: just move
        let action = choose_action(
            &agent(3, 5),
            Some(IVec2::new(5, 5)),
            &view,
            Difficulty::Medium,
            false,
            &mut ScriptedRolls::constant(0.99),
        );
        assert_eq!(action, AiAction::Move(Direction::Right));
    }

    #[test]
    fn test_choose_action_grabs_powerup_and_avoids_danger() {
        let grid = open_grid();
        let bombs = [bomb(7, 3, 2)];
        let powerups = [PowerUp {
            pos: IVec2::new(4, 5),
            kind: PowerUpKind::FireUp,
            spawned_tick: 0,
        }];
        let view = AiView {
            grid: &grid,
            bombs: &bombs,
            powerups: &powerups,
            occupied: &[],
        };
        let action = choose_action(&agent(5, 5), None, &view, Difficulty::Easy, false, &mut seeded(3));
        assert_eq!(action, AiAction::Move(Direction::Left));

        // Every roam step lands on a safe tile
        for seed in 0..32 {
            let me = agent(5, 4);
            if let AiAction::Move(dir) =
                choose_action(&me, Some(IVec2::new(9, 1)), &view, Difficulty::Easy, false, &mut seeded(seed))
            {
                assert!(is_position_safe(me.pos + dir.delta(), &grid, &bombs, None));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_ai_never_self_destructs(seed in any::<u64>()) {
            let mut rng = seeded(seed);
            let mut grid = Grid::new(11, 11);
            for y in 1..10 {
                for x in 1..10 {
                    let roll = rng.next_f64();
                    if roll < 0.2 {
                        grid.set(IVec2::new(x, y), Tile::Wall);
                    } else if roll < 0.45 {
                        grid.set(IVec2::new(x, y), Tile::Destructible);
                    }
                }
            }
            let pos = IVec2::new(1 + rng.pick(9) as i32, 1 + rng.pick(9) as i32);
            grid.set(pos, Tile::Empty);
            let bombs: Vec<Bomb> = (0..rng.pick(3))
                .map(|_| bomb(1 + rng.pick(9) as i32, 1 + rng.pick(9) as i32, 1 + rng.pick(3) as u32))
                .collect();
            let target = IVec2::new(1 + rng.pick(9) as i32, 1 + rng.pick(9) as i32);
            let blocked = [target];
            let c = AiContext {
                pos,
                target: Some(target),
                grid: &grid,
                bombs: &bombs,
                blocked: &blocked,
                blast_radius: 1 + rng.pick(4) as u32,
                difficulty: Difficulty::Hard,
            };

            // Always accept whatever the cascade lands on
            let d = should_ai_place_bomb(&c, &mut ScriptedRolls::constant(0.0));
            if d.should_place {
                let dir = d.escape.expect("placement without escape");
                let hyp = Some(BlastSource { pos, radius: c.blast_radius });
                let step = pos + dir.delta();
                prop_assert!(grid.is_walkable(step));
                prop_assert!(!bombs.iter().any(|b| b.pos == step));
                prop_assert!(!blocked.contains(&step));
                prop_assert_eq!(
                    find_escape_direction_avoiding(pos, &grid, &bombs, hyp, &blocked),
                    Some(dir)
                );
            } else {
                prop_assert!(d.escape.is_none());
            }
        }
    }
}
