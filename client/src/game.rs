use crate::level_gen::{self, LevelParams};
use crate::world::{CoinKind, World};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{COIN_SCORE, GAME_HEIGHT, GRAVITY, JUMP_VELOCITY, SCROLL_SPEED};

/// Vertical window above the feet in which a platform surface still catches
/// a falling runner.
pub const LANDING_TOLERANCE: f32 = 20.0;

/// Inward padding applied to both boxes in crate collisions
pub const OBSTACLE_PADDING: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Fell,
    Obstacle,
}

/// Things that happened during one tick, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    Jumped,
    CoinCollected { score: u32 },
    /// A special coin was picked up; `question` indexes the question bank
    QuizTriggered { question: usize },
    Died(DeathCause),
}

/// Local, single-player simulation of one round
#[derive(Debug, Clone)]
pub struct Simulation {
    world: World,
    rng: StdRng,
    level: LevelParams,
    question_count: usize,
    score: u32,
    ticks: u64,
}

impl Simulation {
    pub fn new(seed: u64, level: LevelParams, question_count: usize) -> Self {
        Self::with_world(World::new(), seed, level, question_count)
    }

    /// Starts from a prepared world. Generation continues from its frontier.
    pub fn with_world(world: World, seed: u64, level: LevelParams, question_count: usize) -> Self {
        let mut sim = Self {
            world,
            rng: StdRng::seed_from_u64(seed),
            level,
            question_count,
            score: 0,
            ticks: 0,
        };
        level_gen::extend(&mut sim.world, &mut sim.rng, &sim.level);
        sim
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Starts a jump unless the runner is already airborne
    pub fn jump(&mut self) -> Option<SimEvent> {
        let player = &mut self.world.player;
        if player.is_jumping {
            return None;
        }
        player.vy = JUMP_VELOCITY;
        player.is_jumping = true;
        Some(SimEvent::Jumped)
    }

    /// Advances the round by one tick.
    ///
    /// Stops early on death or when a special coin is collected; the caller
    /// decides what happens next.
    pub fn step(&mut self) -> Vec<SimEvent> {
        let mut events = Vec::new();
        self.ticks += 1;

        let player = &mut self.world.player;
        player.vy += GRAVITY;
        player.y += player.vy;

        if self.world.player.vy >= 0.0 {
            if let Some(surface) = self.world.landing_surface(LANDING_TOLERANCE) {
                let player = &mut self.world.player;
                player.y = surface - player.rect().height;
                player.vy = 0.0;
                player.is_jumping = false;
            }
        }

        if self.world.player.y > GAME_HEIGHT {
            debug!("Runner fell at distance {:.0}", self.world.distance);
            events.push(SimEvent::Died(DeathCause::Fell));
            return events;
        }

        self.world.scroll(SCROLL_SPEED);
        level_gen::extend(&mut self.world, &mut self.rng, &self.level);

        let hitbox = self.world.player.rect().padded(-OBSTACLE_PADDING);
        if self
            .world
            .obstacles
            .iter()
            .any(|o| o.rect.padded(-OBSTACLE_PADDING).intersects(&hitbox))
        {
            debug!("Runner hit a crate at distance {:.0}", self.world.distance);
            events.push(SimEvent::Died(DeathCause::Obstacle));
            return events;
        }

        let body = self.world.player.rect();
        for i in 0..self.world.coins.len() {
            let coin = &mut self.world.coins[i];
            if coin.collected || !coin.rect.intersects(&body) {
                continue;
            }
            coin.collected = true;
            let kind = coin.kind;

            match kind {
                CoinKind::Special if self.question_count > 0 => {
                    let question = self.rng.gen_range(0..self.question_count);
                    events.push(SimEvent::QuizTriggered { question });
                    return events;
                }
                _ => {
                    self.score = self.score.saturating_add(COIN_SCORE);
                    events.push(SimEvent::CoinCollected { score: self.score });
                }
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level_gen::max_pit_width;
    use crate::world::PlayerEntity;
    use assert_approx_eq::assert_approx_eq;
    use shared::{GROUND_LEVEL, PLAYER_SIZE};

    /// A world of one long platform, so generation never kicks in
    fn runway() -> World {
        let mut world = World::empty();
        world.add_platform(-500.0, 10_000.0);
        world
    }

    fn sim_with(world: World) -> Simulation {
        Simulation::with_world(world, 1, LevelParams::default(), 4)
    }

    #[test]
    fn test_runner_stays_on_ground() {
        let mut sim = sim_with(runway());

        for _ in 0..10 {
            assert!(sim.step().is_empty());
        }

        assert_eq!(sim.world().player.y, GROUND_LEVEL - PLAYER_SIZE);
        assert_eq!(sim.world().player.vy, 0.0);
        assert_eq!(sim.ticks(), 10);
    }

    #[test]
    fn test_gravity_applies_in_air() {
        let mut sim = sim_with(runway());
        sim.world_mut().player.y = 100.0;

        sim.step();

        assert_approx_eq!(sim.world().player.vy, GRAVITY);
        assert_approx_eq!(sim.world().player.y, 100.0 + GRAVITY);
    }

    #[test]
    fn test_jump_only_from_ground() {
        let mut sim = sim_with(runway());

        assert_eq!(sim.jump(), Some(SimEvent::Jumped));
        assert!(sim.world().player.is_jumping);
        assert_eq!(sim.world().player.vy, JUMP_VELOCITY);

        sim.step();
        assert_eq!(sim.jump(), None);
    }

    #[test]
    fn test_jump_lands_again() {
        let mut sim = sim_with(runway());
        sim.jump();

        for _ in 0..60 {
            sim.step();
        }

        let player = &sim.world().player;
        assert!(!player.is_jumping);
        assert_eq!(player.y, GROUND_LEVEL - PLAYER_SIZE);
    }

    #[test]
    fn test_fall_into_pit_is_death() {
        let mut world = World::empty();
        world.add_platform(400.0, 10_000.0);
        let mut sim = sim_with(world);

        let mut death = None;
        for _ in 0..60 {
            let events = sim.step();
            if let Some(SimEvent::Died(cause)) = events.last() {
                death = Some(*cause);
                break;
            }
        }

        assert_eq!(death, Some(DeathCause::Fell));
        assert!(sim.world().player.y > GAME_HEIGHT);
    }

    #[test]
    fn test_crate_collision_is_death() {
        let mut world = runway();
        world.add_obstacle(140.0);
        let mut sim = sim_with(world);

        let mut events = Vec::new();
        for _ in 0..10 {
            events = sim.step();
            if !events.is_empty() {
                break;
            }
        }

        assert_eq!(events, vec![SimEvent::Died(DeathCause::Obstacle)]);
    }

    #[test]
    fn test_crate_padding_forgives_grazes() {
        let mut world = runway();
        // Left edge lands 3 units inside the runner after one scroll.
        world.add_obstacle(130.0);
        let mut sim = sim_with(world);

        assert!(sim.step().is_empty());
    }

    #[test]
    fn test_normal_coin_scores() {
        let mut world = runway();
        world.add_coin(120.0, GROUND_LEVEL - 25.0, CoinKind::Normal);
        let mut sim = sim_with(world);

        let events = sim.step();

        assert_eq!(events, vec![SimEvent::CoinCollected { score: COIN_SCORE }]);
        assert_eq!(sim.score(), COIN_SCORE);
        assert!(sim.world().coins[0].collected);

        // Already collected coins are ignored.
        assert!(sim.step().is_empty());
        assert_eq!(sim.score(), COIN_SCORE);
    }

    #[test]
    fn test_special_coin_triggers_quiz() {
        let mut world = runway();
        world.add_coin(120.0, GROUND_LEVEL - 25.0, CoinKind::Special);
        world.add_coin(125.0, GROUND_LEVEL - 25.0, CoinKind::Normal);
        let mut sim = sim_with(world);

        let events = sim.step();

        assert_eq!(events.len(), 1);
        match events[0] {
            SimEvent::QuizTriggered { question } => assert!(question < 4),
            ref other => panic!("Expected quiz, got {:?}", other),
        }
        // The step stopped before the second coin.
        assert_eq!(sim.score(), 0);
        assert!(!sim.world().coins[1].collected);
    }

    #[test]
    fn test_special_coin_without_questions_scores() {
        let mut world = runway();
        world.add_coin(120.0, GROUND_LEVEL - 25.0, CoinKind::Special);
        let mut sim = Simulation::with_world(world, 1, LevelParams::default(), 0);

        assert_eq!(sim.step(), vec![SimEvent::CoinCollected { score: 1 }]);
    }

    #[test]
    fn test_jump_from_edge_clears_widest_pit() {
        let mut world = World::empty();
        // The runner keeps a toe on this platform for one more tick.
        world.add_platform(-500.0, 603.0);
        world.add_platform(103.0 + max_pit_width(), 10_000.0);
        let mut sim = sim_with(world);

        sim.jump();
        for _ in 0..60 {
            let events = sim.step();
            assert!(
                !events.contains(&SimEvent::Died(DeathCause::Fell)),
                "fell into pit at tick {}",
                sim.ticks()
            );
        }

        let player = &sim.world().player;
        assert!(!player.is_jumping);
        assert_eq!(player.y, GROUND_LEVEL - PLAYER_SIZE);
    }

    #[test]
    fn test_world_scrolls_and_extends() {
        let mut sim = Simulation::new(42, LevelParams::flat(), 4);
        let start = sim.world().platforms[0].rect.x;

        sim.step();

        assert_approx_eq!(sim.world().platforms[0].rect.x, start - SCROLL_SPEED);
        assert_approx_eq!(sim.world().distance, SCROLL_SPEED);
        assert!(sim.world().frontier() >= level_gen::GENERATION_HORIZON);
        assert_eq!(sim.world().player, PlayerEntity::new());
    }
}
