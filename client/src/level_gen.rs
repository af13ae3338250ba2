//! Procedural level generation
//!
//! Extends the world to the right in segments: either a pit followed by a
//! platform, or a plain platform. Platforms may carry one crate and up to two
//! coins. Pit widths are bounded by how far the runner can actually jump,
//! which is derived by replaying the same integration the engine uses.

use crate::world::{CoinKind, World, COIN_SIZE, OBSTACLE_WIDTH};
use rand::rngs::StdRng;
use rand::Rng;
use shared::{
    Rect, GAME_WIDTH, GRAVITY, GROUND_LEVEL, JUMP_VELOCITY, PLAYER_SIZE, SCROLL_SPEED,
};

/// How far ahead of the left screen edge the level must exist
pub const GENERATION_HORIZON: f32 = GAME_WIDTH * 2.5;

pub const MIN_PIT_WIDTH: f32 = 60.0;
pub const MIN_PLATFORM_WIDTH: f32 = 300.0;
pub const MAX_PLATFORM_WIDTH: f32 = 800.0;

/// Inset from both platform ends where crates and coins may not be placed
pub const PLATFORM_MARGIN: f32 = 50.0;

/// Clearance kept around both coins and crates when placing coins
pub const COIN_CLEARANCE: f32 = 10.0;

/// Share of the theoretical jump distance a generated pit may use
const PIT_SAFETY_FACTOR: f32 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct LevelParams {
    pub pit_chance: f64,
    pub obstacle_chance: f64,
    pub special_coin_chance: f64,
    pub max_coins: u32,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            pit_chance: 0.2,
            obstacle_chance: 0.7,
            special_coin_chance: 0.4,
            max_coins: 2,
        }
    }
}

impl LevelParams {
    /// Unbroken ground with only normal coins
    pub fn flat() -> Self {
        Self {
            pit_chance: 0.0,
            obstacle_chance: 0.0,
            special_coin_chance: 0.0,
            max_coins: 2,
        }
    }
}

/// Ticks between take-off and landing back at the same height
pub fn airtime_ticks() -> u32 {
    let mut y = 0.0f32;
    let mut vy = JUMP_VELOCITY;
    let mut ticks = 0;

    loop {
        vy += GRAVITY;
        y += vy;
        ticks += 1;
        if vy >= 0.0 && y >= 0.0 {
            return ticks;
        }
    }
}

/// Horizontal distance the world scrolls during one jump, plus the runner's
/// own width since it only needs to keep a toe on either edge.
pub fn max_jump_distance() -> f32 {
    airtime_ticks() as f32 * SCROLL_SPEED + PLAYER_SIZE
}

pub fn max_pit_width() -> f32 {
    max_jump_distance() * PIT_SAFETY_FACTOR
}

/// Extends the level until it reaches [`GENERATION_HORIZON`]
pub fn extend(world: &mut World, rng: &mut StdRng, params: &LevelParams) {
    extend_to(world, rng, params, GENERATION_HORIZON);
}

/// Extends the level until the frontier reaches `horizon`
pub fn extend_to(world: &mut World, rng: &mut StdRng, params: &LevelParams, horizon: f32) {
    let mut x = world.frontier();

    while x < horizon {
        if rng.gen_bool(params.pit_chance) {
            x += rng.gen_range(MIN_PIT_WIDTH..=max_pit_width());
        }

        let width = rng.gen_range(MIN_PLATFORM_WIDTH..MAX_PLATFORM_WIDTH);
        world.add_platform(x, width);
        decorate(world, rng, params, x, width);

        x += width;
    }
}

/// Places at most one crate and a few coins on the platform at `[x, x + width]`
fn decorate(world: &mut World, rng: &mut StdRng, params: &LevelParams, x: f32, width: f32) {
    let start = x + PLATFORM_MARGIN;
    let span = width - PLATFORM_MARGIN * 2.0;

    let mut crate_boxes = Vec::new();
    if rng.gen_bool(params.obstacle_chance) {
        let obstacle_x = start + rng.gen::<f32>() * (span - OBSTACLE_WIDTH);
        world.add_obstacle(obstacle_x);
        if let Some(obstacle) = world.obstacles.last() {
            crate_boxes.push(obstacle.rect.padded(COIN_CLEARANCE));
        }
    }

    let attempts = rng.gen_range(0..=params.max_coins);
    for _ in 0..attempts {
        let coin_x = start + rng.gen::<f32>() * (span - COIN_SIZE);
        let coin_y = GROUND_LEVEL - 40.0 - rng.gen::<f32>() * 80.0;
        let coin_box = Rect::new(coin_x, coin_y, COIN_SIZE, COIN_SIZE).padded(COIN_CLEARANCE);

        if crate_boxes.iter().any(|b| b.intersects(&coin_box)) {
            continue;
        }

        let kind = if rng.gen_bool(params.special_coin_chance) {
            CoinKind::Special
        } else {
            CoinKind::Normal
        };
        world.add_coin(coin_x, coin_y, kind);
    }
}
