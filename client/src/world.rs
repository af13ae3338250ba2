//! Entity and level model for the local simulation
//!
//! The world is a set of flat vectors. Entities never reference each other;
//! each carries a stable [`EntityId`] allocated by the world it lives in.

use shared::{Rect, GAME_HEIGHT, GAME_WIDTH, GROUND_LEVEL, PLAYER_SIZE, PLAYER_X};

pub type EntityId = u64;

pub const OBSTACLE_WIDTH: f32 = 30.0;
pub const OBSTACLE_HEIGHT: f32 = 40.0;
pub const COIN_SIZE: f32 = 20.0;

/// Entities whose right edge falls to this x or below are discarded.
pub const CULL_X: f32 = -100.0;

/// The runner. Horizontal position never changes; the world scrolls instead.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntity {
    pub x: f32,
    pub y: f32,
    pub vy: f32,
    pub is_jumping: bool,
}

impl PlayerEntity {
    /// A runner standing on the ground line
    pub fn new() -> Self {
        Self {
            x: PLAYER_X,
            y: GROUND_LEVEL - PLAYER_SIZE,
            vy: 0.0,
            is_jumping: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, PLAYER_SIZE, PLAYER_SIZE)
    }

    pub fn bottom(&self) -> f32 {
        self.y + PLAYER_SIZE
    }
}

impl Default for PlayerEntity {
    fn default() -> Self {
        Self::new()
    }
}

/// A ground span. Gaps between platforms are pits.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub id: EntityId,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    Crate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub kind: ObstacleKind,
    pub rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoinKind {
    Normal,
    /// Collecting it opens a quiz
    Special,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub id: EntityId,
    pub kind: CoinKind,
    pub rect: Rect,
    pub collected: bool,
}

#[derive(Debug, Clone)]
pub struct World {
    pub player: PlayerEntity,
    /// Ordered left to right, never overlapping
    pub platforms: Vec<Platform>,
    pub obstacles: Vec<Obstacle>,
    pub coins: Vec<Coin>,
    /// Total distance scrolled since the round began
    pub distance: f32,
    next_id: EntityId,
}

impl World {
    /// Starting layout: the runner on one platform that spans the viewport
    pub fn new() -> Self {
        let mut world = Self::empty();
        world.add_platform(0.0, GAME_WIDTH + 200.0);
        world
    }

    /// A world with a runner and nothing to stand on
    pub fn empty() -> Self {
        Self {
            player: PlayerEntity::new(),
            platforms: Vec::new(),
            obstacles: Vec::new(),
            coins: Vec::new(),
            distance: 0.0,
            next_id: 1,
        }
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_platform(&mut self, x: f32, width: f32) -> EntityId {
        let id = self.alloc_id();
        self.platforms.push(Platform {
            id,
            rect: Rect::new(x, GROUND_LEVEL, width, GAME_HEIGHT - GROUND_LEVEL),
        });
        id
    }

    /// Adds a crate standing on the ground line with its left edge at `x`
    pub fn add_obstacle(&mut self, x: f32) -> EntityId {
        let id = self.alloc_id();
        self.obstacles.push(Obstacle {
            id,
            kind: ObstacleKind::Crate,
            rect: Rect::new(
                x,
                GROUND_LEVEL - OBSTACLE_HEIGHT,
                OBSTACLE_WIDTH,
                OBSTACLE_HEIGHT,
            ),
        });
        id
    }

    pub fn add_coin(&mut self, x: f32, y: f32, kind: CoinKind) -> EntityId {
        let id = self.alloc_id();
        self.coins.push(Coin {
            id,
            kind,
            rect: Rect::new(x, y, COIN_SIZE, COIN_SIZE),
            collected: false,
        });
        id
    }

    /// Right edge of the furthest platform; generation continues from here
    pub fn frontier(&self) -> f32 {
        self.platforms
            .last()
            .map(|platform| platform.rect.right())
            .unwrap_or(0.0)
    }

    /// Moves everything but the runner left by `dx` and drops what has
    /// scrolled far enough off screen.
    pub fn scroll(&mut self, dx: f32) {
        self.distance += dx;

        for platform in &mut self.platforms {
            platform.rect.x -= dx;
        }
        for obstacle in &mut self.obstacles {
            obstacle.rect.x -= dx;
        }
        for coin in &mut self.coins {
            coin.rect.x -= dx;
        }

        self.platforms.retain(|p| p.rect.right() > CULL_X);
        self.obstacles.retain(|o| o.rect.right() > CULL_X);
        self.coins.retain(|c| c.rect.right() > CULL_X);
    }

    /// Finds the platform the runner would land on this tick, if any.
    ///
    /// A platform qualifies when it overlaps the runner horizontally and its
    /// surface lies within `tolerance` above the runner's feet.
    pub fn landing_surface(&self, tolerance: f32) -> Option<f32> {
        let player = self.player.rect();
        let bottom = player.bottom();

        self.platforms
            .iter()
            .find(|p| {
                player.right() > p.rect.x
                    && player.x < p.rect.right()
                    && bottom >= p.rect.y
                    && bottom <= p.rect.y + tolerance
            })
            .map(|p| p.rect.y)
    }

    /// True when some platform lies under the horizontal span `[x, x + width]`
    pub fn has_ground(&self, x: f32, width: f32) -> bool {
        self.platforms
            .iter()
            .any(|p| x + width > p.rect.x && x < p.rect.right())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
