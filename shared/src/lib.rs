use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod framing;

pub const GAME_WIDTH: f32 = 800.0;
pub const GAME_HEIGHT: f32 = 400.0;
pub const GROUND_LEVEL: f32 = 320.0;
pub const GRAVITY: f32 = 0.6;
pub const JUMP_VELOCITY: f32 = -12.0;
pub const SCROLL_SPEED: f32 = 3.0;
pub const PLAYER_SIZE: f32 = 30.0;
pub const PLAYER_X: f32 = 100.0;

pub const TICKS_PER_SECOND: u32 = 60;
pub const DURATION_SECONDS: u32 = 30;
pub const REQUIRED_PLAYERS: usize = 10;
pub const START_DELAY_MS: u64 = 3000;
pub const QUIZ_SECONDS: u32 = 10;
pub const COIN_SCORE: u32 = 1;
pub const QUIZ_BONUS: u32 = 5;
pub const SCORE_REPORT_INTERVAL: u64 = 20;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    JoinRoom {
        room_id: String,
        name: String,
    },
    ToggleReady {
        room_id: String,
    },
    StartGame {
        room_id: String,
    },
    UpdatePlayer {
        room_id: String,
        score: u32,
        status: PlayerStatus,
    },
    Heartbeat,
    Disconnect,

    Connected {
        client_id: u32,
    },
    RoomUpdate {
        players: Vec<Player>,
    },
    GameStarted {
        start_time: u64,
    },
    PlayerUpdated {
        player: Player,
    },
    ErrorMsg {
        message: String,
    },
    Disconnected {
        reason: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Alive,
    Dead,
    Finished,
}

/// A roster entry as seen by every member of a room.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub is_ready: bool,
    pub score: u32,
    pub status: PlayerStatus,
}

impl Player {
    pub fn new(id: u32, name: &str) -> Self {
        let name = name.trim();
        Self {
            id,
            name: if name.is_empty() {
                format!("Agent {}", id)
            } else {
                name.to_string()
            },
            is_ready: false,
            score: 0,
            status: PlayerStatus::Alive,
        }
    }
}

/// Axis-aligned box in world units, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Grows the box by `amount` on every side. Negative values shrink it.
    pub fn padded(&self, amount: f32) -> Rect {
        Rect {
            x: self.x - amount,
            y: self.y - amount,
            width: self.width + amount * 2.0,
            height: self.height + amount * 2.0,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis();
    (millis.min(u64::MAX as u128)) as u64
}
