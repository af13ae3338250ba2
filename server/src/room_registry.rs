//! Authoritative in-memory table of rooms and their rosters
//!
//! The registry arbitrates join, ready-toggle, start, score updates and
//! disconnects. It performs no I/O: every operation returns the packets to
//! deliver and the connection ids that should receive them, and the network
//! layer does the sending. Rooms live in a plain map owned by whoever
//! constructed the registry, so all mutation is serialized by that owner.

use log::{debug, info};
use shared::{Packet, Player, PlayerStatus, REQUIRED_PLAYERS, START_DELAY_MS};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Rejections reported back to the client that issued the command.
///
/// The `Display` text is what the client shows to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Team is full (max {0} agents).")]
    RoomFull(usize),

    #[error("Mission already in progress. Access denied.")]
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
    Lobby,
    Playing,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: String,
    pub status: RoomStatus,
    pub players: Vec<Player>,
}

impl Room {
    fn new(room_id: &str) -> Self {
        Self {
            room_id: room_id.to_string(),
            status: RoomStatus::Lobby,
            players: Vec::new(),
        }
    }

    fn member_ids(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.id).collect()
    }

    fn find_player_mut(&mut self, client_id: u32) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == client_id)
    }

    fn roster_broadcast(&self) -> Delivery {
        Delivery {
            recipients: self.member_ids(),
            packet: Packet::RoomUpdate {
                players: self.players.clone(),
            },
        }
    }
}

/// A packet together with the connections that should receive it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipients: Vec<u32>,
    pub packet: Packet,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Exact roster size a room needs before it may start.
    pub required_players: usize,
    /// Grace window added to "now" when stamping the shared start time.
    pub start_delay: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            required_players: REQUIRED_PLAYERS,
            start_delay: Duration::from_millis(START_DELAY_MS),
        }
    }
}

pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    config: RegistryConfig,
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Adds a connection to a room, creating the room on first join.
    ///
    /// A connection that is already on the roster is not added twice; the
    /// current roster is simply re-broadcast.
    pub fn join(
        &mut self,
        room_id: &str,
        client_id: u32,
        name: &str,
    ) -> Result<Vec<Delivery>, RoomError> {
        let required = self.config.required_players;
        if let Some(room) = self.rooms.get(room_id) {
            if room.status == RoomStatus::Playing {
                return Err(RoomError::InProgress);
            }
            if room.players.iter().any(|p| p.id == client_id) {
                return Ok(vec![room.roster_broadcast()]);
            }
            if room.players.len() >= required {
                return Err(RoomError::RoomFull(required));
            }
        } else if required == 0 {
            return Err(RoomError::RoomFull(required));
        }

        let room = self
            .rooms
            .entry(room_id.to_string())
            .or_insert_with(|| Room::new(room_id));

        let player = Player::new(client_id, name);
        info!(
            "{} joined room {} ({}/{})",
            player.name,
            room_id,
            room.players.len() + 1,
            required
        );
        room.players.push(player);

        Ok(vec![room.roster_broadcast()])
    }

    pub fn toggle_ready(&mut self, room_id: &str, client_id: u32) -> Vec<Delivery> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            debug!("Ready toggle for unknown room {}", room_id);
            return Vec::new();
        };

        let Some(player) = room.find_player_mut(client_id) else {
            debug!("Ready toggle from client {} not in room {}", client_id, room_id);
            return Vec::new();
        };

        player.is_ready = !player.is_ready;
        info!(
            "{} in room {} is {}",
            player.name,
            room_id,
            if player.is_ready { "ready" } else { "not ready" }
        );

        vec![room.roster_broadcast()]
    }

    /// Starts the room when the roster is exactly full and everyone is ready.
    ///
    /// Every other call is a silent no-op; the refusal reason is only logged.
    pub fn start(&mut self, room_id: &str, now_ms: u64) -> Vec<Delivery> {
        let required = self.config.required_players;
        let Some(room) = self.rooms.get_mut(room_id) else {
            debug!("Start requested for unknown room {}", room_id);
            return Vec::new();
        };

        if room.status == RoomStatus::Playing {
            info!("Start ignored: room {} is already playing", room_id);
            return Vec::new();
        }

        let player_count = room.players.len();
        if player_count != required {
            info!(
                "Start failed: only {}/{} players in room {}",
                player_count, required, room_id
            );
            return Vec::new();
        }

        if !room.players.iter().all(|p| p.is_ready) {
            info!("Start failed: not all players in room {} are ready", room_id);
            return Vec::new();
        }

        room.status = RoomStatus::Playing;
        let start_time = now_ms + self.config.start_delay.as_millis() as u64;
        info!("Room {} starting at {}", room_id, start_time);

        vec![Delivery {
            recipients: room.member_ids(),
            packet: Packet::GameStarted { start_time },
        }]
    }

    /// Overwrites the caller's score and status and relays the result to the
    /// rest of the room. The sender does not get an echo.
    pub fn update_player(
        &mut self,
        room_id: &str,
        client_id: u32,
        score: u32,
        status: PlayerStatus,
    ) -> Vec<Delivery> {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Vec::new();
        };

        let updated = match room.find_player_mut(client_id) {
            Some(player) => {
                player.score = score;
                player.status = status;
                player.clone()
            }
            None => return Vec::new(),
        };

        if status != PlayerStatus::Alive {
            info!(
                "{} in room {} reported {:?} with score {}",
                updated.name, room_id, status, score
            );
        }

        let recipients: Vec<u32> = room
            .member_ids()
            .into_iter()
            .filter(|id| *id != client_id)
            .collect();

        vec![Delivery {
            recipients,
            packet: Packet::PlayerUpdated { player: updated },
        }]
    }

    /// Removes a disconnected client from every room it belongs to.
    pub fn leave(&mut self, client_id: u32) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        let mut emptied = Vec::new();

        for (room_id, room) in self.rooms.iter_mut() {
            let Some(index) = room.players.iter().position(|p| p.id == client_id) else {
                continue;
            };

            let player = room.players.remove(index);
            info!("{} left room {}", player.name, room_id);

            if room.players.is_empty() {
                emptied.push(room_id.clone());
            } else {
                deliveries.push(room.roster_broadcast());
            }
        }

        for room_id in emptied {
            self.rooms.remove(&room_id);
            info!("Room {} is empty and was removed", room_id);
        }

        deliveries
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Drops every room. Returns how many rooms were discarded.
    pub fn clear(&mut self) -> usize {
        let count = self.rooms.len();
        self.rooms.clear();
        count
    }
}
