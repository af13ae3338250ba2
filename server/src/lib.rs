//! # Room Server Library
//!
//! This library provides the lobby and relay server for team sessions. It owns
//! the canonical room rosters, decides when a room may start, and forwards
//! per-player score reports. It never simulates gameplay; every client runs
//! its own world and reports only its score and status.
//!
//! ## Core Responsibilities
//!
//! ### Room Management
//! Rooms are created on first join and removed when their last member leaves.
//! A room admits joins only while it is in the lobby and only up to the
//! configured roster size.
//!
//! ### Start Coordination
//! When a full roster is all ready, the server stamps a single start time a
//! few seconds in the future and broadcasts it, so every client begins its
//! round from the same wall-clock instant.
//!
//! ### Score Relay
//! Score and status reports from one member are relayed to every other member
//! of the same room. The sender is not echoed.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! Each connection has a reader task and a writer task, but every command is
//! funnelled through one channel into the server loop, which owns the
//! registry outright. Commands are applied one at a time, so no roster change
//! can interleave with another.
//!
//! ### TCP Framing
//! Packets travel over TCP as length-prefixed bincode frames (see
//! `shared::framing`). A dropped socket or a missed heartbeat removes the
//! connection from its room.
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! - Connection id assignment and capacity limits
//! - Heartbeat timeout detection
//! - Per-connection outbound queues
//!
//! ### Room Registry Module (`room_registry`)
//! - Room rosters and lobby/playing status
//! - Join, ready, start, update and leave operations
//! - Returns the packets to deliver instead of sending them itself
//!
//! ### Network Module (`network`)
//! - TCP listener and per-connection tasks
//! - Dispatch of registry deliveries
//! - Graceful shutdown
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod network;
pub mod room_registry;
