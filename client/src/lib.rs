//! # Runner Client Library
//!
//! This library provides the client side of the runner: a local simulation
//! of one round, the session state machine around it, and the transport that
//! links a team session to the room server.
//!
//! ## Architecture Overview
//!
//! Every client simulates its own world. The server never sees positions,
//! only scores and statuses, so there is nothing to predict or reconcile.
//! What must agree across clients is the clock: a team round is timed
//! against the start time the server broadcasts, not against local ticks.
//!
//! ### Fixed-Rate Loop
//! [`app::App`] runs at a fixed interval. Each iteration drains server
//! events, lets the input source act, advances the session by one tick,
//! flushes queued commands and hands a [`session::Frame`] to the HUD.
//!
//! ### Procedural Level
//! The level is generated ahead of the runner from a seeded RNG. Pit widths
//! are bounded by the jump distance derived from the physics constants, so
//! every generated pit can be cleared.
//!
//! ## Module Organization
//!
//! ### World Module (`world`)
//! - Runner, platforms, crates and coins with stable ids
//! - Scrolling and culling
//!
//! ### Level Generation Module (`level_gen`)
//! - Pit, platform, crate and coin placement
//! - Jump distance derived from gravity and scroll speed
//!
//! ### Game Module (`game`)
//! - One-tick physics step, collisions and scoring
//! - Events for deaths, coins and quizzes
//!
//! ### Clock Module (`clock`)
//! - Tick-based solo countdown
//! - Start-time based team countdown
//!
//! ### Quiz Module (`quiz`)
//! - Question bank and quiz countdown
//!
//! ### Session Module (`session`)
//! - State machine from menu to results
//! - Outgoing command queue
//!
//! ### Network Module (`network`)
//! - TCP connection to the room server with heartbeats
//! - Typed events and commands
//!
//! ### Input and HUD Modules (`input`, `hud`)
//! - Autopilot input source
//! - Frame sink boundary and a logging HUD
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::app::{App, AppConfig};
//! use client::hud::LogHud;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new(AppConfig::default(), LogHud::new());
//!     let frame = app.run().await?;
//!     println!("Finished with score {}", frame.score);
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod clock;
pub mod game;
pub mod hud;
pub mod input;
pub mod level_gen;
pub mod network;
pub mod quiz;
pub mod session;
pub mod world;
