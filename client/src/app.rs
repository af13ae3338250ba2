//! Fixed-rate client loop

use crate::hud::FrameSink;
use crate::input::{self, Autopilot};
use crate::network::{SessionTransport, TransportError};
use crate::session::{Frame, Mode, Outgoing, Session, SessionConfig, SessionStatus};
use log::{info, warn};
use shared::{now_millis, PlayerStatus, REQUIRED_PLAYERS, TICKS_PER_SECOND};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// One simulation tick; tick-counted clocks assume exactly this cadence
pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / TICKS_PER_SECOND as u64);

/// How long a team client stays connected on the leaderboard waiting for
/// teammates' final reports
pub const RESULTS_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mode: Mode,
    pub server: String,
    pub name: String,
    pub seed: u64,
    pub required_players: usize,
    pub accuracy: f64,
    pub tick_interval: Duration,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Solo,
            server: "127.0.0.1:8080".to_string(),
            name: String::new(),
            seed: 0,
            required_players: REQUIRED_PLAYERS,
            accuracy: 0.7,
            tick_interval: TICK_INTERVAL,
            session: SessionConfig::default(),
        }
    }
}

/// Drives one session from the menu to its final screen
pub struct App<S: FrameSink> {
    config: AppConfig,
    session: Session,
    pilot: Autopilot,
    transport: Option<SessionTransport>,
    sink: S,
    ready_requested: bool,
    start_requested: bool,
}

impl<S: FrameSink> App<S> {
    pub fn new(config: AppConfig, sink: S) -> Self {
        let session = Session::new(config.session.clone());
        let pilot = Autopilot::new(config.seed, config.accuracy);
        Self {
            config,
            session,
            pilot,
            transport: None,
            sink,
            ready_requested: false,
            start_requested: false,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Plays one round and returns the last frame shown
    pub async fn run(&mut self) -> Result<Frame, TransportError> {
        match self.config.mode {
            Mode::Solo => self.session.start_solo(self.config.seed),
            Mode::Team => {
                self.transport = Some(SessionTransport::connect(&self.config.server).await?);
                self.session.open_join_form();
                self.session.request_join(&self.config.name);
            }
        }

        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut results_deadline = None;

        loop {
            ticker.tick().await;
            let now = now_millis();

            if let Some(transport) = self.transport.as_mut() {
                for event in transport.poll_events() {
                    self.session.handle_event(event);
                }
            }

            self.drive_lobby();
            if let Some(command) = self.pilot.decide(&self.session) {
                input::apply(&mut self.session, command);
            }

            self.session.tick(now);
            self.flush();

            for cue in self.session.drain_cues() {
                self.sink.cue(&cue);
            }
            let frame = self.session.frame(now);
            self.sink.present(&frame);

            match frame.status {
                SessionStatus::GameOver | SessionStatus::Victory => {
                    info!("Round over with score {}", frame.score);
                    self.session.return_to_menu();
                    self.flush();
                    return Ok(frame);
                }
                SessionStatus::Leaderboard => {
                    let deadline =
                        *results_deadline.get_or_insert_with(|| Instant::now() + RESULTS_GRACE);
                    let settled = frame.roster.iter().all(|p| p.status != PlayerStatus::Alive);
                    if settled || Instant::now() >= deadline {
                        if !settled {
                            warn!("Leaving the leaderboard with reports still missing");
                        }
                        info!("Round over with score {}", frame.score);
                        self.session.return_to_menu();
                        self.flush();
                        return Ok(frame);
                    }
                }
                SessionStatus::Idle if self.config.mode == Mode::Team => {
                    if frame.error.is_some() {
                        self.session.abort();
                        self.flush();
                        return Ok(frame);
                    }
                }
                _ => {}
            }
        }
    }

    /// Readies up once in the waiting room and asks for the start as soon as
    /// the roster is full and everyone is ready.
    fn drive_lobby(&mut self) {
        if self.session.status() != SessionStatus::WaitingRoom {
            return;
        }

        let me = self
            .session
            .client_id()
            .and_then(|id| self.session.roster().iter().find(|p| p.id == id));
        if let Some(me) = me {
            if !me.is_ready && !self.ready_requested {
                self.ready_requested = true;
                self.session.toggle_ready();
                return;
            }
        }

        let roster = self.session.roster();
        let all_ready =
            roster.len() == self.config.required_players && roster.iter().all(|p| p.is_ready);
        if all_ready && !self.start_requested {
            self.start_requested = true;
            self.session.request_start();
        } else if !all_ready {
            self.start_requested = false;
        }
    }

    fn flush(&mut self) {
        for outgoing in self.session.drain_outgoing() {
            match outgoing {
                Outgoing::Send(packet) => {
                    if let Some(transport) = self.transport.as_ref() {
                        if let Err(e) = transport.send(packet) {
                            warn!("Dropped outgoing packet: {}", e);
                        }
                    }
                }
                Outgoing::Disconnect => {
                    if let Some(mut transport) = self.transport.take() {
                        transport.disconnect();
                    }
                }
            }
        }
    }
}
