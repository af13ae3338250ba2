//! Session state machine
//!
//! A [`Session`] decides which subsystem receives control on each tick:
//! the lobby, the simulation, the quiz, or nothing at all while results are
//! pending. It performs no I/O. Commands for the server are queued as
//! [`Outgoing`] and collected by the caller with [`Session::drain_outgoing`];
//! server events are fed in through [`Session::handle_event`].

use crate::clock::{ClockReading, SessionClock};
use crate::game::{SimEvent, Simulation};
use crate::level_gen::LevelParams;
use crate::network::TransportEvent;
use crate::quiz::{ActiveQuiz, QuestionBank, QuizOutcome};
use log::{debug, info, warn};
use shared::{Packet, Player, PlayerStatus, DURATION_SECONDS, SCORE_REPORT_INTERVAL};

pub const DEFAULT_ROOM: &str = "TEAM_ARENA_01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    WaitingRoom,
    Playing,
    Quiz,
    GameOver,
    WaitingResults,
    Leaderboard,
    Victory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Solo,
    Team,
}

/// Sub-step of the idle screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LobbyStep {
    #[default]
    Menu,
    NameInput,
}

/// Work the session wants the transport to do
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    Send(Packet),
    Disconnect,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_id: String,
    pub duration_secs: u32,
    /// Seed for team rounds; solo rounds take theirs from `start_solo`
    pub seed: u64,
    pub level: LevelParams,
    pub bank: QuestionBank,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_id: DEFAULT_ROOM.to_string(),
            duration_secs: DURATION_SECONDS,
            seed: 0,
            level: LevelParams::default(),
            bank: QuestionBank::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizFrame {
    pub prompt: String,
    pub options: Vec<String>,
    pub seconds_left: u32,
}

/// Snapshot of everything a presentation layer needs for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub status: SessionStatus,
    pub mode: Mode,
    pub lobby_step: LobbyStep,
    pub score: u32,
    pub clock: Option<ClockReading>,
    pub quiz: Option<QuizFrame>,
    pub roster: Vec<Player>,
    pub error: Option<String>,
    pub player_y: f32,
    pub distance: f32,
}

pub struct Session {
    config: SessionConfig,
    status: SessionStatus,
    mode: Mode,
    lobby_step: LobbyStep,

    client_id: Option<u32>,
    join_pending: bool,
    roster: Vec<Player>,
    last_error: Option<String>,

    sim: Option<Simulation>,
    clock: Option<SessionClock>,
    quiz: Option<ActiveQuiz>,

    outbox: Vec<Outgoing>,
    cues: Vec<SimEvent>,
    last_tick_ms: u64,
}

fn is_legal(mode: Mode, from: SessionStatus, to: SessionStatus) -> bool {
    use SessionStatus::*;
    match (from, to) {
        (Idle, WaitingRoom) => mode == Mode::Team,
        (Idle, Playing) => mode == Mode::Solo,
        (WaitingRoom, Playing) | (WaitingRoom, Idle) => true,
        (Playing, Quiz) | (Quiz, Playing) => true,
        (Playing, GameOver) | (Playing, Victory) => mode == Mode::Solo,
        (Playing, WaitingResults) | (Quiz, WaitingResults) => mode == Mode::Team,
        (WaitingResults, Leaderboard) => true,
        (Leaderboard, Idle) | (GameOver, Idle) | (Victory, Idle) => true,
        _ => false,
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            status: SessionStatus::Idle,
            mode: Mode::Solo,
            lobby_step: LobbyStep::Menu,
            client_id: None,
            join_pending: false,
            roster: Vec::new(),
            last_error: None,
            sim: None,
            clock: None,
            quiz: None,
            outbox: Vec::new(),
            cues: Vec::new(),
            last_tick_ms: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lobby_step(&self) -> LobbyStep {
        self.lobby_step
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn score(&self) -> u32 {
        self.sim.as_ref().map(|s| s.score()).unwrap_or(0)
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.sim.as_ref()
    }

    pub(crate) fn simulation_mut(&mut self) -> Option<&mut Simulation> {
        self.sim.as_mut()
    }

    pub fn quiz(&self) -> Option<&ActiveQuiz> {
        self.quiz.as_ref()
    }

    pub fn question_bank(&self) -> &QuestionBank {
        &self.config.bank
    }

    fn transition(&mut self, to: SessionStatus) -> bool {
        if !is_legal(self.mode, self.status, to) {
            warn!(
                "Rejected transition {:?} -> {:?} in {:?} mode",
                self.status, to, self.mode
            );
            return false;
        }
        info!("Session {:?} -> {:?}", self.status, to);
        self.status = to;
        true
    }

    pub fn open_join_form(&mut self) {
        if self.status == SessionStatus::Idle {
            self.lobby_step = LobbyStep::NameInput;
        }
    }

    /// Asks the server to put us on the team roster. The session moves to the
    /// waiting room once the first roster update arrives.
    pub fn request_join(&mut self, name: &str) {
        if self.status != SessionStatus::Idle {
            warn!("Cannot join a room while {:?}", self.status);
            return;
        }
        self.mode = Mode::Team;
        self.join_pending = true;
        self.last_error = None;
        self.outbox.push(Outgoing::Send(Packet::JoinRoom {
            room_id: self.config.room_id.clone(),
            name: name.to_string(),
        }));
    }

    pub fn start_solo(&mut self, seed: u64) {
        if self.status != SessionStatus::Idle {
            warn!("Cannot start a solo round while {:?}", self.status);
            return;
        }
        self.mode = Mode::Solo;
        if self.transition(SessionStatus::Playing) {
            self.begin_round(seed, SessionClock::solo(self.config.duration_secs));
        }
    }

    fn begin_round(&mut self, seed: u64, clock: SessionClock) {
        self.sim = Some(Simulation::new(
            seed,
            self.config.level.clone(),
            self.config.bank.len(),
        ));
        self.clock = Some(clock);
        self.quiz = None;
        self.lobby_step = LobbyStep::Menu;
    }

    pub fn toggle_ready(&mut self) {
        if self.status == SessionStatus::WaitingRoom {
            self.outbox.push(Outgoing::Send(Packet::ToggleReady {
                room_id: self.config.room_id.clone(),
            }));
        }
    }

    pub fn request_start(&mut self) {
        if self.status == SessionStatus::WaitingRoom {
            self.outbox.push(Outgoing::Send(Packet::StartGame {
                room_id: self.config.room_id.clone(),
            }));
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { client_id } => {
                debug!("Assigned client id {}", client_id);
                self.client_id = Some(client_id);
            }

            TransportEvent::RoomUpdate { players } => match self.status {
                SessionStatus::Idle | SessionStatus::WaitingRoom => {
                    self.roster = players;
                    if self.status == SessionStatus::Idle && self.join_pending {
                        self.join_pending = false;
                        self.transition(SessionStatus::WaitingRoom);
                    }
                }
                _ => self.merge_roster(players),
            },

            TransportEvent::GameStarted { start_time } => {
                if self.status != SessionStatus::WaitingRoom {
                    warn!("Ignoring start event while {:?}", self.status);
                    return;
                }
                if self.transition(SessionStatus::Playing) {
                    let clock = SessionClock::team(start_time, self.config.duration_secs);
                    self.begin_round(self.config.seed, clock);
                }
            }

            TransportEvent::PlayerUpdated { player } => self.upsert_player(player),

            TransportEvent::Error { message } => {
                warn!("Server error: {}", message);
                self.join_pending = false;
                self.last_error = Some(message);
            }

            TransportEvent::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.join_pending = false;
                self.last_error = Some(reason);
                if self.status == SessionStatus::WaitingRoom {
                    self.transition(SessionStatus::Idle);
                    self.roster.clear();
                    self.lobby_step = LobbyStep::Menu;
                }
            }
        }
    }

    /// Folds a roster snapshot into the current one once the round is under
    /// way. Players who left keep their last known entry, and our own entry
    /// is only ever changed by our own reports.
    fn merge_roster(&mut self, players: Vec<Player>) {
        for player in players {
            let is_me = Some(player.id) == self.client_id;
            if is_me && self.roster.iter().any(|p| p.id == player.id) {
                continue;
            }
            self.upsert_player(player);
        }
    }

    fn upsert_player(&mut self, player: Player) {
        match self.roster.iter_mut().find(|p| p.id == player.id) {
            Some(entry) => *entry = player,
            None => self.roster.push(player),
        }
    }

    /// Queues a score report and mirrors it into our own roster entry
    fn report(&mut self, status: PlayerStatus) {
        let score = self.score();
        self.outbox.push(Outgoing::Send(Packet::UpdatePlayer {
            room_id: self.config.room_id.clone(),
            score,
            status,
        }));

        if let Some(id) = self.client_id {
            if let Some(entry) = self.roster.iter_mut().find(|p| p.id == id) {
                entry.score = score;
                entry.status = status;
            }
        }
    }

    /// Advances the session by one tick of the fixed-rate loop
    pub fn tick(&mut self, now_ms: u64) {
        self.last_tick_ms = now_ms;
        match self.status {
            SessionStatus::Playing => self.tick_playing(now_ms),
            SessionStatus::Quiz => self.tick_quiz(now_ms),
            SessionStatus::WaitingResults => {
                if self.team_clock_expired(now_ms) {
                    self.transition(SessionStatus::Leaderboard);
                }
            }
            _ => {}
        }
    }

    fn team_clock_expired(&self, now_ms: u64) -> bool {
        self.mode == Mode::Team
            && self
                .clock
                .as_ref()
                .map(|c| c.is_expired(now_ms))
                .unwrap_or(false)
    }

    fn tick_playing(&mut self, now_ms: u64) {
        if self.mode == Mode::Team {
            match self.clock.as_ref().map(|c| c.read(now_ms)) {
                Some(ClockReading::Countdown { .. }) => return,
                Some(ClockReading::Expired) => {
                    self.finish();
                    return;
                }
                _ => {}
            }
        }

        let Some(sim) = self.sim.as_mut() else {
            return;
        };
        let events = sim.step();
        let sim_ticks = sim.ticks();

        for event in events {
            self.cues.push(event.clone());
            match event {
                SimEvent::Died(cause) => {
                    info!("Runner died: {:?}", cause);
                    self.die();
                    return;
                }
                SimEvent::QuizTriggered { question } => {
                    if self.transition(SessionStatus::Quiz) {
                        self.quiz = Some(ActiveQuiz::new(question));
                    }
                    return;
                }
                SimEvent::Jumped | SimEvent::CoinCollected { .. } => {}
            }
        }

        match self.mode {
            Mode::Solo => {
                if let Some(clock) = self.clock.as_mut() {
                    clock.tick();
                    if clock.is_expired(now_ms) {
                        self.finish();
                    }
                }
            }
            Mode::Team => {
                if sim_ticks % SCORE_REPORT_INTERVAL == 0 {
                    self.report(PlayerStatus::Alive);
                }
            }
        }
    }

    fn tick_quiz(&mut self, now_ms: u64) {
        if self.team_clock_expired(now_ms) {
            self.quiz = None;
            self.finish();
            return;
        }

        let timed_out = self.quiz.as_mut().and_then(|q| q.tick());
        if let Some(outcome) = timed_out {
            self.resolve_quiz(outcome);
        }
    }

    fn die(&mut self) {
        match self.mode {
            Mode::Solo => {
                self.transition(SessionStatus::GameOver);
            }
            Mode::Team => {
                self.report(PlayerStatus::Dead);
                self.transition(SessionStatus::WaitingResults);
            }
        }
    }

    /// Time ran out with the runner still alive
    fn finish(&mut self) {
        match self.mode {
            Mode::Solo => {
                self.transition(SessionStatus::Victory);
            }
            Mode::Team => {
                self.report(PlayerStatus::Finished);
                self.transition(SessionStatus::WaitingResults);
            }
        }
    }

    pub fn jump(&mut self) {
        if self.status != SessionStatus::Playing {
            return;
        }
        if let Some(clock) = &self.clock {
            if clock.is_counting_down(self.last_tick_ms) {
                return;
            }
        }
        if let Some(event) = self.sim.as_mut().and_then(|s| s.jump()) {
            self.cues.push(event);
        }
    }

    pub fn answer_quiz(&mut self, choice: usize) {
        if self.status != SessionStatus::Quiz {
            return;
        }
        let Some(quiz) = &self.quiz else {
            return;
        };
        let outcome = quiz.answer(&self.config.bank, choice);
        self.resolve_quiz(outcome);
    }

    fn resolve_quiz(&mut self, outcome: QuizOutcome) {
        info!("Quiz resolved: {:?}", outcome);
        if let Some(sim) = self.sim.as_mut() {
            sim.add_score(outcome.bonus());
        }
        self.quiz = None;
        self.transition(SessionStatus::Playing);
    }

    /// Leaves a finished round for the main menu
    pub fn return_to_menu(&mut self) {
        if !self.transition(SessionStatus::Idle) {
            return;
        }
        if self.mode == Mode::Team {
            self.outbox.push(Outgoing::Disconnect);
        }
        self.reset();
    }

    /// Forces the session back to the main menu from any state
    pub fn abort(&mut self) {
        if self.status != SessionStatus::Idle {
            info!("Session {:?} -> Idle (aborted)", self.status);
        }
        self.status = SessionStatus::Idle;
        self.outbox.push(Outgoing::Disconnect);
        self.reset();
    }

    fn reset(&mut self) {
        self.lobby_step = LobbyStep::Menu;
        self.join_pending = false;
        self.client_id = None;
        self.roster.clear();
        self.sim = None;
        self.clock = None;
        self.quiz = None;
    }

    pub fn drain_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    /// Simulation events since the last call, for sound or visual cues
    pub fn drain_cues(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.cues)
    }

    /// Roster ordered by score, best first
    pub fn leaderboard(&self) -> Vec<Player> {
        let mut players = self.roster.clone();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }

    pub fn frame(&self, now_ms: u64) -> Frame {
        let quiz = self.quiz.as_ref().and_then(|q| {
            self.config.bank.get(q.question()).map(|question| QuizFrame {
                prompt: question.prompt.clone(),
                options: question.options.clone(),
                seconds_left: q.seconds_left(),
            })
        });
        let (player_y, distance) = self
            .sim
            .as_ref()
            .map(|s| (s.world().player.y, s.world().distance))
            .unwrap_or((0.0, 0.0));

        Frame {
            status: self.status,
            mode: self.mode,
            lobby_step: self.lobby_step,
            score: self.score(),
            clock: self.clock.as_ref().map(|c| c.read(now_ms)),
            quiz,
            roster: if self.status == SessionStatus::Leaderboard {
                self.leaderboard()
            } else {
                self.roster.clone()
            },
            error: self.last_error.clone(),
            player_y,
            distance,
        }
    }
}
