//! Presentation boundary
//!
//! Rendering and audio live behind [`FrameSink`]. The bundled [`LogHud`]
//! writes a status line through `log` whenever the visible state changes.

use crate::game::{DeathCause, SimEvent};
use crate::session::{Frame, SessionStatus};
use log::info;

pub trait FrameSink {
    /// Called once per loop iteration with the current snapshot
    fn present(&mut self, frame: &Frame);

    /// Called for each simulation event, for sound or flash effects
    fn cue(&mut self, _event: &SimEvent) {}
}

/// One-line summary of a frame
pub fn status_line(frame: &Frame) -> String {
    let clock = frame
        .clock
        .map(|c| format!("{}s", c.display_seconds()))
        .unwrap_or_else(|| "--".to_string());

    match frame.status {
        SessionStatus::Idle => match &frame.error {
            Some(error) => format!("[menu] {}", error),
            None => "[menu]".to_string(),
        },
        SessionStatus::WaitingRoom => {
            let ready = frame.roster.iter().filter(|p| p.is_ready).count();
            format!("[lobby] {}/{} ready", ready, frame.roster.len())
        }
        SessionStatus::Quiz => match &frame.quiz {
            Some(quiz) => format!(
                "[quiz {}s] {} {:?}",
                quiz.seconds_left, quiz.prompt, quiz.options
            ),
            None => "[quiz]".to_string(),
        },
        SessionStatus::Leaderboard => {
            let ranking: Vec<String> = frame
                .roster
                .iter()
                .enumerate()
                .map(|(i, p)| format!("{}. {} {}", i + 1, p.name, p.score))
                .collect();
            format!("[results] {}", ranking.join(" | "))
        }
        status => format!(
            "[{:?}] time {} score {} distance {:.0}",
            status, clock, frame.score, frame.distance
        ),
    }
}

/// Logs a status line when the status or the visible second changes
#[derive(Default)]
pub struct LogHud {
    last: Option<(SessionStatus, u64, u32, Option<u32>)>,
    lines: usize,
}

impl LogHud {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn lines_logged(&self) -> usize {
        self.lines
    }
}

impl FrameSink for LogHud {
    fn present(&mut self, frame: &Frame) {
        let seconds = frame.clock.map(|c| c.display_seconds()).unwrap_or(0);
        let quiz_seconds = frame.quiz.as_ref().map(|q| q.seconds_left);
        let key = (frame.status, seconds, frame.roster.len() as u32, quiz_seconds);

        if self.last == Some(key) {
            return;
        }
        self.last = Some(key);
        self.lines += 1;
        info!("{}", status_line(frame));
    }

    fn cue(&mut self, event: &SimEvent) {
        match event {
            SimEvent::Died(DeathCause::Fell) => info!("*fall*"),
            SimEvent::Died(DeathCause::Obstacle) => info!("*crash*"),
            SimEvent::QuizTriggered { .. } => info!("*chime*"),
            SimEvent::Jumped | SimEvent::CoinCollected { .. } => {}
        }
    }
}
