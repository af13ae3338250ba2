//! Headless input: an autopilot that plays the round on its own

use crate::session::{Session, SessionStatus};
use crate::world::World;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::TICKS_PER_SECOND;

/// Jump when a crate's front edge comes this close
const CRATE_TRIGGER: f32 = 30.0;

/// Jump when the ground ends this far past the runner's back edge
const PIT_PROBE: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Jump,
    Answer(usize),
}

/// True if a crate or the end of the ground is close enough to jump for
pub fn hazard_ahead(world: &World) -> bool {
    let player = world.player.rect();

    let crate_close = world
        .obstacles
        .iter()
        .any(|o| o.rect.right() > player.x && o.rect.x - player.right() <= CRATE_TRIGGER);

    let pit_close = !world.has_ground(player.x + PIT_PROBE, 2.0);

    crate_close || pit_close
}

/// Generates commands from the session state, one decision per tick
pub struct Autopilot {
    rng: StdRng,
    accuracy: f64,
    think_ticks: u32,
    quiz_ticks: u32,
    armed: bool,
}

impl Autopilot {
    pub fn new(seed: u64, accuracy: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            accuracy: accuracy.clamp(0.0, 1.0),
            think_ticks: TICKS_PER_SECOND * 2,
            quiz_ticks: 0,
            armed: true,
        }
    }

    pub fn decide(&mut self, session: &Session) -> Option<Command> {
        match session.status() {
            SessionStatus::Playing => {
                self.quiz_ticks = 0;
                let world = session.simulation()?.world();

                if !hazard_ahead(world) {
                    self.armed = true;
                    return None;
                }
                if self.armed && !world.player.is_jumping {
                    self.armed = false;
                    return Some(Command::Jump);
                }
                None
            }
            SessionStatus::Quiz => {
                self.quiz_ticks += 1;
                if self.quiz_ticks < self.think_ticks {
                    return None;
                }
                self.quiz_ticks = 0;

                let quiz = session.quiz()?;
                let question = session.question_bank().get(quiz.question())?;
                let choice = if self.rng.gen_bool(self.accuracy) {
                    question.correct
                } else {
                    (question.correct + 1) % question.options.len().max(1)
                };
                Some(Command::Answer(choice))
            }
            _ => {
                self.quiz_ticks = 0;
                self.armed = true;
                None
            }
        }
    }
}

/// Feeds a command into the session
pub fn apply(session: &mut Session, command: Command) {
    match command {
        Command::Jump => session.jump(),
        Command::Answer(choice) => session.answer_quiz(choice),
    }
}
