//! Quiz interrupt raised by special coins

use shared::{QUIZ_BONUS, QUIZ_SECONDS, TICKS_PER_SECOND};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct: usize,
}

impl Question {
    pub fn new(prompt: &str, options: &[&str], correct: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::new(vec![
            Question::new(
                "Which protocol guarantees in-order delivery?",
                &["UDP", "TCP", "ICMP", "ARP"],
                1,
            ),
            Question::new(
                "How many bits are in a byte?",
                &["4", "8", "16", "32"],
                1,
            ),
            Question::new(
                "What does CPU stand for?",
                &[
                    "Central Processing Unit",
                    "Core Power Unit",
                    "Computer Personal Unit",
                    "Central Program Utility",
                ],
                0,
            ),
            Question::new(
                "Which number is prime?",
                &["21", "27", "29", "33"],
                2,
            ),
            Question::new(
                "What is 0x10 in decimal?",
                &["10", "16", "32", "8"],
                1,
            ),
            Question::new(
                "Which port does HTTPS use by default?",
                &["80", "21", "443", "8080"],
                2,
            ),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Correct,
    Incorrect,
    TimedOut,
}

impl QuizOutcome {
    pub fn bonus(&self) -> u32 {
        match self {
            QuizOutcome::Correct => QUIZ_BONUS,
            QuizOutcome::Incorrect | QuizOutcome::TimedOut => 0,
        }
    }
}

/// A quiz in progress. The countdown is driven by simulation ticks, so a
/// stalled loop does not eat into the player's time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuiz {
    question: usize,
    seconds_left: u32,
    ticks_into_second: u32,
}

impl ActiveQuiz {
    pub fn new(question: usize) -> Self {
        Self {
            question,
            seconds_left: QUIZ_SECONDS,
            ticks_into_second: 0,
        }
    }

    pub fn question(&self) -> usize {
        self.question
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    /// Advances the countdown by one tick; yields `TimedOut` when it hits zero
    pub fn tick(&mut self) -> Option<QuizOutcome> {
        if self.seconds_left == 0 {
            return Some(QuizOutcome::TimedOut);
        }

        self.ticks_into_second += 1;
        if self.ticks_into_second >= TICKS_PER_SECOND {
            self.ticks_into_second = 0;
            self.seconds_left -= 1;
        }

        if self.seconds_left == 0 {
            Some(QuizOutcome::TimedOut)
        } else {
            None
        }
    }

    pub fn answer(&self, bank: &QuestionBank, choice: usize) -> QuizOutcome {
        match bank.get(self.question) {
            Some(question) if question.correct == choice => QuizOutcome::Correct,
            _ => QuizOutcome::Incorrect,
        }
    }
}
