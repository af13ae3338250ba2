//! Round timing for solo and team sessions
//!
//! Solo rounds count simulation ticks. Team rounds are measured against the
//! server-issued start time so that every client expires together no matter
//! how fast its own loop runs.

use shared::TICKS_PER_SECOND;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockReading {
    /// Team round scheduled but not yet begun
    Countdown { until_start_ms: u64 },
    Running { remaining_ms: u64 },
    Expired,
}

impl ClockReading {
    /// Whole seconds left to show, rounded up
    pub fn display_seconds(&self) -> u64 {
        match self {
            ClockReading::Countdown { until_start_ms } => (until_start_ms + 999) / 1000,
            ClockReading::Running { remaining_ms } => (remaining_ms + 999) / 1000,
            ClockReading::Expired => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionClock {
    Solo { remaining_ticks: u64 },
    Team { start_time: u64, duration_ms: u64 },
}

impl SessionClock {
    pub fn solo(duration_secs: u32) -> Self {
        SessionClock::Solo {
            remaining_ticks: duration_secs as u64 * TICKS_PER_SECOND as u64,
        }
    }

    pub fn team(start_time: u64, duration_secs: u32) -> Self {
        SessionClock::Team {
            start_time,
            duration_ms: duration_secs as u64 * 1000,
        }
    }

    /// Counts one simulated tick. Team clocks ignore ticks.
    pub fn tick(&mut self) {
        if let SessionClock::Solo { remaining_ticks } = self {
            *remaining_ticks = remaining_ticks.saturating_sub(1);
        }
    }

    pub fn read(&self, now_ms: u64) -> ClockReading {
        match *self {
            SessionClock::Solo { remaining_ticks } => {
                if remaining_ticks == 0 {
                    ClockReading::Expired
                } else {
                    ClockReading::Running {
                        remaining_ms: remaining_ticks * 1000 / TICKS_PER_SECOND as u64,
                    }
                }
            }
            SessionClock::Team {
                start_time,
                duration_ms,
            } => {
                if now_ms < start_time {
                    return ClockReading::Countdown {
                        until_start_ms: start_time - now_ms,
                    };
                }
                let remaining_ms = duration_ms.saturating_sub(now_ms - start_time);
                if remaining_ms == 0 {
                    ClockReading::Expired
                } else {
                    ClockReading::Running { remaining_ms }
                }
            }
        }
    }

    /// Time left in the round; the full duration until a team round begins
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        match self.read(now_ms) {
            ClockReading::Countdown { .. } => match *self {
                SessionClock::Team { duration_ms, .. } => duration_ms,
                SessionClock::Solo { .. } => 0,
            },
            ClockReading::Running { remaining_ms } => remaining_ms,
            ClockReading::Expired => 0,
        }
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.read(now_ms) == ClockReading::Expired
    }

    /// True while a team round waits for its start time
    pub fn is_counting_down(&self, now_ms: u64) -> bool {
        matches!(self.read(now_ms), ClockReading::Countdown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_solo_expires_after_exact_tick_count() {
        let mut clock = SessionClock::solo(30);

        for _ in 0..1799 {
            clock.tick();
        }
        assert!(!clock.is_expired(0));

        clock.tick();
        assert!(clock.is_expired(0));

        // Extra ticks saturate.
        clock.tick();
        assert_eq!(clock, SessionClock::Solo { remaining_ticks: 0 });
    }

    #[test]
    fn test_solo_ignores_wall_clock() {
        let clock = SessionClock::solo(30);
        assert_eq!(clock.read(0), clock.read(u64::MAX));
        assert_eq!(clock.remaining_ms(0), 30_000);
    }

    #[test]
    fn test_team_countdown_before_start() {
        let clock = SessionClock::team(10_000, 30);

        assert_eq!(
            clock.read(7_000),
            ClockReading::Countdown {
                until_start_ms: 3_000
            }
        );
        assert!(clock.is_counting_down(9_999));
        assert_eq!(clock.remaining_ms(7_000), 30_000);
    }

    #[test]
    fn test_team_running_and_expiry() {
        let clock = SessionClock::team(10_000, 30);

        assert_eq!(
            clock.read(10_000),
            ClockReading::Running {
                remaining_ms: 30_000
            }
        );
        assert_eq!(
            clock.read(39_999),
            ClockReading::Running { remaining_ms: 1 }
        );
        assert_eq!(clock.read(40_000), ClockReading::Expired);
        assert_eq!(clock.remaining_ms(40_000), 0);
        assert_eq!(clock.remaining_ms(1_000_000), 0);
    }

    #[test]
    fn test_team_remaining_is_monotonic() {
        let clock = SessionClock::team(5_000, 30);
        let mut rng = StdRng::seed_from_u64(17);
        let mut now = 0u64;
        let mut last = clock.remaining_ms(now);

        while now < 40_000 {
            // Irregular frame times, from a busy loop to a stalled one.
            now += rng.gen_range(1..250);
            let remaining = clock.remaining_ms(now);
            assert!(remaining <= last, "went from {} to {} at {}", last, remaining, now);
            last = remaining;
        }

        assert_eq!(last, 0);
        assert!(clock.is_expired(now));
    }

    #[test]
    fn test_display_seconds_rounds_up() {
        assert_eq!(
            ClockReading::Running { remaining_ms: 29_001 }.display_seconds(),
            30
        );
        assert_eq!(
            ClockReading::Countdown {
                until_start_ms: 2_500
            }
            .display_seconds(),
            3
        );
        assert_eq!(ClockReading::Expired.display_seconds(), 0);
    }
}
