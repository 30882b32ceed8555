//! Level clock
//!
//! Counts whole seconds while a level is being played. The host drives it
//! from a recurring one-second callback. Each start hands out a fresh
//! `TimerToken`; ticks carrying any other token are ignored, and stopping
//! returns the running token exactly once so the host can cancel its
//! callback.

use serde::{Deserialize, Serialize};

use crate::format_time;

/// Identifies one run of the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelClock {
    seconds: u32,
    running: Option<TimerToken>,
    next_id: u64,
}

impl LevelClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero and start counting
    ///
    /// Starting while already running replaces the old run; its token stops
    /// ticking.
    pub fn start(&mut self) -> TimerToken {
        if let Some(old) = self.running {
            log::warn!("Clock restarted while running (token {} superseded)", old.0);
        }
        self.next_id += 1;
        let token = TimerToken(self.next_id);
        self.seconds = 0;
        self.running = Some(token);
        log::debug!("Clock started (token {})", token.0);
        token
    }

    /// Advance one second. Returns false if `token` is not the running one,
    /// which tells the host to cancel that callback.
    pub fn tick(&mut self, token: TimerToken) -> bool {
        if self.running != Some(token) {
            return false;
        }
        self.seconds = self.seconds.saturating_add(1);
        true
    }

    /// Stop counting, keeping the elapsed value
    pub fn stop(&mut self) -> Option<TimerToken> {
        let token = self.running.take();
        if token.is_some() {
            log::info!("Clock stopped at {}", self.display());
        }
        token
    }

    /// Stop and clear the elapsed value
    pub fn reset(&mut self) -> Option<TimerToken> {
        let token = self.stop();
        self.seconds = 0;
        token
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn token(&self) -> Option<TimerToken> {
        self.running
    }

    /// Elapsed time as `MM:SS`
    pub fn display(&self) -> String {
        format_time(self.seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_tick_stop() {
        let mut clock = LevelClock::new();
        let token = clock.start();
        for _ in 0..75 {
            assert!(clock.tick(token));
        }
        assert_eq!(clock.stop(), Some(token));
        assert_eq!(clock.seconds(), 75);
        assert_eq!(clock.display(), "01:15");
    }

    #[test]
    fn test_stop_returns_token_once() {
        let mut clock = LevelClock::new();
        let token = clock.start();
        assert_eq!(clock.stop(), Some(token));
        assert_eq!(clock.stop(), None);
        assert!(!clock.tick(token));
    }

    #[test]
    fn test_restart_resets_and_invalidates_old_token() {
        let mut clock = LevelClock::new();
        let first = clock.start();
        clock.tick(first);
        clock.tick(first);
        let second = clock.start();
        assert_ne!(first, second);
        assert_eq!(clock.seconds(), 0);
        assert!(!clock.tick(first));
        assert!(clock.tick(second));
        assert_eq!(clock.seconds(), 1);
    }

    #[test]
    fn test_reset_clears_value() {
        let mut clock = LevelClock::new();
        let token = clock.start();
        clock.tick(token);
        assert_eq!(clock.reset(), Some(token));
        assert_eq!(clock.display(), "00:00");
        assert!(!clock.is_running());
    }
}
