//! Sliding-window limiter for the socket read loop.
//!
//! Sits in front of message parsing so a flooding client is cut off
//! before any game-level work happens. The game's own per-action rate
//! budget lives in the core; this one only protects the transport.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct MessageLimiter {
    timestamps: VecDeque<Instant>,
    max_messages: usize,
    window: Duration,
}

impl MessageLimiter {
    pub fn new(max_messages: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_messages),
            max_messages,
            window,
        }
    }

    /// Burst protection: 10 messages per second.
    pub fn burst() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Sustained protection: 120 messages per minute.
    pub fn sustained() -> Self {
        Self::new(120, Duration::from_secs(60))
    }

    /// Record one message; returns false when over budget.
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        while self
            .timestamps
            .front()
            .is_some_and(|&ts| now.duration_since(ts) > self.window)
        {
            self.timestamps.pop_front();
        }
        if self.timestamps.len() >= self.max_messages {
            return false;
        }
        self.timestamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_budget() {
        let mut limiter = MessageLimiter::new(3, Duration::from_secs(1));
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[test]
    fn window_drains() {
        let mut limiter = MessageLimiter::new(2, Duration::from_millis(50));
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.check());
    }
}
