use crate::DeterministicRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Countdown timer with a base interval and a symmetric random jitter.
///
/// A fresh timer is due immediately. Each time it fires it is rearmed to
/// `interval ± jitter`, which spreads equally configured components across
/// frames. An interval of zero fires every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpdateInterval {
    interval: f32,
    jitter: f32,
    countdown: f32,
}

impl UpdateInterval {
    pub fn new(interval: f32, jitter: f32) -> Self {
        assert!(
            interval >= 0.0 && jitter >= 0.0,
            "update interval and jitter must be non-negative (interval={interval}, jitter={jitter})"
        );
        Self {
            interval,
            jitter,
            countdown: 0.0,
        }
    }

    /// Fires on every tick.
    pub fn every_tick() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn jitter(&self) -> f32 {
        self.jitter
    }

    pub fn countdown(&self) -> f32 {
        self.countdown
    }

    pub fn set_countdown(&mut self, countdown: f32) {
        self.countdown = countdown;
    }

    pub fn is_due(&self) -> bool {
        self.countdown <= 0.0
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        self.countdown -= dt_seconds;
    }

    pub fn rearm<R: DeterministicRng>(&mut self, rng: &mut R) {
        let jitter = if self.jitter > 0.0 {
            rng.next_f32_range(-self.jitter, self.jitter)
        } else {
            0.0
        };
        self.countdown = (self.interval + jitter).max(0.0);
    }

    /// Advance by `dt_seconds`; if the timer is due, rearm it and return `true`.
    pub fn poll<R: DeterministicRng>(&mut self, dt_seconds: f32, rng: &mut R) -> bool {
        self.advance(dt_seconds);
        if !self.is_due() {
            return false;
        }
        self.rearm(rng);
        true
    }
}

impl Default for UpdateInterval {
    fn default() -> Self {
        Self::every_tick()
    }
}
