use serde::{Deserialize, Serialize};

/// Simulation timestamp in seconds since the match started.
pub type SimTime = f32;

/// Monotonic simulation clock advanced by the fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    now: SimTime,
    ticks: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance by `dt` seconds. Negative or non-finite steps are ignored.
    pub fn advance(&mut self, dt: f32) -> SimTime {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt;
            self.ticks += 1;
        }
        self.now
    }
}

/// Rate gate: an action may run once per `period` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    period: f32,
    last: Option<SimTime>,
}

impl Cooldown {
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(0.0),
            last: None,
        }
    }

    /// Cooldown for an action allowed `per_second` times per second.
    pub fn per_second(per_second: f32) -> Self {
        if per_second > 0.0 && per_second.is_finite() {
            Self::new(1.0 / per_second)
        } else {
            Self::new(0.0)
        }
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    pub fn last(&self) -> Option<SimTime> {
        self.last
    }

    pub fn ready(&self, now: SimTime) -> bool {
        match self.last {
            Some(last) => now - last >= self.period,
            None => true,
        }
    }

    /// Record a use at `now` if the gate is open. Returns whether it was.
    pub fn try_trigger(&mut self, now: SimTime) -> bool {
        if !self.ready(now) {
            return false;
        }
        // Keep the timestamp monotonic even if a caller passes an older `now`.
        self.last = Some(self.last.map_or(now, |last| last.max(now)));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
