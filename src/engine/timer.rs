// Per-question countdown.

/// Result of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// Still counting; carries the new remaining value.
    Running(u32),
    /// Reached zero on this tick. The question must be force-advanced.
    Expired,
    /// Timer is suspended (battle complete or torn down); nothing happened.
    Suspended,
}

/// The single authoritative countdown for the active question.
#[derive(Debug, Clone)]
pub struct Countdown {
    limit: u32,
    remaining: u32,
    suspended: bool,
}

impl Countdown {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            remaining: limit,
            suspended: false,
        }
    }

    /// Decrement by one second.
    pub fn tick(&mut self) -> TimerSignal {
        if self.suspended {
            return TimerSignal::Suspended;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            TimerSignal::Expired
        } else {
            TimerSignal::Running(self.remaining)
        }
    }

    /// Restart for a new question.
    pub fn reset(&mut self, limit: u32) {
        self.limit = limit;
        self.remaining = limit;
        self.suspended = false;
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }
}
