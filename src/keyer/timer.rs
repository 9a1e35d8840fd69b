use crossbeam_channel::{after, never, Receiver};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Unarmed,
    Armed,
    /// Expired, but the event loop has not received the expiry yet
    Fired,
}

/// Single-shot, re-armable timer selected on by the event loop.
///
/// Each arm gets its own channel, so an expiry belonging to an interval that
/// was superseded can never be delivered against the next one.
pub struct KeyTimer {
    rx: Receiver<Instant>,
    armed: bool,
    interval: Option<Duration>,
}

impl KeyTimer {
    pub fn new() -> Self {
        Self {
            rx: never(),
            armed: false,
            interval: None,
        }
    }

    pub fn state(&self) -> TimerState {
        if !self.armed {
            TimerState::Unarmed
        } else if self.rx.is_empty() {
            TimerState::Armed
        } else {
            TimerState::Fired
        }
    }

    /// Cancel any outstanding arm, drop an unconsumed expiry, and arm again.
    pub fn arm(&mut self, interval: Duration) {
        self.discard();
        self.rx = after(interval);
        self.armed = true;
        self.interval = Some(interval);
    }

    fn discard(&mut self) {
        if self.state() == TimerState::Fired && self.rx.try_recv().is_ok() {
            log::debug!("discarded stale {:?} timer expiry", self.interval);
        }
    }

    /// Mark the expiry as received. Called once per delivered expiry.
    pub fn consume(&mut self) {
        self.armed = false;
    }

    /// Channel the event loop selects on.
    pub fn receiver(&self) -> &Receiver<Instant> {
        &self.rx
    }
}

#[cfg(test)]
impl KeyTimer {
    /// Interval of the most recent arm, while armed.
    pub fn interval(&self) -> Option<Duration> {
        if self.armed {
            self.interval
        } else {
            None
        }
    }
}

impl Default for KeyTimer {
    fn default() -> Self {
        Self::new()
    }
}
