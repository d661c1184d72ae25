use std::time::{Duration, Instant};

/// Cooperative deadline timer, polled by the event loop with an explicit `now`.
///
/// A repeating timer that is polled late fires once and reschedules from the
/// poll time; missed periods are dropped rather than replayed.
#[derive(Debug, Clone)]
pub struct Timer {
    interval: Duration,
    repeating: bool,
    deadline: Option<Instant>,
}

impl Timer {
    pub fn repeating(interval: Duration) -> Self {
        Self {
            interval,
            repeating: true,
            deadline: None,
        }
    }

    pub fn single_shot(interval: Duration) -> Self {
        Self {
            interval,
            repeating: false,
            deadline: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval. An active timer is rescheduled from `now`.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        if self.deadline.is_some() {
            self.deadline = Some(now + interval);
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true if the timer fired.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = if self.repeating {
                    let next = deadline + self.interval;
                    // Late poll: drop the missed periods
                    Some(if next <= now { now + self.interval } else { next })
                } else {
                    None
                };
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines.
pub fn earliest(deadlines: &[Option<Instant>]) -> Option<Instant> {
    deadlines.iter().flatten().min().copied()
}
