//! Cancellable deferred release owned by a button

use std::time::{Duration, Instant};

/// A single pending deadline
///
/// Scheduling replaces any pending deadline; firing or cancelling clears it.
/// The owner polls it with the current time, so no background thread or
/// runtime is involved.
#[derive(Debug, Clone, Default)]
pub struct ReleaseTimer {
    deadline: Option<Instant>,
}

impl ReleaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)schedule the timer to fire `after` from `now`
    pub fn schedule(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    /// Drop the pending deadline. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Consume the deadline if it has elapsed at `now`
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = ReleaseTimer::new();
        timer.schedule(start, Duration::from_millis(300));

        assert!(!timer.fire_if_due(start + Duration::from_millis(299)));
        assert!(timer.fire_if_due(start + Duration::from_millis(300)));
        assert!(!timer.fire_if_due(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let start = Instant::now();
        let mut timer = ReleaseTimer::new();
        timer.schedule(start, Duration::from_millis(300));
        timer.schedule(start + Duration::from_millis(200), Duration::from_millis(300));

        assert!(!timer.fire_if_due(start + Duration::from_millis(400)));
        assert!(timer.fire_if_due(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut timer = ReleaseTimer::new();
        assert!(!timer.cancel());

        timer.schedule(start, Duration::from_millis(10));
        assert!(timer.is_pending());
        assert!(timer.cancel());
        assert!(!timer.fire_if_due(start + Duration::from_secs(1)));
    }
}
