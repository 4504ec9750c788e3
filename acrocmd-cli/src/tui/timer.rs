//! Owned timers polled by the UI loop
//!
//! Nothing runs in the background: the loop passes `Instant::now()` in and
//! the timer reports what elapsed. Dropping a timer cancels it.

use std::time::{Duration, Instant};

/// Periodic timer
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next_due: Instant,
}

impl Interval {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_due: now + period,
        }
    }

    /// Number of periods elapsed since the last poll
    pub fn poll(&mut self, now: Instant) -> u32 {
        if self.period.is_zero() || now < self.next_due {
            return 0;
        }
        let behind = now - self.next_due;
        let ticks = 1 + (behind.as_nanos() / self.period.as_nanos()) as u32;
        self.next_due += self.period * ticks;
        ticks
    }
}

/// One-shot timer
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(delay: Duration, now: Instant) -> Self {
        Self { at: now + delay }
    }

    pub fn expired(&self, now: Instant) -> bool {
        now >= self.at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_counts_elapsed_periods() {
        let start = Instant::now();
        let mut interval = Interval::new(Duration::from_millis(200), start);

        assert_eq!(interval.poll(start + Duration::from_millis(100)), 0);
        assert_eq!(interval.poll(start + Duration::from_millis(200)), 1);
        assert_eq!(interval.poll(start + Duration::from_millis(250)), 0);
        assert_eq!(interval.poll(start + Duration::from_millis(1000)), 4);
        assert_eq!(interval.poll(start + Duration::from_millis(1100)), 0);
    }

    #[test]
    fn test_deadline() {
        let start = Instant::now();
        let deadline = Deadline::after(Duration::from_secs(1), start);

        assert!(!deadline.expired(start + Duration::from_millis(999)));
        assert!(deadline.expired(start + Duration::from_secs(1)));
    }
}
