use chrono::{DateTime, Utc};

/// Per-source exponential backoff with a deterministic jitter term (no
/// randomness — the jitter fraction is derived from the failure count so
/// behavior stays reproducible in tests).
#[derive(Debug, Clone)]
pub struct SourceBackoff {
    consecutive_failures: u32,
    until: Option<DateTime<Utc>>,
    base_delay: chrono::Duration,
    max_delay: chrono::Duration,
    multiplier: f64,
}

impl SourceBackoff {
    pub fn new(base_delay: chrono::Duration, max_delay: chrono::Duration) -> Self {
        Self {
            consecutive_failures: 0,
            until: None,
            base_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    pub fn in_backoff(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|u| now < u)
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.until = None;
    }

    /// Enters backoff, doubling the delay each consecutive failure up to
    /// `max_delay`, plus a small deterministic jitter so sources that fail
    /// in lockstep don't retry in lockstep either.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let exp = self.multiplier.powi((self.consecutive_failures - 1) as i32);
        let raw_ms = (self.base_delay.num_milliseconds() as f64 * exp).min(self.max_delay.num_milliseconds() as f64);
        let jitter_fraction = 1.0 + (self.consecutive_failures % 5) as f64 * 0.05;
        let delay_ms = (raw_ms * jitter_fraction) as i64;
        self.until = Some(now + chrono::Duration::milliseconds(delay_ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_backoff_before_first_failure() {
        let b = SourceBackoff::new(chrono::Duration::milliseconds(100), chrono::Duration::seconds(30));
        assert!(!b.in_backoff(Utc::now()));
    }

    #[test]
    fn failure_enters_backoff_window() {
        let mut b = SourceBackoff::new(chrono::Duration::milliseconds(100), chrono::Duration::seconds(30));
        let now = Utc::now();
        b.record_failure(now);
        assert!(b.in_backoff(now));
    }

    #[test]
    fn success_clears_backoff() {
        let mut b = SourceBackoff::new(chrono::Duration::milliseconds(100), chrono::Duration::seconds(30));
        let now = Utc::now();
        b.record_failure(now);
        b.record_success();
        assert!(!b.in_backoff(now));
    }

    #[test]
    fn delay_is_capped_at_max() {
        let mut b = SourceBackoff::new(chrono::Duration::milliseconds(100), chrono::Duration::milliseconds(500));
        let now = Utc::now();
        for _ in 0..10 {
            b.record_failure(now);
        }
        let until = b.until.unwrap();
        assert!(until - now <= chrono::Duration::milliseconds(600));
    }
}
