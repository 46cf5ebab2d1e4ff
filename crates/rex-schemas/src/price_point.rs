use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    Primary,
    Secondary,
}

/// A validated price observation. Construction is the oracle's job —
/// everywhere else in the core, a `PricePoint` is assumed already
/// schema-valid, positive, and finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub pair_identity: String,
    pub price: f64,
    pub captured_at: DateTime<Utc>,
    pub source: PriceSource,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

impl PricePoint {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.age(now) <= ttl
    }
}
