//! Dual-source, fail-closed price oracle: TTL-bounded caching, per-pair
//! sanity bounds, and per-source exponential backoff. Never fabricates or
//! interpolates a price — "no valid price ⇒ do not trade".

pub mod backoff;
pub mod oracle;
pub mod source;

pub use oracle::{PriceOracle, PriceOutcome};
pub use source::{FeedError, HttpPriceFeed, PriceFeed};
