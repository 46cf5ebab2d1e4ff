//! Aggregator HTTP client: route quotes and swap-transaction building.
//! Retries are applied only to `quote` (idempotent, read-only); `build_swap`
//! is never retried internally — the attempt ladder owns that policy.

pub mod client;
pub mod types;

pub use client::{AggregatorClient, HttpAggregatorClient};
pub use types::{PriorityFeeLamports, Quote};
