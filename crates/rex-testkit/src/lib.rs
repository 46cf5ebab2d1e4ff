//! Deterministic test doubles shared across the workspace's scenario tests:
//! an in-memory `ChainClient`, a scriptable `AggregatorClient`, and a
//! fixed-price `PriceFeed`. Production code never depends on this crate.

pub mod mock_aggregator;
pub mod mock_chain;
pub mod mock_price_feed;

pub use mock_aggregator::{dummy_unsigned_tx_bytes, sample_quote, MockAggregatorClient};
pub use mock_chain::MockChainClient;
pub use mock_price_feed::MockPriceFeed;
