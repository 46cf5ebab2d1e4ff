//! Shared domain types for the trade execution core: pairs, prices, the
//! 3-state transaction outcome, per-pair position state, and the decision
//! trace (`WhyNot`). No behavior lives here — only the data every other
//! crate in the workspace agrees on.

pub mod engine_state;
pub mod intent;
pub mod outcome;
pub mod pair;
pub mod pair_state;
pub mod price_point;
pub mod prices;
pub mod why_not;

pub use engine_state::EngineState;
pub use intent::{InflightIntent, IntentOutcome};
pub use outcome::{classify_failure, FailureKind, TxOutcome, TxResult};
pub use pair::{Pair, PriceBounds, Side};
pub use pair_state::{InflightHandle, PairState, PairStatus};
pub use price_point::{PricePoint, PriceSource};
pub use why_not::{WhyNot, WhyNotReason};
