use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The sole human-readable decision trace. Emitted once per pair per tick,
/// and once more per executed trade outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhyNotReason {
    PriceFetchFailed,
    PriceStale,
    PositionAlreadyOpen,
    TradeInflight,
    SignalFlat,
    RsiNotOversold,
    InsufficientHistory,
    EnginePaused,
    SolReserveLow,
    ConsecutiveErrors,
    QuoteFailed,
    SwapTxFailed,
    TxFailed,
    TradeExecuted,
}

impl std::fmt::Display for WhyNotReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WhyNotReason::PriceFetchFailed => "price_fetch_failed",
            WhyNotReason::PriceStale => "price_stale",
            WhyNotReason::PositionAlreadyOpen => "position_already_open",
            WhyNotReason::TradeInflight => "trade_inflight",
            WhyNotReason::SignalFlat => "signal_flat",
            WhyNotReason::RsiNotOversold => "rsi_not_oversold",
            WhyNotReason::InsufficientHistory => "insufficient_history",
            WhyNotReason::EnginePaused => "engine_paused",
            WhyNotReason::SolReserveLow => "sol_reserve_low",
            WhyNotReason::ConsecutiveErrors => "consecutive_errors",
            WhyNotReason::QuoteFailed => "quote_failed",
            WhyNotReason::SwapTxFailed => "swap_tx_failed",
            WhyNotReason::TxFailed => "tx_failed",
            WhyNotReason::TradeExecuted => "trade_executed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhyNot {
    pub pair_identity: String,
    pub tick_seq: u64,
    pub reason: WhyNotReason,
    pub detail: Option<String>,
    pub ts: DateTime<Utc>,
}

impl WhyNot {
    pub fn new(pair_identity: impl Into<String>, tick_seq: u64, reason: WhyNotReason, ts: DateTime<Utc>) -> Self {
        Self {
            pair_identity: pair_identity.into(),
            tick_seq,
            reason,
            detail: None,
            ts,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
