//! Trait boundary between the execution core and whatever indicator logic a
//! concrete strategy supplies. No indicator math (RSI, mean-reversion, or
//! otherwise) lives in this workspace — only the boundary and a deterministic
//! test double used to exercise the tick loop.

use async_trait::async_trait;

use rex_schemas::PricePoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Long,
    Flat,
}

/// Implementations keep whatever indicator state they need internally;
/// this core never inspects it.
#[async_trait]
pub trait StrategySignal: Send + Sync {
    /// Feeds a fresh price into indicator state. Called every tick for every
    /// pair with a valid price, regardless of position status, so exit
    /// signals stay fresh even while a position is open.
    async fn on_price(&self, pair_identity: &str, price: &PricePoint);

    /// Consulted only when `can_enter(pair)` is true.
    async fn entry_signal(&self, pair_identity: &str) -> Signal;

    /// Consulted only when `can_exit(pair)` is true. `None` means hold.
    /// The returned reason is an opaque human-readable string surfaced in
    /// the audit log, never interpreted by the core.
    async fn exit_signal(&self, pair_identity: &str, price: &PricePoint) -> Option<String>;

    /// Consulted once per BUY intent to size the trade.
    async fn size_trade(&self, pair_identity: &str, equity: f64, price: f64) -> i64;
}

/// Deterministic test double: returns whatever was configured for a pair,
/// with no internal indicator state. The only concrete `StrategySignal`
/// this workspace ships.
pub struct FixedStrategy {
    entries: std::collections::HashMap<String, Signal>,
    exits: std::collections::HashMap<String, Option<String>>,
    fixed_size_base: i64,
}

impl FixedStrategy {
    pub fn new(fixed_size_base: i64) -> Self {
        Self {
            entries: std::collections::HashMap::new(),
            exits: std::collections::HashMap::new(),
            fixed_size_base,
        }
    }

    pub fn set_entry(&mut self, pair_identity: impl Into<String>, signal: Signal) {
        self.entries.insert(pair_identity.into(), signal);
    }

    pub fn set_exit(&mut self, pair_identity: impl Into<String>, reason: Option<String>) {
        self.exits.insert(pair_identity.into(), reason);
    }
}

#[async_trait]
impl StrategySignal for FixedStrategy {
    async fn on_price(&self, _pair_identity: &str, _price: &PricePoint) {}

    async fn entry_signal(&self, pair_identity: &str) -> Signal {
        self.entries.get(pair_identity).copied().unwrap_or(Signal::Flat)
    }

    async fn exit_signal(&self, pair_identity: &str, _price: &PricePoint) -> Option<String> {
        self.exits.get(pair_identity).cloned().flatten()
    }

    async fn size_trade(&self, _pair_identity: &str, _equity: f64, _price: f64) -> i64 {
        self.fixed_size_base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_strategy_returns_configured_entry_signal() {
        let mut s = FixedStrategy::new(100_000_000);
        s.set_entry("SOL/USDC", Signal::Long);
        assert_eq!(s.entry_signal("SOL/USDC").await, Signal::Long);
        assert_eq!(s.entry_signal("JUP/USDC").await, Signal::Flat);
    }

    #[tokio::test]
    async fn fixed_strategy_returns_configured_exit_reason() {
        let mut s = FixedStrategy::new(1);
        s.set_exit("SOL/USDC", Some("target_reached".to_string()));
        let price = PricePoint {
            pair_identity: "SOL/USDC".to_string(),
            price: 100.0,
            captured_at: chrono::Utc::now(),
            source: rex_schemas::PriceSource::Primary,
            base_decimals: 9,
            quote_decimals: 6,
        };
        assert_eq!(s.exit_signal("SOL/USDC", &price).await, Some("target_reached".to_string()));
    }
}
