use serde::{Deserialize, Serialize};

/// Immutable trading pair metadata, provided entirely by configuration.
///
/// Identity is `"BASE/QUOTE"`; the core never mints new pairs at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub base_symbol: String,
    pub quote_symbol: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub base_decimals: u8,
    pub quote_decimals: u8,
}

impl Pair {
    pub fn identity(&self) -> String {
        format!("{}/{}", self.base_symbol, self.quote_symbol)
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identity())
    }
}

/// Per-pair price sanity bounds. Every configured pair must have one —
/// a pair with no bounds fails boot rather than trading on an unchecked feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBounds {
    pub low: f64,
    pub high: f64,
}

impl PriceBounds {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}
