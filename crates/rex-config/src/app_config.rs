use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use rex_schemas::{Pair, PriceBounds};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderRung {
    pub slippage_bps: u32,
    pub priority_fee: PriorityFee,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityFee {
    Auto,
    Lamports(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub wallet_address: String,
    pub rpc_url: String,
    pub aggregator_base_url: String,
    pub price_primary_key: String,
    pub price_secondary_base_url: String,

    pub pairs: Vec<Pair>,
    pub bounds: BTreeMap<String, PriceBounds>,

    pub tick_interval_s: u64,
    pub price_ttl_s: u64,
    pub confirm_timeout_s: u64,
    pub min_sol_reserve: f64,

    pub slippage_ladder: Vec<LadderRung>,
    pub max_slippage_bps: u32,

    pub failure_threshold: u32,
    pub failure_cooldown_s: u64,
    pub max_consecutive_errors: u32,

    pub reconcile_tolerance_pct: f64,
    pub max_price_impact_bps: u32,

    #[serde(default)]
    pub dry_run: bool,
}

impl AppConfig {
    /// Parses a canonical config document into a validated `AppConfig`.
    ///
    /// Fails closed: a pair with no matching `bounds` entry, an empty
    /// `pairs[]` list, or an empty ladder is a boot-time error, not a
    /// runtime default.
    pub fn from_canonical_json(value: &serde_json::Value) -> Result<Self> {
        let cfg: AppConfig =
            serde_json::from_value(value.clone()).context("config does not match AppConfig schema")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.pairs.is_empty() {
            bail!("config invalid: pairs[] must not be empty");
        }
        for pair in &self.pairs {
            if !self.bounds.contains_key(&pair.identity()) {
                bail!(
                    "config invalid: pair {} has no configured price bounds",
                    pair.identity()
                );
            }
        }
        if self.slippage_ladder.is_empty() {
            bail!("config invalid: slippage_ladder must not be empty");
        }
        for rung in &self.slippage_ladder {
            if rung.slippage_bps > self.max_slippage_bps {
                bail!(
                    "config invalid: ladder rung {}bps exceeds max_slippage_bps {}bps",
                    rung.slippage_bps,
                    self.max_slippage_bps
                );
            }
        }
        if self.min_sol_reserve < 0.0 {
            bail!("config invalid: min_sol_reserve must be non-negative");
        }
        if self.reconcile_tolerance_pct < 0.0 || self.reconcile_tolerance_pct > 1.0 {
            bail!("config invalid: reconcile_tolerance_pct must be in [0, 1]");
        }
        Ok(())
    }

    pub fn bounds_for(&self, pair_identity: &str) -> Option<PriceBounds> {
        self.bounds.get(pair_identity).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(pairs_bounds_ok: bool) -> serde_json::Value {
        let mut bounds = serde_json::Map::new();
        if pairs_bounds_ok {
            bounds.insert("SOL/USDC".to_string(), json!({"low": 50.0, "high": 500.0}));
        }
        json!({
            "wallet_address": "Aaaa",
            "rpc_url": "https://rpc.example",
            "aggregator_base_url": "https://agg.example",
            "price_primary_key": "key",
            "price_secondary_base_url": "https://secondary.example",
            "pairs": [{
                "base_symbol": "SOL", "quote_symbol": "USDC",
                "base_mint": "So1", "quote_mint": "USDC1",
                "base_decimals": 9, "quote_decimals": 6
            }],
            "bounds": bounds,
            "tick_interval_s": 30,
            "price_ttl_s": 10,
            "confirm_timeout_s": 45,
            "min_sol_reserve": 0.05,
            "slippage_ladder": [
                {"slippage_bps": 50, "priority_fee": "auto"},
                {"slippage_bps": 100, "priority_fee": {"lamports": 5000}}
            ],
            "max_slippage_bps": 200,
            "failure_threshold": 4,
            "failure_cooldown_s": 300,
            "max_consecutive_errors": 5,
            "reconcile_tolerance_pct": 0.10,
            "max_price_impact_bps": 100,
            "dry_run": false
        })
    }

    #[test]
    fn valid_config_parses() {
        let cfg = AppConfig::from_canonical_json(&sample(true)).unwrap();
        assert_eq!(cfg.pairs.len(), 1);
        assert!(cfg.bounds_for("SOL/USDC").is_some());
    }

    #[test]
    fn missing_bounds_for_configured_pair_fails_closed() {
        let err = AppConfig::from_canonical_json(&sample(false)).unwrap_err();
        assert!(err.to_string().contains("no configured price bounds"));
    }
}
