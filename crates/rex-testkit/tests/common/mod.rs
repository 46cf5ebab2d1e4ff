use std::collections::BTreeMap;
use std::sync::Arc;

use rex_config::{AppConfig, LadderRung, PriorityFee};
use rex_schemas::{Pair, PriceBounds};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

pub fn sol_usdc() -> Pair {
    Pair {
        base_symbol: "SOL".to_string(),
        quote_symbol: "USDC".to_string(),
        base_mint: "So1111111111111111111111111111111111111111".to_string(),
        quote_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
        base_decimals: 9,
        quote_decimals: 6,
    }
}

pub fn jup_usdc() -> Pair {
    Pair {
        base_symbol: "JUP".to_string(),
        quote_symbol: "USDC".to_string(),
        base_mint: "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN".to_string(),
        quote_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
        base_decimals: 6,
        quote_decimals: 6,
    }
}

/// A minimally valid config: one ladder rung, generous bounds, short
/// timeouts so tests don't wait on real clock time.
pub fn sample_config(pairs: Vec<Pair>) -> AppConfig {
    let mut bounds = BTreeMap::new();
    for p in &pairs {
        bounds.insert(p.identity(), PriceBounds { low: 0.0001, high: 10_000.0 });
    }

    AppConfig {
        wallet_address: "TestWallet1111111111111111111111111111111".to_string(),
        rpc_url: "http://localhost:8899".to_string(),
        aggregator_base_url: "http://localhost:9999".to_string(),
        price_primary_key: "test-key".to_string(),
        price_secondary_base_url: "http://localhost:9998".to_string(),
        pairs,
        bounds,
        tick_interval_s: 1,
        price_ttl_s: 30,
        confirm_timeout_s: 1,
        min_sol_reserve: 1.0,
        slippage_ladder: vec![
            LadderRung { slippage_bps: 50, priority_fee: PriorityFee::Auto },
            LadderRung { slippage_bps: 100, priority_fee: PriorityFee::Lamports(5_000) },
        ],
        max_slippage_bps: 200,
        failure_threshold: 4,
        failure_cooldown_s: 300,
        max_consecutive_errors: 5,
        reconcile_tolerance_pct: 0.10,
        max_price_impact_bps: 500,
        dry_run: true,
    }
}

pub fn test_audit_writer() -> rex_audit::AuditWriter {
    let path = std::env::temp_dir().join(format!("rex-testkit-{}.jsonl", uuid::Uuid::new_v4()));
    rex_audit::AuditWriter::new(path, true).expect("audit writer over a temp path always constructs")
}

pub fn test_signer() -> Arc<dyn Signer + Send + Sync> {
    Arc::new(Keypair::new())
}
