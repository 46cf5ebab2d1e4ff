//! Shutdown drains every open position toward flat, SOL last, and never
//! sells through the configured SOL reserve.

use std::collections::HashMap;
use std::sync::Arc;

use rex_audit::AuditWriter;
use rex_price::PriceOracle;
use rex_runtime::Scheduler;
use rex_schemas::{PairStatus, Side, TxOutcome};
use rex_strategy::FixedStrategy;
use rex_testkit::{dummy_unsigned_tx_bytes, sample_quote, MockAggregatorClient, MockChainClient, MockPriceFeed};

mod common;

#[tokio::test]
async fn scenario_flatten_all_skips_sol_exit_at_reserve_but_flattens_others() {
    let sol_usdc = common::sol_usdc();
    let jup_usdc = common::jup_usdc();
    let mut config = common::sample_config(vec![sol_usdc.clone(), jup_usdc.clone()]);
    config.min_sol_reserve = 1.0;

    let chain = Arc::new(MockChainClient::new(config.wallet_address.clone()));
    // At or below the 1 SOL reserve: the SOL pair must not be sold down further.
    chain.set_native_balance(1_000_000_000);

    let primary = Arc::new(MockPriceFeed::new("primary", Some(10.0)));
    let secondary = Arc::new(MockPriceFeed::new("secondary", Some(10.0)));
    let bounds: HashMap<String, _> = config.bounds.clone().into_iter().collect();
    let oracle = Arc::new(PriceOracle::new(primary, secondary, bounds, chrono::Duration::seconds(config.price_ttl_s as i64)));

    let aggregator: Arc<dyn rex_aggregator::AggregatorClient> = Arc::new(
        MockAggregatorClient::new()
            .with_default_quote(sample_quote(10_000_000, 100_000_000, 10))
            .with_default_tx_bytes(dummy_unsigned_tx_bytes()),
    );

    let strategy = FixedStrategy::new(0);
    let audit = AuditWriter::new(std::env::temp_dir().join(format!("rex-s7-{}.jsonl", uuid::Uuid::new_v4())), true).unwrap();

    let mut scheduler = Scheduler::new(config.clone(), chain.clone(), common::test_signer(), oracle, aggregator, Arc::new(strategy), audit);

    let now = chrono::Utc::now();
    scheduler
        .state_machine_for_test()
        .apply_outcome(&sol_usdc.identity(), Side::Buy, "seed-sol", TxOutcome::Success, Some(9.0), Some(100_000_000), now);
    scheduler
        .state_machine_for_test()
        .apply_outcome(&jup_usdc.identity(), Side::Buy, "seed-jup", TxOutcome::Success, Some(0.9), Some(50_000_000), now);

    scheduler.set_exit_only_mode(true);
    scheduler.flatten_all().await;

    let sol_state = scheduler.state_machine_for_test().state_of(&sol_usdc.identity());
    let jup_state = scheduler.state_machine_for_test().state_of(&jup_usdc.identity());

    assert!(matches!(sol_state.status, PairStatus::Open), "SOL exit must be skipped at or below reserve");
    assert!(matches!(jup_state.status, PairStatus::Flat), "JUP must be flattened even while SOL is held back");
}
