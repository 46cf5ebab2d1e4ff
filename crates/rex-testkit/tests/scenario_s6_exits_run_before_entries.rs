//! A pair with both an exit signal and an entry signal in the same tick must
//! close before it reopens. If entries ran first, the open-position guard
//! would reject the entry outright and the pair would end the tick flat.

use std::collections::HashMap;
use std::sync::Arc;

use rex_audit::AuditWriter;
use rex_price::PriceOracle;
use rex_runtime::Scheduler;
use rex_schemas::{PairStatus, Side, TxOutcome};
use rex_strategy::{FixedStrategy, Signal};
use rex_testkit::{dummy_unsigned_tx_bytes, sample_quote, MockAggregatorClient, MockChainClient, MockPriceFeed};

mod common;

#[tokio::test]
async fn scenario_exit_then_reentry_happens_in_one_tick() {
    let pair = common::sol_usdc();
    let config = common::sample_config(vec![pair.clone()]);

    let chain = Arc::new(MockChainClient::new(config.wallet_address.clone()));
    chain.set_native_balance(5_000_000_000);

    let primary = Arc::new(MockPriceFeed::new("primary", Some(10.0)));
    let secondary = Arc::new(MockPriceFeed::new("secondary", Some(10.0)));
    let bounds: HashMap<String, _> = config.bounds.clone().into_iter().collect();
    let oracle = Arc::new(PriceOracle::new(primary, secondary, bounds, chrono::Duration::seconds(config.price_ttl_s as i64)));

    let aggregator: Arc<dyn rex_aggregator::AggregatorClient> = Arc::new(
        MockAggregatorClient::new()
            .with_default_quote(sample_quote(10_000_000, 100_000_000, 10))
            .with_default_tx_bytes(dummy_unsigned_tx_bytes()),
    );

    let mut strategy = FixedStrategy::new(50_000_000);
    strategy.set_exit(pair.identity(), Some("take_profit".to_string()));
    strategy.set_entry(pair.identity(), Signal::Long);

    let audit = AuditWriter::new(std::env::temp_dir().join(format!("rex-s6-{}.jsonl", uuid::Uuid::new_v4())), true).unwrap();

    let mut scheduler = Scheduler::new(config.clone(), chain.clone(), common::test_signer(), oracle, aggregator, Arc::new(strategy), audit);

    let seeded_at = chrono::Utc::now() - chrono::Duration::hours(1);
    scheduler
        .state_machine_for_test()
        .apply_outcome(&pair.identity(), Side::Buy, "seed", TxOutcome::Success, Some(9.5), Some(100_000_000), seeded_at);

    scheduler.run_tick().await.unwrap();

    let state = scheduler.state_machine_for_test().state_of(&pair.identity());
    assert!(matches!(state.status, PairStatus::Open), "pair should have re-entered after the exit, not stayed flat");
    assert!(state.opened_at.unwrap() > seeded_at, "opened_at should reflect the new entry, not the seeded one");
}
