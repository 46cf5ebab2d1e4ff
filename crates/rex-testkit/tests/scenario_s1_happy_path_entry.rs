//! A BUY that confirms on the first attempt opens the position with the
//! entry price and size derived from the quote.

use std::sync::Arc;

use rex_execution::{AttemptLadder, ExecutionCoordinator, LadderPolicy, LadderRung, PairStateMachine, Reconciler, ReconcilerConfig, TxExecutor, TxExecutorConfig};
use rex_schemas::{PairStatus, Side};
use rex_testkit::{dummy_unsigned_tx_bytes, sample_quote, MockAggregatorClient, MockChainClient};

mod common;

#[tokio::test]
async fn scenario_buy_confirms_and_opens_position() {
    let pair = common::sol_usdc();
    let chain = Arc::new(MockChainClient::new("local"));
    chain.set_token_balance(&pair.base_mint, 0);
    chain.set_token_balance(&pair.quote_mint, 500_000_000);

    let aggregator: Arc<dyn rex_aggregator::AggregatorClient> = Arc::new(
        MockAggregatorClient::new()
            .with_default_quote(sample_quote(10_000_000, 100_000_000, 10))
            .with_default_tx_bytes(dummy_unsigned_tx_bytes()),
    );

    let executor = Arc::new(TxExecutor::new(
        chain.clone(),
        common::test_signer(),
        TxExecutorConfig { confirm_timeout: std::time::Duration::from_millis(50), poll_interval: std::time::Duration::from_millis(5), dry_run: true },
    ));
    let reconciler = Arc::new(Reconciler::new(chain.clone(), ReconcilerConfig { settle_delay: std::time::Duration::from_millis(0), tolerance_pct: 0.1 }));
    let ladder = AttemptLadder::new(vec![LadderRung { slippage_bps: 50, priority_fee: rex_aggregator::PriorityFeeLamports::Auto }], 200);
    let coordinator = ExecutionCoordinator::new(aggregator, executor, reconciler, ladder, 500, "TestWallet".to_string());

    let mut state_machine = PairStateMachine::new(LadderPolicy { failure_threshold: 4, failure_cooldown: chrono::Duration::seconds(300) });

    let outcome = coordinator.execute_intent(&mut state_machine, &pair, Side::Buy, 10_000_000, &chain).await;

    assert_eq!(outcome, rex_execution::CoordinatorOutcome::Success);
    let state = state_machine.state_of(&pair.identity());
    assert!(matches!(state.status, PairStatus::Open));
    assert_eq!(state.size_base, Some(100_000_000));
    // 10 USDC (6 dec) in for 0.1 SOL (9 dec) out -> 100.0 USDC per SOL.
    assert_eq!(state.entry_price, Some(100.0));
}
