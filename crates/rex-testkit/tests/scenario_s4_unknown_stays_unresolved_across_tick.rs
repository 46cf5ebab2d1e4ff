//! When the chain itself is unreachable, reconciliation can neither confirm
//! nor refute a fill. The inflight handle and its pending intent survive the
//! tick untouched so a later tick can retry, and the position stays exactly
//! where it was — never guessed at.

use std::sync::Arc;

use rex_execution::{LadderPolicy, PairStateMachine, ReconcileVerdict, Reconciler, ReconcilerConfig};
use rex_schemas::{InflightHandle, InflightIntent, Side};
use rex_testkit::MockChainClient;

mod common;

#[tokio::test]
async fn scenario_rpc_outage_leaves_position_untouched_until_retry_succeeds() {
    let pair = common::sol_usdc();
    let chain = Arc::new(MockChainClient::new("local"));
    chain.set_balance_queries_fail(true);

    let intent = InflightIntent::new(pair.identity(), Side::Buy, 100_000_000, 0, 500_000_000, chrono::Utc::now());
    let mut state_machine = PairStateMachine::new(LadderPolicy { failure_threshold: 4, failure_cooldown: chrono::Duration::seconds(300) });
    state_machine.mark_inflight(&pair.identity(), Side::Buy, InflightHandle::Signature("SIG1".to_string()));
    state_machine.preserve_pending_intent(&pair.identity(), Side::Buy, intent.clone());

    let reconciler = Reconciler::new(chain.clone(), ReconcilerConfig { settle_delay: std::time::Duration::from_millis(0), tolerance_pct: 0.05 });

    let verdict = reconciler.reconcile(&intent, &pair.base_mint, &pair.quote_mint).await;
    assert_eq!(verdict, ReconcileVerdict::StillUnresolved);

    let state = state_machine.state_of(&pair.identity());
    assert!(state.is_flat());
    assert_eq!(state.inflight_buy_id, Some(InflightHandle::Signature("SIG1".to_string())));
    assert!(state.pending_buy_intent.is_some());

    // Next tick: the RPC is healthy again and the fill is visible on-chain.
    chain.set_balance_queries_fail(false);
    chain.set_token_balance(&pair.base_mint, 100_000_000);
    chain.set_token_balance(&pair.quote_mint, 490_000_000);

    let retry_intent = state_machine.pending_intent(&pair.identity(), Side::Buy).expect("pending intent survived the failed tick");
    let verdict = reconciler.reconcile(&retry_intent, &pair.base_mint, &pair.quote_mint).await;
    assert_eq!(verdict, ReconcileVerdict::Success { observed_base_delta: 100_000_000 });
}
