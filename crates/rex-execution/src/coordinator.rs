//! Orchestrates a single trade intent end-to-end: ladder → quote → build →
//! submit → (reconcile) → state transition. This is the only place that
//! strings together AggregatorClient, TxExecutor, Reconciler, and
//! PairStateMachine for a single BUY or SELL.

use std::sync::Arc;

use rex_aggregator::AggregatorClient;
use rex_chain::ChainClient;
use rex_schemas::{FailureKind, InflightHandle, InflightIntent, Pair, Side, TxOutcome, TxResult};

use crate::ladder::AttemptLadder;
use crate::reconciler::{ReconcileVerdict, Reconciler};
use crate::state_machine::{PairStateMachine, TransitionEffect};
use crate::tx_executor::TxExecutor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorOutcome {
    Success,
    Failure(FailureKind),
    Unknown,
}

pub struct ExecutionCoordinator<C: ChainClient + ?Sized> {
    aggregator: Arc<dyn AggregatorClient>,
    executor: Arc<TxExecutor<C>>,
    reconciler: Arc<Reconciler<C>>,
    ladder: AttemptLadder,
    max_price_impact_bps: u32,
    user_address: String,
}

impl<C: ChainClient + ?Sized> ExecutionCoordinator<C> {
    pub fn new(
        aggregator: Arc<dyn AggregatorClient>,
        executor: Arc<TxExecutor<C>>,
        reconciler: Arc<Reconciler<C>>,
        ladder: AttemptLadder,
        max_price_impact_bps: u32,
        user_address: String,
    ) -> Self {
        Self { aggregator, executor, reconciler, ladder, max_price_impact_bps, user_address }
    }

    /// Runs one trade intent through the full ladder. `state_machine` is
    /// mutated in place: inflight markers are set before each submission and
    /// the resolved transition is applied before returning.
    pub async fn execute_intent(
        &self,
        state_machine: &mut PairStateMachine,
        pair: &Pair,
        side: Side,
        amount_in_smallest_unit: u64,
        chain: &Arc<C>,
    ) -> CoordinatorOutcome {
        let (input_mint, output_mint) = match side {
            Side::Buy => (pair.quote_mint.as_str(), pair.base_mint.as_str()),
            Side::Sell => (pair.base_mint.as_str(), pair.quote_mint.as_str()),
        };

        for attempt in 1..=self.ladder.max_attempts() {
            let rung = self.ladder.rung(attempt);

            let quote = self.aggregator.quote(input_mint, output_mint, amount_in_smallest_unit, rung.slippage_bps).await;
            let quote = match quote {
                Some(q) => q,
                None => {
                    tracing::debug!(attempt, pair = %pair.identity(), "quote unavailable, consuming attempt");
                    continue;
                }
            };

            if quote.price_impact_bps > self.max_price_impact_bps {
                tracing::warn!(
                    pair = %pair.identity(),
                    price_impact_bps = quote.price_impact_bps,
                    "price impact exceeds cap, definite failure"
                );
                return CoordinatorOutcome::Failure(FailureKind::PriceImpact);
            }

            let tx_bytes = self.aggregator.build_swap(&quote, &self.user_address, rung.priority_fee).await;
            let tx_bytes = match tx_bytes {
                Some(b) => b,
                None => {
                    tracing::debug!(attempt, pair = %pair.identity(), "swap build failed, consuming attempt");
                    continue;
                }
            };

            state_machine.mark_inflight(&pair.identity(), side, InflightHandle::Pending);

            let pre_balance_token = chain.get_token_balance(pair.base_mint.as_str()).await.unwrap_or(0);
            let pre_balance_quote = chain.get_token_balance(pair.quote_mint.as_str()).await.unwrap_or(0);
            let expected_base_delta: i64 = match side {
                Side::Buy => quote.out_amount as i64,
                Side::Sell => -(quote.in_amount as i64),
            };
            let mut intent = InflightIntent::new(pair.identity(), side, expected_base_delta, pre_balance_token, pre_balance_quote, chrono::Utc::now());

            let result: TxResult = self.executor.execute(&tx_bytes).await;

            if let Some(sig) = result.signature.clone() {
                intent.signature = Some(sig.clone());
                state_machine.mark_inflight(&pair.identity(), side, InflightHandle::Signature(sig));
            }

            match result.outcome {
                TxOutcome::Success => {
                    let (entry_price, size_base) = self.derive_position_fields(side, &result, pair, &quote);
                    state_machine.apply_outcome(&pair.identity(), side, &intent.intent_id.to_string(), TxOutcome::Success, entry_price, size_base, chrono::Utc::now());
                    return CoordinatorOutcome::Success;
                }
                TxOutcome::Failure => {
                    state_machine.clear_inflight(&pair.identity(), side);
                    let kind = result.failure_kind.unwrap_or(FailureKind::Unknown);
                    state_machine.apply_outcome(&pair.identity(), side, &intent.intent_id.to_string(), TxOutcome::Failure, None, None, chrono::Utc::now());
                    tracing::warn!(attempt, ?kind, "definite failure, consuming attempt");
                    continue;
                }
                TxOutcome::Unknown => {
                    let verdict = self.reconciler.reconcile(&intent, pair.base_mint.as_str(), pair.quote_mint.as_str()).await;
                    match verdict {
                        ReconcileVerdict::Success { observed_base_delta } => {
                            let (entry_price, size_base) = self.derive_reconciled_fields(side, pair, &quote, observed_base_delta);
                            state_machine.apply_outcome(&pair.identity(), side, &intent.intent_id.to_string(), TxOutcome::Success, entry_price, size_base, chrono::Utc::now());
                            return CoordinatorOutcome::Success;
                        }
                        ReconcileVerdict::Failure => {
                            state_machine.clear_inflight(&pair.identity(), side);
                            state_machine.apply_outcome(&pair.identity(), side, &intent.intent_id.to_string(), TxOutcome::Failure, None, None, chrono::Utc::now());
                            tracing::info!(attempt, "reconciled to failure, consuming attempt");
                            continue;
                        }
                        ReconcileVerdict::StillUnresolved => {
                            // inflight handle stays set; ladder does not advance.
                            state_machine.preserve_pending_intent(&pair.identity(), side, intent.clone());
                            return CoordinatorOutcome::Unknown;
                        }
                    }
                }
            }
        }

        state_machine.clear_inflight(&pair.identity(), side);
        tracing::warn!(pair = %pair.identity(), ?side, "attempt ladder exhausted");
        CoordinatorOutcome::Failure(FailureKind::Unknown)
    }

    fn derive_position_fields(&self, side: Side, result: &TxResult, pair: &Pair, quote: &rex_aggregator::Quote) -> (Option<f64>, Option<i64>) {
        match side {
            Side::Buy => (price_from_quote(pair, quote), Some(quote.out_amount as i64)),
            Side::Sell => {
                let _ = result;
                (None, None)
            }
        }
    }

    /// On a reconciled (rather than confirmed) fill, `size_base` is taken
    /// from the observed balance delta, never from the originally requested
    /// amount — a late fill can land for less (or more, with positive
    /// slippage) than quoted.
    fn derive_reconciled_fields(&self, side: Side, pair: &Pair, quote: &rex_aggregator::Quote, observed_base_delta: i64) -> (Option<f64>, Option<i64>) {
        match side {
            Side::Buy => (price_from_quote(pair, quote), Some(observed_base_delta)),
            Side::Sell => (None, None),
        }
    }
}

/// Converts the quote's smallest-unit amounts into a human-scale price,
/// adjusting for each side's decimals: `(in/10^quote_dec) / (out/10^base_dec)`.
fn price_from_quote(pair: &Pair, quote: &rex_aggregator::Quote) -> Option<f64> {
    if quote.out_amount == 0 {
        return None;
    }
    let in_scaled = quote.in_amount as f64 / 10f64.powi(pair.quote_decimals as i32);
    let out_scaled = quote.out_amount as f64 / 10f64.powi(pair.base_decimals as i32);
    if out_scaled == 0.0 {
        return None;
    }
    Some(in_scaled / out_scaled)
}
