//! Resolves UNKNOWN outcomes by comparing pre/post on-chain balance deltas
//! against the expected fill. Chain state is authoritative: if the deltas
//! line up, the trade is SUCCESS even though local confirmation never
//! arrived. This is the central safety property of the system — it is what
//! lets the coordinator retry after an UNKNOWN without risking a double
//! spend.

use std::sync::Arc;
use std::time::Duration;

use rex_chain::ChainClient;
use rex_schemas::{InflightIntent, IntentOutcome, Side};

pub struct ReconcilerConfig {
    pub settle_delay: Duration,
    pub tolerance_pct: f64,
}

pub struct Reconciler<C: ChainClient + ?Sized> {
    chain: Arc<C>,
    config: ReconcilerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileVerdict {
    Success { observed_base_delta: i64 },
    Failure,
    StillUnresolved,
}

impl<C: ChainClient + ?Sized> Reconciler<C> {
    pub fn new(chain: Arc<C>, config: ReconcilerConfig) -> Self {
        Self { chain, config }
    }

    /// `base_mint`/`quote_mint` are supplied by the caller (the coordinator
    /// already has the `Pair` in scope); `InflightIntent` itself carries only
    /// the pair identity string, not mint addresses.
    pub async fn reconcile(&self, intent: &InflightIntent, base_mint: &str, quote_mint: &str) -> ReconcileVerdict {
        tokio::time::sleep(self.config.settle_delay).await;

        let post_token = match self.chain.get_token_balance(base_mint).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "reconciler could not fetch post base-token balance");
                return ReconcileVerdict::StillUnresolved;
            }
        };
        let post_quote = match self.chain.get_token_balance(quote_mint).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "reconciler could not fetch post quote-token balance");
                return ReconcileVerdict::StillUnresolved;
            }
        };

        let token_delta = post_token - intent.pre_balance_token;
        let quote_delta = post_quote - intent.pre_balance_quote;

        let expected_abs = intent.expected_base_delta.unsigned_abs() as i64;
        let min_accepted = (expected_abs as f64 * (1.0 - self.config.tolerance_pct)).floor() as i64;

        let matches = match intent.side {
            Side::Buy => token_delta > 0 && token_delta >= min_accepted && quote_delta < 0,
            Side::Sell => token_delta < 0 && token_delta.abs() >= min_accepted && quote_delta > 0,
        };

        if matches {
            tracing::info!(
                pair = %intent.pair_identity,
                token_delta,
                quote_delta,
                "reconciled as success from balance deltas"
            );
            ReconcileVerdict::Success { observed_base_delta: token_delta }
        } else {
            tracing::info!(
                pair = %intent.pair_identity,
                token_delta,
                quote_delta,
                "reconciled as failure: deltas do not match expected fill"
            );
            ReconcileVerdict::Failure
        }
    }

    pub fn outcome_for(verdict: &ReconcileVerdict) -> IntentOutcome {
        match verdict {
            ReconcileVerdict::Success { .. } => IntentOutcome::ReconciledSuccess,
            ReconcileVerdict::Failure => IntentOutcome::ReconciledFailure,
            ReconcileVerdict::StillUnresolved => IntentOutcome::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rex_chain::{ConfirmationStatus, SignatureStatus, SubmitError};
    use std::sync::Mutex;

    struct FakeChain {
        token_balances: Mutex<std::collections::HashMap<String, i64>>,
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn submit_signed(&self, _tx_bytes: &[u8]) -> Result<String, SubmitError> {
            unimplemented!()
        }
        async fn get_signature_status(&self, _signature: &str) -> anyhow::Result<Option<SignatureStatus>> {
            unimplemented!()
        }
        async fn get_native_balance(&self) -> anyhow::Result<i64> {
            unimplemented!()
        }
        async fn get_token_balance(&self, mint: &str) -> anyhow::Result<i64> {
            Ok(*self.token_balances.lock().unwrap().get(mint).unwrap_or(&0))
        }
        fn local_address(&self) -> String {
            "local".to_string()
        }
    }

    fn config() -> ReconcilerConfig {
        ReconcilerConfig { settle_delay: Duration::from_millis(0), tolerance_pct: 0.10 }
    }

    #[tokio::test]
    async fn buy_with_matching_deltas_reconciles_success() {
        let mut balances = std::collections::HashMap::new();
        balances.insert("BASE".to_string(), 100_000_000);
        balances.insert("QUOTE".to_string(), 10_000_000);
        let chain = Arc::new(FakeChain { token_balances: Mutex::new(balances) });
        let reconciler = Reconciler::new(chain, config());

        let mut intent = InflightIntent::new("SOL/USDC", Side::Buy, 100_000_000, 0, 20_000_000, chrono::Utc::now());
        intent.pre_balance_token = 0;
        intent.pre_balance_quote = 20_000_000;

        let verdict = reconciler.reconcile(&intent, "BASE", "QUOTE").await;
        assert_eq!(verdict, ReconcileVerdict::Success { observed_base_delta: 100_000_000 });
    }

    #[tokio::test]
    async fn buy_with_unchanged_balances_reconciles_failure() {
        let mut balances = std::collections::HashMap::new();
        balances.insert("BASE".to_string(), 0);
        balances.insert("QUOTE".to_string(), 20_000_000);
        let chain = Arc::new(FakeChain { token_balances: Mutex::new(balances) });
        let reconciler = Reconciler::new(chain, config());

        let mut intent = InflightIntent::new("SOL/USDC", Side::Buy, 100_000_000, 0, 20_000_000, chrono::Utc::now());
        intent.pre_balance_token = 0;
        intent.pre_balance_quote = 20_000_000;

        let verdict = reconciler.reconcile(&intent, "BASE", "QUOTE").await;
        assert_eq!(verdict, ReconcileVerdict::Failure);
    }
}
