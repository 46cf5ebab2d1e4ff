//! Signs, submits, and confirms a single transaction attempt, yielding the
//! 3-state [`TxOutcome`]. Never decides SUCCESS without a positive
//! confirmation from chain status, and never retries internally — retry
//! policy belongs to the ladder and the coordinator.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use solana_sdk::signer::Signer;

use rex_chain::{ChainClient, ConfirmationStatus};
use rex_schemas::{classify_failure, FailureKind, TxOutcome, TxResult};

pub struct TxExecutorConfig {
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub dry_run: bool,
}

pub struct TxExecutor<C: ChainClient + ?Sized> {
    chain: Arc<C>,
    signer: Arc<dyn Signer + Send + Sync>,
    config: TxExecutorConfig,
}

impl<C: ChainClient + ?Sized> TxExecutor<C> {
    pub fn new(chain: Arc<C>, signer: Arc<dyn Signer + Send + Sync>, config: TxExecutorConfig) -> Self {
        Self { chain, signer, config }
    }

    pub async fn execute(&self, tx_bytes: &[u8]) -> TxResult {
        let submitted_at = Utc::now();

        if self.config.dry_run {
            let sig = dry_run_signature(tx_bytes);
            tracing::info!(signature = %sig, "dry_run: synthesizing SUCCESS without submitting");
            return TxResult::success(Some(sig), submitted_at, Utc::now());
        }

        let signed_bytes = match self.sign(tx_bytes) {
            Ok(bytes) => bytes,
            Err(kind) => {
                tracing::warn!(?kind, "transaction signing/deserialization failed");
                return TxResult::failure(kind, None, submitted_at, Utc::now());
            }
        };

        let signature = match self.chain.submit_signed(&signed_bytes).await {
            Ok(sig) => sig,
            Err(e) => {
                let kind = e.classify();
                tracing::warn!(?kind, error = %e, "submission failed");
                return TxResult::failure(kind, None, submitted_at, Utc::now());
            }
        };

        self.await_confirmation(signature, submitted_at).await
    }

    fn sign(&self, tx_bytes: &[u8]) -> Result<Vec<u8>, FailureKind> {
        let mut tx: solana_sdk::transaction::VersionedTransaction =
            bincode::deserialize(tx_bytes).map_err(|_| FailureKind::DeserializeFailed)?;

        let message_bytes = tx.message.serialize();
        let signature = self.signer.try_sign_message(&message_bytes).map_err(|_| FailureKind::SignFailed)?;
        if tx.signatures.is_empty() {
            return Err(FailureKind::SignFailed);
        }
        tx.signatures[0] = signature;

        bincode::serialize(&tx).map_err(|_| FailureKind::DeserializeFailed)
    }

    async fn await_confirmation(&self, signature: String, submitted_at: chrono::DateTime<Utc>) -> TxResult {
        let deadline = tokio::time::Instant::now() + self.config.confirm_timeout;

        loop {
            match self.chain.get_signature_status(&signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.err {
                        let kind = classify_failure(&err);
                        tracing::warn!(%signature, ?kind, "transaction landed with an error");
                        return TxResult::failure(kind, Some(signature), submitted_at, Utc::now());
                    }
                    if matches!(status.confirmation_status, ConfirmationStatus::Confirmed | ConfirmationStatus::Finalized) {
                        tracing::info!(%signature, "transaction confirmed");
                        return TxResult::success(Some(signature), submitted_at, Utc::now());
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(%signature, error = %e, "status poll error, will retry until timeout");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(%signature, "confirmation timed out, outcome UNKNOWN");
                return TxResult::unknown(Some(signature), submitted_at, Utc::now());
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

fn dry_run_signature(tx_bytes: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    tx_bytes.hash(&mut hasher);
    format!("DRYRUN{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_signature_is_deterministic() {
        let bytes = vec![1, 2, 3];
        assert_eq!(dry_run_signature(&bytes), dry_run_signature(&bytes));
    }

    #[test]
    fn dry_run_signature_varies_with_input() {
        assert_ne!(dry_run_signature(&[1, 2, 3]), dry_run_signature(&[4, 5, 6]));
    }
}
