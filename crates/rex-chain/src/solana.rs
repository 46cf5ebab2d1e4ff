use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_client::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::signer::Signer;
use std::str::FromStr;

use crate::client::{ChainClient, ConfirmationStatus, SignatureStatus, SubmitError};

/// Live ChainClient backed by a Solana JSON-RPC endpoint. `tx_bytes` is
/// assumed to already be a fully-built, signed `VersionedTransaction` —
/// this adapter owns none of the signing; it only submits and polls.
///
/// `RpcClient` is blocking; every call is dispatched through
/// `spawn_blocking` so the cooperative tick loop never stalls on it.
pub struct SolanaChainClient {
    rpc: Arc<RpcClient>,
    signer: Arc<dyn Signer + Send + Sync>,
}

impl SolanaChainClient {
    pub fn new(rpc_url: String, signer: Arc<dyn Signer + Send + Sync>) -> Self {
        let rpc = Arc::new(RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()));
        Self { rpc, signer }
    }
}

#[async_trait]
impl ChainClient for SolanaChainClient {
    async fn submit_signed(&self, tx_bytes: &[u8]) -> Result<String, SubmitError> {
        let tx: solana_sdk::transaction::VersionedTransaction = bincode::deserialize(tx_bytes)
            .map_err(|e| SubmitError::SendFailed(format!("deserialize: {e}")))?;
        let rpc = self.rpc.clone();
        tokio::task::spawn_blocking(move || rpc.send_transaction(&tx))
            .await
            .map_err(|e| SubmitError::SendFailed(format!("join error: {e}")))?
            .map(|sig: Signature| sig.to_string())
            .map_err(|e| SubmitError::SendFailed(e.to_string()))
    }

    async fn get_signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>> {
        let sig = Signature::from_str(signature).context("parse signature")?;
        let rpc = self.rpc.clone();
        let status = tokio::task::spawn_blocking(move || rpc.get_signature_status(&sig))
            .await
            .context("join error polling signature status")?
            .context("rpc error polling signature status")?;

        Ok(status.map(|res| SignatureStatus {
            confirmation_status: ConfirmationStatus::Confirmed,
            err: res.err().map(|e| e.to_string()),
            slot: 0,
        }))
    }

    async fn get_native_balance(&self) -> Result<i64> {
        let rpc = self.rpc.clone();
        let pubkey = self.signer.pubkey();
        let lamports = tokio::task::spawn_blocking(move || rpc.get_balance(&pubkey))
            .await
            .context("join error fetching native balance")?
            .context("rpc error fetching native balance")?;
        Ok(lamports as i64)
    }

    async fn get_token_balance(&self, mint: &str) -> Result<i64> {
        let owner = self.signer.pubkey();
        let mint_pubkey = Pubkey::from_str(mint).context("parse mint pubkey")?;
        let rpc = self.rpc.clone();
        let amount = tokio::task::spawn_blocking(move || {
            rpc.get_token_accounts_by_owner(
                &owner,
                solana_client::rpc_request::TokenAccountsFilter::Mint(mint_pubkey),
            )
        })
        .await
        .context("join error fetching token accounts")?
        .context("rpc error fetching token accounts")?;

        // Sum across all token accounts for this mint; most wallets hold one.
        let mut total: i64 = 0;
        for account in amount {
            if let solana_account_decoder::UiAccountData::Json(parsed) = account.account.data {
                if let Some(amount_str) = parsed
                    .parsed
                    .get("info")
                    .and_then(|i| i.get("tokenAmount"))
                    .and_then(|t| t.get("amount"))
                    .and_then(|a| a.as_str())
                {
                    total += amount_str.parse::<i64>().unwrap_or(0);
                }
            }
        }
        Ok(total)
    }

    fn local_address(&self) -> String {
        self.signer.pubkey().to_string()
    }
}
