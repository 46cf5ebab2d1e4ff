use async_trait::async_trait;

use rex_schemas::FailureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
}

#[derive(Debug, Clone)]
pub struct SignatureStatus {
    pub confirmation_status: ConfirmationStatus,
    pub err: Option<String>,
    pub slot: u64,
}

#[derive(Debug, Clone)]
pub enum SubmitError {
    SendFailed(String),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::SendFailed(s) => write!(f, "send failed: {s}"),
        }
    }
}

impl std::error::Error for SubmitError {}

impl SubmitError {
    pub fn classify(&self) -> FailureKind {
        match self {
            SubmitError::SendFailed(msg) => rex_schemas::classify_failure(msg),
        }
    }
}

/// Stateless (from the core's perspective) RPC façade. Implementations are
/// free to hold connection pools, caches, etc. internally, but must never
/// leak chain state back into the core beyond what this contract returns.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn submit_signed(&self, tx_bytes: &[u8]) -> Result<String, SubmitError>;

    async fn get_signature_status(&self, signature: &str) -> anyhow::Result<Option<SignatureStatus>>;

    /// Native (SOL) balance in lamports.
    async fn get_native_balance(&self) -> anyhow::Result<i64>;

    /// Token balance in the token's smallest unit.
    async fn get_token_balance(&self, mint: &str) -> anyhow::Result<i64>;

    fn local_address(&self) -> String;
}
