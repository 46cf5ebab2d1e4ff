//! Deterministic in-memory `ChainClient`, grounded on the paper-broker idiom
//! used elsewhere in this codebase: no randomness, no wall-clock reads,
//! idempotent submission, state inspectable and settable by the test itself.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use rex_chain::{ChainClient, ConfirmationStatus, SignatureStatus, SubmitError};

pub struct MockChainClient {
    local_address: String,
    native_balance: Mutex<i64>,
    token_balances: Mutex<HashMap<String, i64>>,
    next_signature: Mutex<u64>,
    statuses: Mutex<HashMap<String, Option<SignatureStatus>>>,
    submit_error: Mutex<Option<String>>,
    balance_queries_fail: Mutex<bool>,
}

impl MockChainClient {
    pub fn new(local_address: impl Into<String>) -> Self {
        Self {
            local_address: local_address.into(),
            native_balance: Mutex::new(0),
            token_balances: Mutex::new(HashMap::new()),
            next_signature: Mutex::new(0),
            statuses: Mutex::new(HashMap::new()),
            submit_error: Mutex::new(None),
            balance_queries_fail: Mutex::new(false),
        }
    }

    /// Simulates an RPC outage on balance queries — used to drive the
    /// reconciler into `StillUnresolved` without the deltas involved.
    pub fn set_balance_queries_fail(&self, fail: bool) {
        *self.balance_queries_fail.lock().unwrap() = fail;
    }

    pub fn set_native_balance(&self, lamports: i64) {
        *self.native_balance.lock().unwrap() = lamports;
    }

    pub fn set_token_balance(&self, mint: &str, amount: i64) {
        self.token_balances.lock().unwrap().insert(mint.to_string(), amount);
    }

    pub fn token_balance(&self, mint: &str) -> i64 {
        *self.token_balances.lock().unwrap().get(mint).unwrap_or(&0)
    }

    /// Arranges for the next `submit_signed` call to fail with `reason`,
    /// consuming the arrangement (subsequent submits succeed normally).
    pub fn fail_next_submit(&self, reason: impl Into<String>) {
        *self.submit_error.lock().unwrap() = Some(reason.into());
    }

    /// Marks `signature` as landed with no error, at the given confirmation
    /// depth. Call this with the signature returned by `submit_signed` (the
    /// counter is deterministic: `"MOCKSIG1"`, `"MOCKSIG2"`, ...).
    pub fn queue_confirmed(&self, signature: impl Into<String>) {
        self.statuses.lock().unwrap().insert(
            signature.into(),
            Some(SignatureStatus { confirmation_status: ConfirmationStatus::Finalized, err: None, slot: 1 }),
        );
    }

    pub fn queue_failed(&self, signature: impl Into<String>, err: impl Into<String>) {
        self.statuses.lock().unwrap().insert(
            signature.into(),
            Some(SignatureStatus { confirmation_status: ConfirmationStatus::Processed, err: Some(err.into()), slot: 1 }),
        );
    }

    /// Leaves `signature` permanently unresolved, i.e. `get_signature_status`
    /// keeps returning `None` until a caller's timeout elapses — simulates
    /// the path into TxOutcome::Unknown.
    pub fn leave_unresolved(&self, signature: impl Into<String>) {
        self.statuses.lock().unwrap().insert(signature.into(), None);
    }

    /// The signature the next `submit_signed` call will return, without
    /// consuming it. Lets a test pre-register `queue_confirmed` before the
    /// coordinator ever calls submit.
    pub fn peek_next_signature(&self) -> String {
        format!("MOCKSIG{}", *self.next_signature.lock().unwrap() + 1)
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn submit_signed(&self, _tx_bytes: &[u8]) -> Result<String, SubmitError> {
        if let Some(reason) = self.submit_error.lock().unwrap().take() {
            return Err(SubmitError::SendFailed(reason));
        }
        let mut n = self.next_signature.lock().unwrap();
        *n += 1;
        Ok(format!("MOCKSIG{n}"))
    }

    async fn get_signature_status(&self, signature: &str) -> anyhow::Result<Option<SignatureStatus>> {
        Ok(self.statuses.lock().unwrap().get(signature).cloned().flatten())
    }

    async fn get_native_balance(&self) -> anyhow::Result<i64> {
        if *self.balance_queries_fail.lock().unwrap() {
            anyhow::bail!("mock rpc outage: get_native_balance");
        }
        Ok(*self.native_balance.lock().unwrap())
    }

    async fn get_token_balance(&self, mint: &str) -> anyhow::Result<i64> {
        if *self.balance_queries_fail.lock().unwrap() {
            anyhow::bail!("mock rpc outage: get_token_balance");
        }
        Ok(self.token_balance(mint))
    }

    fn local_address(&self) -> String {
        self.local_address.clone()
    }
}
