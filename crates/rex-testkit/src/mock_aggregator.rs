//! Deterministic, fully scriptable `AggregatorClient`. Each call pops the
//! next queued response; once the queue drains, `default_quote`/
//! `default_tx_bytes` apply, so a test that only cares about the happy path
//! can configure a single default and never think about queues.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use rex_aggregator::{AggregatorClient, PriorityFeeLamports, Quote};

pub struct MockAggregatorClient {
    quote_queue: Mutex<VecDeque<Option<Quote>>>,
    default_quote: Option<Quote>,
    build_queue: Mutex<VecDeque<Option<Vec<u8>>>>,
    default_tx_bytes: Option<Vec<u8>>,
}

impl MockAggregatorClient {
    pub fn new() -> Self {
        Self {
            quote_queue: Mutex::new(VecDeque::new()),
            default_quote: None,
            build_queue: Mutex::new(VecDeque::new()),
            default_tx_bytes: None,
        }
    }

    pub fn with_default_quote(mut self, quote: Quote) -> Self {
        self.default_quote = Some(quote);
        self
    }

    pub fn with_default_tx_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.default_tx_bytes = Some(bytes);
        self
    }

    pub fn push_quote(&self, quote: Option<Quote>) {
        self.quote_queue.lock().unwrap().push_back(quote);
    }

    pub fn push_build(&self, bytes: Option<Vec<u8>>) {
        self.build_queue.lock().unwrap().push_back(bytes);
    }
}

impl Default for MockAggregatorClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AggregatorClient for MockAggregatorClient {
    async fn quote(&self, _input_mint: &str, _output_mint: &str, _amount_in_smallest_unit: u64, _slippage_bps: u32) -> Option<Quote> {
        if let Some(q) = self.quote_queue.lock().unwrap().pop_front() {
            return q;
        }
        self.default_quote.clone()
    }

    async fn build_swap(&self, _quote: &Quote, _user_address: &str, _priority_fee: PriorityFeeLamports) -> Option<Vec<u8>> {
        if let Some(b) = self.build_queue.lock().unwrap().pop_front() {
            return b;
        }
        self.default_tx_bytes.clone()
    }
}

/// A plain route quote with no price impact, for scenarios that don't care
/// about the impact-cap path.
pub fn sample_quote(in_amount: u64, out_amount: u64, price_impact_bps: u32) -> Quote {
    Quote {
        in_amount,
        out_amount,
        route_plan: serde_json::json!([]),
        price_impact_bps,
    }
}

/// A minimal well-formed unsigned `VersionedTransaction`, serialized the way
/// `TxExecutor::sign` expects to deserialize it: one empty legacy message, one
/// placeholder signature slot ready to be overwritten.
pub fn dummy_unsigned_tx_bytes() -> Vec<u8> {
    use solana_sdk::hash::Hash;
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::signature::Signature;
    use solana_sdk::transaction::VersionedTransaction;

    let message = Message::new_with_blockhash(&[], None, &Hash::default());
    let tx = VersionedTransaction {
        signatures: vec![Signature::default()],
        message: VersionedMessage::Legacy(message),
    };
    bincode::serialize(&tx).expect("dummy transaction always serializes")
}
