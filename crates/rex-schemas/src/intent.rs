use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pair::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentOutcome {
    Confirmed,
    ReconciledSuccess,
    ReconciledFailure,
    Timeout,
    NoSignature,
}

/// Created on submit, resolved on reconcile. Exclusively owned by the
/// reconciler; the pair state machine holds only an [`crate::pair_state::InflightHandle`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflightIntent {
    pub intent_id: Uuid,
    pub signature: Option<String>,
    pub pair_identity: String,
    pub side: Side,
    pub expected_base_delta: i64,
    pub pre_balance_token: i64,
    pub pre_balance_quote: i64,
    pub post_balance_token: Option<i64>,
    pub post_balance_quote: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub outcome: Option<IntentOutcome>,
}

impl InflightIntent {
    pub fn new(
        pair_identity: impl Into<String>,
        side: Side,
        expected_base_delta: i64,
        pre_balance_token: i64,
        pre_balance_quote: i64,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            intent_id: Uuid::new_v4(),
            signature: None,
            pair_identity: pair_identity.into(),
            side,
            expected_base_delta,
            pre_balance_token,
            pre_balance_quote,
            post_balance_token: None,
            post_balance_quote: None,
            submitted_at,
            outcome: None,
        }
    }
}
