use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a transaction definitively failed. Derived by a pure classifier from
/// chain/aggregator error strings — never compared against by raw string
/// anywhere downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    BlockhashExpired,
    SimulationFailed,
    InsufficientFunds,
    SlippageExceeded,
    ProgramError,
    NetworkError,
    Timeout,
    PriceImpact,
    DeserializeFailed,
    SignFailed,
    SendFailed,
    Unknown,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The only three outcomes a submitted transaction can have. Never collapsed
/// to a boolean anywhere in the core — that would reopen the double-spend
/// hazard this design exists to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Success,
    Failure,
    Unknown,
}

/// The sanctioned product of TxExecutor and, where invoked, Reconciler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResult {
    pub outcome: TxOutcome,
    pub signature: Option<String>,
    pub failure_kind: Option<FailureKind>,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    pub balance_delta: Option<i64>,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}

impl TxResult {
    pub fn success(signature: Option<String>, submitted_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> Self {
        Self {
            outcome: TxOutcome::Success,
            signature,
            failure_kind: None,
            balance_before: None,
            balance_after: None,
            balance_delta: None,
            submitted_at,
            resolved_at,
        }
    }

    pub fn failure(
        kind: FailureKind,
        signature: Option<String>,
        submitted_at: DateTime<Utc>,
        resolved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            outcome: TxOutcome::Failure,
            signature,
            failure_kind: Some(kind),
            balance_before: None,
            balance_after: None,
            balance_delta: None,
            submitted_at,
            resolved_at,
        }
    }

    pub fn unknown(signature: Option<String>, submitted_at: DateTime<Utc>, resolved_at: DateTime<Utc>) -> Self {
        Self {
            outcome: TxOutcome::Unknown,
            signature,
            failure_kind: None,
            balance_before: None,
            balance_after: None,
            balance_delta: None,
            submitted_at,
            resolved_at,
        }
    }
}

/// Maps a raw chain/RPC error string to a [`FailureKind`]. Pure, no I/O.
pub fn classify_failure(err: &str) -> FailureKind {
    let lower = err.to_ascii_lowercase();
    if lower.contains("blockhash") {
        FailureKind::BlockhashExpired
    } else if lower.contains("simulation") {
        FailureKind::SimulationFailed
    } else if lower.contains("insufficient") {
        FailureKind::InsufficientFunds
    } else if lower.contains("slippage") {
        FailureKind::SlippageExceeded
    } else if lower.contains("program error") || lower.contains("custom program") {
        FailureKind::ProgramError
    } else if lower.contains("timeout") || lower.contains("timed out") {
        FailureKind::Timeout
    } else if lower.contains("connection") || lower.contains("network") || lower.contains("dns") {
        FailureKind::NetworkError
    } else {
        FailureKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_error_strings() {
        assert_eq!(
            classify_failure("Blockhash not found"),
            FailureKind::BlockhashExpired
        );
        assert_eq!(
            classify_failure("Transaction simulation failed: Error processing Instruction"),
            FailureKind::SimulationFailed
        );
        assert_eq!(
            classify_failure("insufficient funds for rent"),
            FailureKind::InsufficientFunds
        );
        assert_eq!(
            classify_failure("Slippage tolerance exceeded"),
            FailureKind::SlippageExceeded
        );
    }

    #[test]
    fn unrecognized_error_classifies_unknown() {
        assert_eq!(classify_failure("something bizarre happened"), FailureKind::Unknown);
    }
}
