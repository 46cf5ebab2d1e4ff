use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::intent::InflightIntent;

/// A submitted-but-unresolved transaction handle.
///
/// A dedicated `Pending` variant (rather than a sentinel string placed in the
/// signature field before a real signature is known) keeps "no signature yet"
/// and "this is a real signature" from ever being confused by downstream
/// resolve-unknown logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InflightHandle {
    Pending,
    Signature(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairStatus {
    Flat,
    Open,
    ExitOnly,
}

/// Per-pair position state, exclusively owned and mutated by the pair state
/// machine. Never constructed with an invalid combination of fields —
/// invariants are enforced by the state machine's transition functions, not
/// by callers poking at this struct directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairState {
    pub status: PairStatus,
    pub entry_price: Option<f64>,
    pub size_base: Option<i64>,
    pub opened_at: Option<DateTime<Utc>>,

    pub inflight_buy_id: Option<InflightHandle>,
    pub inflight_sell_id: Option<InflightHandle>,

    /// Preserved across ticks alongside the handle above, so a resolve-unknown
    /// pass on a later tick has what it needs to re-run reconciliation
    /// without the originating `ExecutionCoordinator` call still being on the
    /// stack. Cleared the moment the handle it accompanies resolves.
    pub pending_buy_intent: Option<InflightIntent>,
    pub pending_sell_intent: Option<InflightIntent>,

    pub buy_cooldown_until: Option<DateTime<Utc>>,
    pub sell_cooldown_until: Option<DateTime<Utc>>,

    pub buy_consecutive_failures: u32,
    pub sell_consecutive_failures: u32,

    /// Intent IDs already applied to this pair's state — idempotent replay
    /// guard, mirroring the applied-event-id discipline used for order
    /// lifecycle events elsewhere in this codebase.
    applied_intents: std::collections::HashSet<String>,
}

impl Default for PairState {
    fn default() -> Self {
        Self {
            status: PairStatus::Flat,
            entry_price: None,
            size_base: None,
            opened_at: None,
            inflight_buy_id: None,
            inflight_sell_id: None,
            pending_buy_intent: None,
            pending_sell_intent: None,
            buy_cooldown_until: None,
            sell_cooldown_until: None,
            buy_consecutive_failures: 0,
            sell_consecutive_failures: 0,
            applied_intents: std::collections::HashSet::new(),
        }
    }
}

impl PairState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        matches!(self.status, PairStatus::Flat)
    }

    /// Returns `true` if `intent_id` has already been applied to this pair's
    /// state, i.e. a resolved outcome for it must be treated as a no-op.
    pub fn already_applied(&self, intent_id: &str) -> bool {
        self.applied_intents.contains(intent_id)
    }

    pub fn mark_applied(&mut self, intent_id: impl Into<String>) {
        self.applied_intents.insert(intent_id.into());
    }

    pub fn can_enter(&self, exit_only_mode: bool, now: DateTime<Utc>) -> Result<(), String> {
        if exit_only_mode {
            return Err("exit_only_mode".to_string());
        }
        if !matches!(self.status, PairStatus::Flat) {
            return Err(format!("position_already_open:{:?}", self.status));
        }
        if self.inflight_buy_id.is_some() {
            return Err("trade_inflight".to_string());
        }
        if let Some(until) = self.buy_cooldown_until {
            if until > now {
                return Err(format!("buy_cooldown_until:{until}"));
            }
        }
        Ok(())
    }

    pub fn can_exit(&self, now: DateTime<Utc>) -> Result<(), String> {
        if matches!(self.status, PairStatus::Flat) {
            return Err("position_already_flat".to_string());
        }
        if self.inflight_sell_id.is_some() {
            return Err("trade_inflight".to_string());
        }
        if let Some(until) = self.sell_cooldown_until {
            if until > now {
                return Err(format!("sell_cooldown_until:{until}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_flat_with_no_inflight() {
        let s = PairState::new();
        assert!(s.is_flat());
        assert!(s.inflight_buy_id.is_none());
        assert!(s.inflight_sell_id.is_none());
    }

    #[test]
    fn can_enter_false_when_inflight_buy_present() {
        let mut s = PairState::new();
        s.inflight_buy_id = Some(InflightHandle::Pending);
        assert_eq!(
            s.can_enter(false, Utc::now()),
            Err("trade_inflight".to_string())
        );
    }

    #[test]
    fn can_exit_false_when_flat() {
        let s = PairState::new();
        assert!(s.can_exit(Utc::now()).is_err());
    }

    #[test]
    fn applied_intents_are_idempotent() {
        let mut s = PairState::new();
        assert!(!s.already_applied("intent-1"));
        s.mark_applied("intent-1");
        assert!(s.already_applied("intent-1"));
    }
}
