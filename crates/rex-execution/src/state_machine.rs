//! Per-pair position state machine.
//!
//! # Design
//!
//! Explicit state machine, one [`rex_schemas::PairState`] per configured
//! pair. Every lifecycle event is applied via [`PairStateMachine::apply_outcome`],
//! which enforces two invariants mirroring this codebase's order-lifecycle
//! discipline elsewhere:
//!
//! 1. **Outcome-gated transitions.** `status` changes only on a definitive
//!    SUCCESS or FAILURE outcome; UNKNOWN leaves it untouched and instead
//!    preserves the inflight handle.
//! 2. **Idempotent replay.** Resolving the same `intent_id` twice (e.g. a
//!    resolve-unknown pass racing a same-tick submit result) is a no-op.
//!
//! ```text
//!            BUY SUCCESS                    SELL SUCCESS
//!   FLAT ───────────────────► OPEN ───────────────────────► FLAT
//!     ▲                        │ │                            ▲
//!     │ BUY FAILURE            │ │ SELL FAILURE (below thresh) │
//!     └────────────────────────┘ └────────────────────────────┘
//!                                │ SELL FAILURE (≥ threshold)
//!                                ▼
//!                           EXIT_ONLY ──────────────────────► FLAT
//!                                         SELL SUCCESS
//! ```
//! BUY/SELL UNKNOWN preserves the respective inflight handle and leaves
//! `status` unchanged in every state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use rex_schemas::{InflightHandle, InflightIntent, PairState, PairStatus, Side, TxOutcome};

#[derive(Debug, Clone)]
pub struct LadderPolicy {
    pub failure_threshold: u32,
    pub failure_cooldown: chrono::Duration,
}

/// Effect of applying a resolved outcome, surfaced so the coordinator and
/// the audit layer can react (e.g. emit `trade_executed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEffect {
    Opened,
    Closed,
    Unchanged,
    NoOpReplay,
}

pub struct PairStateMachine {
    states: HashMap<String, PairState>,
    policy: LadderPolicy,
    exit_only_mode: bool,
}

impl PairStateMachine {
    pub fn new(policy: LadderPolicy) -> Self {
        Self {
            states: HashMap::new(),
            policy,
            exit_only_mode: false,
        }
    }

    pub fn set_exit_only_mode(&mut self, on: bool) {
        self.exit_only_mode = on;
    }

    pub fn exit_only_mode(&self) -> bool {
        self.exit_only_mode
    }

    pub fn state_of(&self, pair_identity: &str) -> PairState {
        self.states.get(pair_identity).cloned_or_default()
    }

    pub fn all_pairs(&self) -> impl Iterator<Item = (&String, &PairState)> {
        self.states.iter()
    }

    fn entry(&mut self, pair_identity: &str) -> &mut PairState {
        self.states.entry(pair_identity.to_string()).or_default()
    }

    pub fn can_enter(&mut self, pair_identity: &str, now: DateTime<Utc>) -> Result<(), String> {
        let exit_only = self.exit_only_mode;
        self.entry(pair_identity).can_enter(exit_only, now)
    }

    pub fn can_exit(&mut self, pair_identity: &str, now: DateTime<Utc>) -> Result<(), String> {
        self.entry(pair_identity).can_exit(now)
    }

    /// Marks a submission as inflight before the transaction is dispatched.
    /// Must be called before `TxExecutor::execute` so a crash mid-submission
    /// always leaves `Pending` behind for the next tick's resolve-unknown
    /// pass to investigate.
    pub fn mark_inflight(&mut self, pair_identity: &str, side: Side, handle: InflightHandle) {
        let state = self.entry(pair_identity);
        match side {
            Side::Buy => state.inflight_buy_id = Some(handle),
            Side::Sell => state.inflight_sell_id = Some(handle),
        }
    }

    pub fn clear_inflight(&mut self, pair_identity: &str, side: Side) {
        let state = self.entry(pair_identity);
        match side {
            Side::Buy => {
                state.inflight_buy_id = None;
                state.pending_buy_intent = None;
            }
            Side::Sell => {
                state.inflight_sell_id = None;
                state.pending_sell_intent = None;
            }
        }
    }

    /// Preserves the full intent alongside the handle so a later tick's
    /// resolve-unknown pass can re-run reconciliation without the
    /// originating coordinator call still being in scope.
    pub fn preserve_pending_intent(&mut self, pair_identity: &str, side: Side, intent: InflightIntent) {
        let state = self.entry(pair_identity);
        match side {
            Side::Buy => state.pending_buy_intent = Some(intent),
            Side::Sell => state.pending_sell_intent = Some(intent),
        }
    }

    pub fn pending_intent(&self, pair_identity: &str, side: Side) -> Option<InflightIntent> {
        let state = self.states.get(pair_identity)?;
        match side {
            Side::Buy => state.pending_buy_intent.clone(),
            Side::Sell => state.pending_sell_intent.clone(),
        }
    }

    /// Applies a resolved (SUCCESS|FAILURE) outcome for `intent_id`. Calling
    /// this with `TxOutcome::Unknown` is a programmer error — unknown
    /// outcomes must preserve the inflight handle via `mark_inflight`
    /// instead and never reach the state machine as a transition.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_outcome(
        &mut self,
        pair_identity: &str,
        side: Side,
        intent_id: &str,
        outcome: TxOutcome,
        entry_price: Option<f64>,
        size_base: Option<i64>,
        now: DateTime<Utc>,
    ) -> TransitionEffect {
        debug_assert!(
            outcome != TxOutcome::Unknown,
            "UNKNOWN outcomes must never reach apply_outcome"
        );

        let threshold = self.policy.failure_threshold;
        let cooldown = self.policy.failure_cooldown;
        let state = self.entry(pair_identity);

        if state.already_applied(intent_id) {
            return TransitionEffect::NoOpReplay;
        }
        state.mark_applied(intent_id);

        match (side, outcome) {
            (Side::Buy, TxOutcome::Success) => {
                state.inflight_buy_id = None;
                state.buy_consecutive_failures = 0;
                state.status = PairStatus::Open;
                state.entry_price = entry_price;
                state.size_base = size_base;
                state.opened_at = Some(now);
                TransitionEffect::Opened
            }
            (Side::Buy, TxOutcome::Failure) => {
                state.inflight_buy_id = None;
                state.buy_consecutive_failures += 1;
                if state.buy_consecutive_failures >= threshold {
                    state.buy_cooldown_until = Some(now + cooldown);
                }
                TransitionEffect::Unchanged
            }
            (Side::Sell, TxOutcome::Success) => {
                state.inflight_sell_id = None;
                state.sell_consecutive_failures = 0;
                state.status = PairStatus::Flat;
                state.entry_price = None;
                state.size_base = None;
                state.opened_at = None;
                TransitionEffect::Closed
            }
            (Side::Sell, TxOutcome::Failure) => {
                state.inflight_sell_id = None;
                state.sell_consecutive_failures += 1;
                if state.sell_consecutive_failures >= threshold {
                    state.sell_cooldown_until = Some(now + cooldown);
                    if matches!(state.status, PairStatus::Open) {
                        state.status = PairStatus::ExitOnly;
                    }
                }
                TransitionEffect::Unchanged
            }
            (_, TxOutcome::Unknown) => unreachable!("guarded above"),
        }
    }
}

/// `HashMap::get` returns `Option<&T>`; most call sites want a cloned
/// default-initialized `PairState` for a pair that hasn't traded yet.
trait GetOrDefaultClone {
    fn cloned_or_default(self) -> PairState;
}

impl GetOrDefaultClone for Option<&PairState> {
    fn cloned_or_default(self) -> PairState {
        self.cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LadderPolicy {
        LadderPolicy {
            failure_threshold: 4,
            failure_cooldown: chrono::Duration::seconds(300),
        }
    }

    #[test]
    fn buy_success_opens_position() {
        let mut sm = PairStateMachine::new(policy());
        let now = Utc::now();
        let effect = sm.apply_outcome("SOL/USDC", Side::Buy, "i1", TxOutcome::Success, Some(100.0), Some(100_000_000), now);
        assert_eq!(effect, TransitionEffect::Opened);
        let st = sm.state_of("SOL/USDC");
        assert!(matches!(st.status, PairStatus::Open));
        assert_eq!(st.entry_price, Some(100.0));
        assert_eq!(st.size_base, Some(100_000_000));
    }

    #[test]
    fn sell_success_flattens_position() {
        let mut sm = PairStateMachine::new(policy());
        let now = Utc::now();
        sm.apply_outcome("SOL/USDC", Side::Buy, "i1", TxOutcome::Success, Some(100.0), Some(1), now);
        let effect = sm.apply_outcome("SOL/USDC", Side::Sell, "i2", TxOutcome::Success, None, None, now);
        assert_eq!(effect, TransitionEffect::Closed);
        assert!(sm.state_of("SOL/USDC").is_flat());
    }

    #[test]
    fn repeated_consecutive_buy_failures_trigger_cooldown() {
        let mut sm = PairStateMachine::new(policy());
        let now = Utc::now();
        for i in 0..4 {
            sm.apply_outcome("SOL/USDC", Side::Buy, &format!("fail-{i}"), TxOutcome::Failure, None, None, now);
        }
        let st = sm.state_of("SOL/USDC");
        assert_eq!(st.buy_consecutive_failures, 4);
        assert!(st.buy_cooldown_until.unwrap() > now);
        assert!(sm.can_enter("SOL/USDC", now).is_err());
    }

    #[test]
    fn sell_failures_past_threshold_enter_exit_only() {
        let mut sm = PairStateMachine::new(policy());
        let now = Utc::now();
        sm.apply_outcome("SOL/USDC", Side::Buy, "open", TxOutcome::Success, Some(1.0), Some(1), now);
        for i in 0..4 {
            sm.apply_outcome("SOL/USDC", Side::Sell, &format!("sfail-{i}"), TxOutcome::Failure, None, None, now);
        }
        assert!(matches!(sm.state_of("SOL/USDC").status, PairStatus::ExitOnly));
    }

    #[test]
    fn replaying_same_intent_id_is_a_no_op() {
        let mut sm = PairStateMachine::new(policy());
        let now = Utc::now();
        sm.apply_outcome("SOL/USDC", Side::Buy, "dup", TxOutcome::Success, Some(100.0), Some(1), now);
        let second = sm.apply_outcome("SOL/USDC", Side::Buy, "dup", TxOutcome::Success, Some(999.0), Some(999), now);
        assert_eq!(second, TransitionEffect::NoOpReplay);
        assert_eq!(sm.state_of("SOL/USDC").entry_price, Some(100.0));
    }

    #[test]
    fn unknown_outcome_preserves_inflight_and_status_via_mark_inflight() {
        let mut sm = PairStateMachine::new(policy());
        sm.mark_inflight("SOL/USDC", Side::Buy, InflightHandle::Signature("S".to_string()));
        let st = sm.state_of("SOL/USDC");
        assert!(st.is_flat());
        assert!(st.inflight_buy_id.is_some());
    }
}
