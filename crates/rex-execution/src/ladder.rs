//! Attempt ladder: a pure function from attempt index to (slippage, priority
//! fee), bounded and deterministic. Escalation is visible — no geometric
//! unbounded growth — and attempts are consumed only on definite FAILURE by
//! the caller (this module has no notion of outcomes at all).

use rex_aggregator::PriorityFeeLamports;

#[derive(Debug, Clone, Copy)]
pub struct LadderRung {
    pub slippage_bps: u32,
    pub priority_fee: PriorityFeeLamports,
}

#[derive(Debug, Clone)]
pub struct AttemptLadder {
    rungs: Vec<LadderRung>,
    max_slippage_bps: u32,
}

impl AttemptLadder {
    /// `rungs` must be non-empty; `rex_config::AppConfig::validate` enforces
    /// this at boot so this constructor trusts its input.
    pub fn new(rungs: Vec<LadderRung>, max_slippage_bps: u32) -> Self {
        assert!(!rungs.is_empty(), "attempt ladder requires at least one rung");
        Self { rungs, max_slippage_bps }
    }

    pub fn max_attempts(&self) -> u32 {
        self.rungs.len() as u32
    }

    /// Attempts are 1-indexed to match the coordinator's `for attempt in
    /// 1..=max_attempts` loop. Indexes beyond the configured table clamp to
    /// the last rung, capped at `max_slippage_bps` — this should never
    /// trigger in practice since the coordinator never exceeds
    /// `max_attempts`, but a clamp is safer than a panic on a boundary the
    /// caller is trusted, not guaranteed, to respect.
    pub fn rung(&self, attempt: u32) -> LadderRung {
        let idx = (attempt.saturating_sub(1) as usize).min(self.rungs.len() - 1);
        let mut rung = self.rungs[idx];
        rung.slippage_bps = rung.slippage_bps.min(self.max_slippage_bps);
        rung
    }
}
