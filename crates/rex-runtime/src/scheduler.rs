//! The tick loop: the single place that enforces strict ordering
//! (resolve-unknown → exits → entries), SOL reserve gating, consecutive-error
//! pause, and graceful flatten-all shutdown. One tick runs at a time, never
//! concurrent with another — the single-flight invariant needs no locking
//! beyond this outer tick boundary.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use solana_sdk::signer::Signer;
use uuid::Uuid;

use rex_aggregator::AggregatorClient;
use rex_audit::{record_why_not, AuditWriter};
use rex_chain::ChainClient;
use rex_config::AppConfig;
use rex_execution::{
    AttemptLadder, CoordinatorOutcome, ExecutionCoordinator, LadderPolicy, LadderRung as ExecLadderRung,
    PairStateMachine, Reconciler, ReconcilerConfig, TxExecutor, TxExecutorConfig,
};
use rex_price::{PriceOracle, PriceOutcome};
use rex_schemas::{classify_failure, EngineState, InflightHandle, InflightIntent, Pair, PricePoint, Side, WhyNot, WhyNotReason};
use rex_strategy::{Signal, StrategySignal};

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

pub struct Scheduler<C: ChainClient + ?Sized> {
    config: AppConfig,
    chain: Arc<C>,
    oracle: Arc<PriceOracle>,
    strategy: Arc<dyn StrategySignal>,
    state_machine: PairStateMachine,
    coordinator: ExecutionCoordinator<C>,
    audit: AuditWriter,
    run_id: Uuid,
    engine_state: EngineState,
    tick_seq: u64,
    consecutive_errors: u32,
}

impl<C: ChainClient + ?Sized> Scheduler<C> {
    pub fn new(
        config: AppConfig,
        chain: Arc<C>,
        signer: Arc<dyn Signer + Send + Sync>,
        oracle: Arc<PriceOracle>,
        aggregator: Arc<dyn AggregatorClient>,
        strategy: Arc<dyn StrategySignal>,
        audit: AuditWriter,
    ) -> Self {
        let rungs = to_exec_rungs(&config.slippage_ladder);
        let ladder = AttemptLadder::new(rungs, config.max_slippage_bps);

        let executor = TxExecutor::new(
            chain.clone(),
            signer,
            TxExecutorConfig {
                confirm_timeout: Duration::from_secs(config.confirm_timeout_s),
                poll_interval: Duration::from_millis(500),
                dry_run: config.dry_run,
            },
        );
        let reconciler = Reconciler::new(
            chain.clone(),
            ReconcilerConfig {
                settle_delay: Duration::from_secs(3),
                tolerance_pct: config.reconcile_tolerance_pct,
            },
        );
        let coordinator = ExecutionCoordinator::new(
            aggregator,
            Arc::new(executor),
            Arc::new(reconciler),
            ladder,
            config.max_price_impact_bps,
            config.wallet_address.clone(),
        );
        let state_machine = PairStateMachine::new(LadderPolicy {
            failure_threshold: config.failure_threshold,
            failure_cooldown: chrono::Duration::seconds(config.failure_cooldown_s as i64),
        });

        Self {
            config,
            chain,
            oracle,
            strategy,
            state_machine,
            coordinator,
            audit,
            run_id: Uuid::new_v4(),
            engine_state: EngineState::Running,
            tick_seq: 0,
            consecutive_errors: 0,
        }
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    pub fn set_exit_only_mode(&mut self, on: bool) {
        self.state_machine.set_exit_only_mode(on);
    }

    /// Direct access to the pair state machine for scenario tests that need
    /// to seed a position before driving a tick, without duplicating the
    /// coordinator's own transition logic.
    #[cfg(feature = "testkit")]
    pub fn state_machine_for_test(&mut self) -> &mut PairStateMachine {
        &mut self.state_machine
    }

    /// Runs exactly one tick. Caller owns the sleep-between-ticks interval
    /// and the "skip tick if previous still running" property follows
    /// naturally from `&mut self` + sequential `.await` — two ticks can never
    /// run concurrently against the same `Scheduler`.
    pub async fn run_tick(&mut self) -> anyhow::Result<()> {
        self.tick_seq += 1;
        let tick_seq = self.tick_seq;
        let now = Utc::now();

        if !self.engine_state.is_running() {
            self.record_all(tick_seq, WhyNotReason::EnginePaused, now, None);
            return Ok(());
        }

        if !self.check_reserve(tick_seq, now).await {
            return Ok(());
        }

        let prices = match self.refresh_prices(tick_seq, now).await {
            Some(p) => p,
            None => return Ok(()),
        };
        self.engine_state = EngineState::Running;

        for pair in self.config.pairs.clone() {
            self.resolve_unknown_for(&pair, Side::Buy, now).await;
            self.resolve_unknown_for(&pair, Side::Sell, now).await;
        }

        // Exits always precede entries; this ordering must never change.
        self.run_exits_pass(tick_seq, now, &prices).await;
        self.run_entries_pass(tick_seq, now, &prices).await;

        if self.consecutive_errors >= self.config.max_consecutive_errors {
            self.engine_state = EngineState::PausedExecErrors;
            self.record_all(tick_seq, WhyNotReason::ConsecutiveErrors, now, None);
        }

        Ok(())
    }

    async fn check_reserve(&mut self, tick_seq: u64, now: DateTime<Utc>) -> bool {
        let lamports = match self.chain.get_native_balance().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch native balance, treating as below reserve");
                self.engine_state = EngineState::PausedSolReserve;
                self.record_all(tick_seq, WhyNotReason::SolReserveLow, now, Some(e.to_string()));
                return false;
            }
        };
        let reserve_lamports = (self.config.min_sol_reserve * LAMPORTS_PER_SOL) as i64;
        if lamports < reserve_lamports {
            self.engine_state = EngineState::PausedSolReserve;
            self.record_all(tick_seq, WhyNotReason::SolReserveLow, now, Some(format!("lamports={lamports} reserve={reserve_lamports}")));
            return false;
        }
        true
    }

    async fn refresh_prices(&mut self, tick_seq: u64, now: DateTime<Utc>) -> Option<BTreeMap<String, PricePoint>> {
        let mut prices = BTreeMap::new();
        let mut any_invalid = false;

        for pair in self.config.pairs.clone() {
            match self.oracle.get_price(&pair, now).await {
                PriceOutcome::Fresh(point) => {
                    self.strategy.on_price(&pair.identity(), &point).await;
                    prices.insert(pair.identity(), point);
                }
                PriceOutcome::Stale { reason, .. } => {
                    any_invalid = true;
                    self.record(pair.identity(), tick_seq, WhyNotReason::PriceStale, now, Some(reason));
                }
                PriceOutcome::Unavailable { reason } => {
                    any_invalid = true;
                    self.record(pair.identity(), tick_seq, WhyNotReason::PriceFetchFailed, now, Some(reason));
                }
            }
        }

        if any_invalid {
            self.engine_state = EngineState::PausedPriceFeed;
            return None;
        }
        Some(prices)
    }

    async fn resolve_unknown_for(&mut self, pair: &Pair, side: Side, now: DateTime<Utc>) {
        let identity = pair.identity();
        let handle = match side {
            Side::Buy => self.state_machine.state_of(&identity).inflight_buy_id,
            Side::Sell => self.state_machine.state_of(&identity).inflight_sell_id,
        };
        let signature = match handle {
            Some(InflightHandle::Signature(sig)) => sig,
            _ => return,
        };

        let status = match self.chain.get_signature_status(&signature).await {
            Ok(Some(s)) => s,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!(%signature, error = %e, "resolve-unknown poll failed, leaving inflight");
                return;
            }
        };

        let pending = self.state_machine.pending_intent(&identity, side);

        if let Some(err) = status.err {
            let kind = classify_failure(&err);
            tracing::info!(%signature, ?kind, "resolve-unknown: signature landed with error");
            self.state_machine.clear_inflight(&identity, side);
            self.state_machine.apply_outcome(&identity, side, &signature, rex_schemas::TxOutcome::Failure, None, None, now);
            return;
        }

        if !matches!(status.confirmation_status, rex_chain::ConfirmationStatus::Confirmed | rex_chain::ConfirmationStatus::Finalized) {
            return;
        }

        tracing::info!(%signature, "resolve-unknown: signature confirmed");
        let (entry_price, size_base) = match (side, pending) {
            (Side::Buy, Some(intent)) => self.confirmed_buy_fields(pair, &intent).await,
            _ => (None, None),
        };
        self.state_machine.clear_inflight(&identity, side);
        self.state_machine.apply_outcome(&identity, side, &signature, rex_schemas::TxOutcome::Success, entry_price, size_base, now);
    }

    /// A signature that only just confirmed via `get_signature_status` still
    /// needs its fill re-read from chain, the same way a reconciled UNKNOWN
    /// does — the originally requested amount can differ from what actually
    /// landed. Re-reads the current token/quote balances and diffs them
    /// against the intent's pre-submit snapshot rather than trusting
    /// `expected_base_delta`.
    async fn confirmed_buy_fields(&self, pair: &Pair, intent: &InflightIntent) -> (Option<f64>, Option<i64>) {
        let post_token = match self.chain.get_token_balance(&pair.base_mint).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "resolve-unknown: failed to read post-fill token balance");
                return (None, None);
            }
        };
        let post_quote = match self.chain.get_token_balance(&pair.quote_mint).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "resolve-unknown: failed to read post-fill quote balance");
                return (None, None);
            }
        };

        let base_delta = post_token - intent.pre_balance_token;
        let quote_delta = post_quote - intent.pre_balance_quote;
        if base_delta <= 0 {
            return (None, None);
        }

        let base_scaled = base_delta as f64 / 10f64.powi(pair.base_decimals as i32);
        let quote_scaled = quote_delta.unsigned_abs() as f64 / 10f64.powi(pair.quote_decimals as i32);
        let entry_price = if base_scaled > 0.0 { Some(quote_scaled / base_scaled) } else { None };
        (entry_price, Some(base_delta))
    }

    async fn run_exits_pass(&mut self, tick_seq: u64, now: DateTime<Utc>, prices: &BTreeMap<String, PricePoint>) {
        for pair in self.config.pairs.clone() {
            let identity = pair.identity();
            if self.state_machine.can_exit(&identity, now).is_err() {
                continue;
            }
            let price = match prices.get(&identity) {
                Some(p) => p.clone(),
                None => continue,
            };
            match self.strategy.exit_signal(&identity, &price).await {
                Some(reason) => {
                    let size = self.state_machine.state_of(&identity).size_base.unwrap_or(0).max(0) as u64;
                    let outcome = self
                        .coordinator
                        .execute_intent(&mut self.state_machine, &pair, Side::Sell, size, &self.chain)
                        .await;
                    self.handle_outcome(&identity, tick_seq, now, outcome, Some(reason));
                }
                None => {
                    self.record(identity, tick_seq, WhyNotReason::SignalFlat, now, None);
                }
            }
        }
    }

    async fn run_entries_pass(&mut self, tick_seq: u64, now: DateTime<Utc>, prices: &BTreeMap<String, PricePoint>) {
        for pair in self.config.pairs.clone() {
            let identity = pair.identity();
            if let Err(reason) = self.state_machine.can_enter(&identity, now) {
                let why_reason = if reason == "exit_only_mode" || reason.starts_with("position_already_open") {
                    WhyNotReason::PositionAlreadyOpen
                } else {
                    WhyNotReason::TradeInflight
                };
                self.record(identity, tick_seq, why_reason, now, Some(reason));
                continue;
            }

            let signal = self.strategy.entry_signal(&identity).await;
            if signal != Signal::Long {
                self.record(identity, tick_seq, WhyNotReason::SignalFlat, now, None);
                continue;
            }

            let price = match prices.get(&identity) {
                Some(p) => p.clone(),
                None => continue,
            };
            let equity_lamports = self.chain.get_native_balance().await.unwrap_or(0) as f64;
            let size = self.strategy.size_trade(&identity, equity_lamports, price.price).await;
            if size <= 0 {
                self.record(identity, tick_seq, WhyNotReason::InsufficientHistory, now, None);
                continue;
            }

            let outcome = self
                .coordinator
                .execute_intent(&mut self.state_machine, &pair, Side::Buy, size as u64, &self.chain)
                .await;
            self.handle_outcome(&identity, tick_seq, now, outcome, None);
        }
    }

    fn handle_outcome(&mut self, pair_identity: &str, tick_seq: u64, now: DateTime<Utc>, outcome: CoordinatorOutcome, exit_reason: Option<String>) {
        match outcome {
            CoordinatorOutcome::Success => {
                self.consecutive_errors = 0;
                let detail = exit_reason.unwrap_or_else(|| "trade_executed".to_string());
                self.record(pair_identity.to_string(), tick_seq, WhyNotReason::TradeExecuted, now, Some(detail));
            }
            CoordinatorOutcome::Failure(kind) => {
                self.consecutive_errors += 1;
                self.record(pair_identity.to_string(), tick_seq, WhyNotReason::TxFailed, now, Some(kind.to_string()));
            }
            CoordinatorOutcome::Unknown => {
                self.record(pair_identity.to_string(), tick_seq, WhyNotReason::TradeInflight, now, Some("unresolved".to_string()));
            }
        }
    }

    /// Drains open positions toward FLAT, SOL last, skipping any pair still
    /// inflight. Called once at shutdown after `exit_only_mode` is set.
    pub async fn flatten_all(&mut self) {
        let now = Utc::now();
        let lamports = self.chain.get_native_balance().await.unwrap_or(0);
        let reserve_lamports = (self.config.min_sol_reserve * LAMPORTS_PER_SOL) as i64;

        let mut pairs = self.config.pairs.clone();
        pairs.sort_by_key(|p| p.base_symbol == "SOL");

        for pair in pairs {
            let identity = pair.identity();
            if pair.base_symbol == "SOL" && lamports <= reserve_lamports {
                tracing::warn!(pair = %identity, "skipping SOL exit at shutdown: at or below reserve");
                self.record(identity, self.tick_seq, WhyNotReason::SolReserveLow, now, Some("flatten_all_skip".to_string()));
                continue;
            }
            if self.state_machine.can_exit(&identity, now).is_err() {
                continue;
            }
            let size = self.state_machine.state_of(&identity).size_base.unwrap_or(0).max(0) as u64;
            if size == 0 {
                continue;
            }
            let outcome = self
                .coordinator
                .execute_intent(&mut self.state_machine, &pair, Side::Sell, size, &self.chain)
                .await;
            self.handle_outcome(&identity, self.tick_seq, now, outcome, Some("flatten_all".to_string()));
        }
    }

    fn record(&mut self, pair_identity: impl Into<String>, tick_seq: u64, reason: WhyNotReason, ts: DateTime<Utc>, detail: Option<String>) {
        let mut why = WhyNot::new(pair_identity, tick_seq, reason, ts);
        if let Some(d) = detail {
            why = why.with_detail(d);
        }
        if let Err(e) = record_why_not(&mut self.audit, self.run_id, &why) {
            tracing::error!(error = %e, "failed to append audit record");
        }
    }

    fn record_all(&mut self, tick_seq: u64, reason: WhyNotReason, ts: DateTime<Utc>, detail: Option<String>) {
        for pair in self.config.pairs.clone() {
            self.record(pair.identity(), tick_seq, reason, ts, detail.clone());
        }
    }
}

fn to_exec_rungs(rungs: &[rex_config::LadderRung]) -> Vec<ExecLadderRung> {
    rungs
        .iter()
        .map(|r| ExecLadderRung {
            slippage_bps: r.slippage_bps,
            priority_fee: match &r.priority_fee {
                rex_config::PriorityFee::Auto => rex_aggregator::PriorityFeeLamports::Auto,
                rex_config::PriorityFee::Lamports(v) => rex_aggregator::PriorityFeeLamports::Fixed(*v),
            },
        })
        .collect()
}
