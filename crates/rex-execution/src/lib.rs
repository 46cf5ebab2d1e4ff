//! The trade execution core: per-pair state machine, attempt ladder,
//! transaction executor, balance-delta reconciler, and the coordinator that
//! strings them together for a single trade intent. Built to the invariant
//! that a retry is only ever permitted after a definitive outcome —
//! confirmed on chain, or reconciled from balance deltas.

pub mod coordinator;
pub mod ladder;
pub mod reconciler;
pub mod state_machine;
pub mod tx_executor;

pub use coordinator::{CoordinatorOutcome, ExecutionCoordinator};
pub use ladder::{AttemptLadder, LadderRung};
pub use reconciler::{ReconcileVerdict, Reconciler, ReconcilerConfig};
pub use state_machine::{LadderPolicy, PairStateMachine, TransitionEffect};
pub use tx_executor::{TxExecutor, TxExecutorConfig};
