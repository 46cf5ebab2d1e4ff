//! Tick scheduler: the orchestration layer that wires PriceOracle,
//! ChainClient, AggregatorClient, StrategySignal, and the execution core
//! together into a periodic run loop with graceful shutdown.

pub mod scheduler;

pub use scheduler::Scheduler;

use std::sync::Arc;
use std::time::Duration;

use rex_chain::ChainClient;
use rex_schemas::EngineState;

/// Drives `scheduler` on a fixed-interval tick loop until a termination
/// signal arrives, then drains positions with `flatten_all` before
/// returning. Mirrors scenario S7: exit_only_mode is set first, then exits
/// run pair by pair with SOL last and the reserve preserved.
pub async fn run_until_shutdown<C: ChainClient + ?Sized>(
    scheduler: &mut Scheduler<C>,
    tick_interval: Duration,
) -> anyhow::Result<()> {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = scheduler.run_tick().await {
                    tracing::error!(error = %e, "tick failed, continuing on next interval");
                }
            }
            _ = shutdown_signal() => {
                tracing::info!("shutdown signal received, entering exit_only_mode");
                break;
            }
        }
    }

    scheduler.set_exit_only_mode(true);
    scheduler.flatten_all().await;
    tracing::info!(final_state = ?EngineState::Stopped, "flatten-all complete, shutting down");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
