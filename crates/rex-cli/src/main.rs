use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use rex_aggregator::HttpAggregatorClient;
use rex_audit::AuditWriter;
use rex_chain::SolanaChainClient;
use rex_price::{HttpPriceFeed, PriceOracle};
use rex_runtime::{run_until_shutdown, Scheduler};
use rex_strategy::FixedStrategy;

/// Birdeye-style primary price feed base URL. Not part of `AppConfig`
/// because it names the upstream service, not a per-deployment secret —
/// only the API key (`price_primary_key`) is configuration.
const PRIMARY_PRICE_FEED_BASE_URL: &str = "https://public-api.birdeye.so/defi/price";

#[derive(Parser)]
#[command(name = "rex")]
#[command(about = "Solana DEX trade execution core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tick loop until SIGINT/SIGTERM, then flatten all positions.
    Run {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
        /// Path to a Solana JSON keypair file. Defaults to $REX_KEYPAIR_PATH.
        #[arg(long)]
        keypair: Option<String>,
    },

    /// Compute the layered config hash and print the canonical JSON, without
    /// starting anything.
    ConfigHash {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run a fixed number of ticks with dry_run forced on, regardless of
    /// what the config says, and exit. Useful for validating a config and a
    /// strategy wiring against live prices without ever signing anything.
    DryRun {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,
        #[arg(long, default_value_t = 1)]
        ticks: u32,
        #[arg(long)]
        keypair: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = rex_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }

        Commands::Run { config_paths, keypair } => {
            let (mut scheduler, tick_interval_s) = boot(&config_paths, keypair, false).await?;
            run_until_shutdown(&mut scheduler, Duration::from_secs(tick_interval_s)).await?;
            tracing::info!(final_state = ?scheduler.engine_state(), "rex run exited cleanly");
            Ok(())
        }

        Commands::DryRun { config_paths, ticks, keypair } => {
            let (mut scheduler, _tick_interval_s) = boot(&config_paths, keypair, true).await?;
            for i in 1..=ticks {
                scheduler.run_tick().await.with_context(|| format!("tick {i} failed"))?;
                tracing::info!(tick = i, engine_state = ?scheduler.engine_state(), "dry-run tick complete");
            }
            Ok(())
        }
    }
}

/// Shared boot path for `run` and `dry-run`: load config, wire up the live
/// Solana/Jupiter bindings, construct the scheduler. `force_dry_run` is set
/// by `dry-run` regardless of what the config file says. Returns the
/// configured tick interval alongside the scheduler since `run_until_shutdown`
/// needs it but owns no config itself.
async fn boot(
    config_paths: &[String],
    keypair_path: Option<String>,
    force_dry_run: bool,
) -> Result<(Scheduler<SolanaChainClient>, u64)> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let (mut config, _loaded) = rex_config::load_app_config(&path_refs).context("failed to load config")?;
    if force_dry_run {
        config.dry_run = true;
    }

    let keypair_path = keypair_path
        .or_else(|| std::env::var("REX_KEYPAIR_PATH").ok())
        .context("no --keypair given and REX_KEYPAIR_PATH is not set")?;
    let signer: Arc<dyn solana_sdk::signer::Signer + Send + Sync> = Arc::new(
        solana_sdk::signature::read_keypair_file(&keypair_path)
            .map_err(|e| anyhow::anyhow!("failed to read keypair at {keypair_path}: {e}"))?,
    );

    let chain = Arc::new(SolanaChainClient::new(config.rpc_url.clone(), signer.clone()));

    let primary = Arc::new(HttpPriceFeed::new(
        "primary",
        PRIMARY_PRICE_FEED_BASE_URL.to_string(),
        Some(config.price_primary_key.clone()),
    ));
    let secondary = Arc::new(HttpPriceFeed::new("secondary", config.price_secondary_base_url.clone(), None));
    let bounds: std::collections::HashMap<String, rex_schemas::PriceBounds> = config.bounds.clone().into_iter().collect();
    let oracle = Arc::new(PriceOracle::new(primary, secondary, bounds, chrono::Duration::seconds(config.price_ttl_s as i64)));

    let aggregator: Arc<dyn rex_aggregator::AggregatorClient> =
        Arc::new(HttpAggregatorClient::new(config.aggregator_base_url.clone(), 3));

    // Indicator logic (RSI, mean-reversion, or otherwise) is a deployment's
    // own responsibility; this binary ships only the deterministic strategy
    // boundary. A real strategy implements `rex_strategy::StrategySignal`
    // and is wired in here in place of `FixedStrategy`.
    let strategy: Arc<dyn rex_strategy::StrategySignal> = Arc::new(FixedStrategy::new(0));

    let audit_path = std::env::var("REX_AUDIT_LOG_PATH").unwrap_or_else(|_| "./rex-audit.jsonl".to_string());
    let audit = AuditWriter::new(audit_path, true).context("failed to open audit log")?;

    let tick_interval_s = config.tick_interval_s;
    let scheduler = Scheduler::new(config, chain, signer, oracle, aggregator, strategy, audit);
    Ok((scheduler, tick_interval_s))
}
