//! Multibuy Operator - randomized multi-wallet token buyer for Solana
//!
//! Loads configuration and wallets, snapshots balances, schedules one
//! randomized buy per wallet and reports the session when it ends.

use multibuy_operator::config::AppConfig;
use multibuy_operator::engine::{
    AmountCapper, BalanceOracle, BuildSettings, BuyOrchestrator, ScheduleParams, SwapExecutor,
    TransactionBuilder,
};
use multibuy_operator::events::LogSink;
use multibuy_operator::ledger::{Ledger, RpcLedger};
use multibuy_operator::metrics::SessionMetrics;
use multibuy_operator::models::{AssetReference, BuyOutcome};
use multibuy_operator::reporter::{BalanceSnapshot, SessionReporter};
use multibuy_operator::routing::{LiquiditySource, RegistryLiquiditySource, RouteResolver};
use multibuy_operator::{vault, wallets};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Multibuy Operator v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    tracing::info!(
        target_mint = %config.target.mint,
        min_buy_sol = config.schedule.min_buy_sol,
        max_buy_sol = config.schedule.max_buy_sol,
        min_delay_ms = config.schedule.min_delay_ms,
        max_delay_ms = config.schedule.max_delay_ms,
        "Configuration loaded"
    );

    let secrets = vault::load_secrets_with_fallback(&config.wallets)
        .map_err(|e| anyhow::anyhow!("Failed to load wallet secrets: {}", e))?;
    let wallets = wallets::load_wallets(&secrets)?;

    // Ledger
    let endpoint = config.rpc.endpoint(secrets.rpc_api_key.as_deref());
    let rpc_ledger = Arc::new(RpcLedger::new(
        endpoint,
        &config.rpc.commitment,
        config.rpc.timeout_ms,
    )?);
    rpc_ledger.health_check().await?;
    let ledger: Arc<dyn Ledger> = rpc_ledger.clone();

    // Routing
    let source: Arc<dyn LiquiditySource> = Arc::new(
        RegistryLiquiditySource::load(rpc_ledger.client(), &config.routing.registry_source)
            .await?,
    );
    let resolver = Arc::new(RouteResolver::new(
        source,
        Arc::clone(&ledger),
        config.routing.max_hops,
        config.routing.topology_cache_capacity,
    ));

    let metrics = SessionMetrics::new()
        .map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    // Execution
    let builder = TransactionBuilder::new(BuildSettings::from(&config.execution));
    let executor = Arc::new(
        SwapExecutor::new(
            resolver,
            Arc::clone(&ledger),
            builder,
            config.execution.slippage_bps,
        )
        .with_metrics(metrics.clone()),
    );

    let target_mint = Pubkey::from_str(&config.target.mint)
        .map_err(|e| anyhow::anyhow!("Invalid target mint: {}", e))?;
    let target = AssetReference::new(
        target_mint,
        config.target.decimals,
        config.target.token_2022,
    );

    let orchestrator = BuyOrchestrator::new(
        AmountCapper::new(BalanceOracle::new(Arc::clone(&ledger))),
        executor,
        AssetReference::native(),
        target,
    )
    .with_events(Arc::new(LogSink))
    .with_metrics(metrics.clone());

    let reporter = SessionReporter::new(BalanceOracle::new(Arc::clone(&ledger)));

    let before = reporter.opening_snapshot(&wallets).await?;
    reporter.report_balances("before", &before);

    let session = orchestrator
        .run(&wallets, ScheduleParams::from_config(&config))
        .await?;
    tracing::info!(
        scheduled = session.scheduled().len(),
        settled = session.settled().len(),
        "Scheduling pass complete"
    );

    let outcomes = if config.session.wait_for_completion {
        let outcomes = wait_or_interrupt(session.wait()).await;
        let after = reporter.closing_snapshot(&wallets).await;
        reporter.report_balances("after", &after);
        log_deltas(&before, &after);
        outcomes
    } else {
        // Closing snapshot is taken while buys may still be pending
        let after = reporter.closing_snapshot(&wallets).await;
        reporter.report_balances("after", &after);
        log_deltas(&before, &after);
        wait_or_interrupt(session.wait()).await
    };

    if let Some(outcomes) = outcomes {
        reporter.summarize(&outcomes);
    }

    tracing::info!(metrics = %metrics.render(), "Session metrics");
    tracing::info!("Multibuy Operator finished");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multibuy_operator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Load and validate configuration
fn load_config() -> anyhow::Result<AppConfig> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    Ok(config)
}

/// Await every buy, or give up on Ctrl-C
async fn wait_or_interrupt(
    outcomes: impl std::future::Future<Output = Vec<BuyOutcome>>,
) -> Option<Vec<BuyOutcome>> {
    tokio::select! {
        outcomes = outcomes => Some(outcomes),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, pending buys abandoned");
            None
        }
    }
}

fn log_deltas(before: &BalanceSnapshot, after: &BalanceSnapshot) {
    for delta in SessionReporter::compare(before, after) {
        tracing::info!(
            wallet = %delta.wallet,
            before = delta.before,
            after = delta.after,
            spent_lamports = delta.spent() as i64,
            "Balance change"
        );
    }
}
