use anyhow::Context;
use clap::Parser;
use ema_cross_trader::{
    utils, BinanceRestClient, Config, Credentials, CrossoverDetector, MarketDataFeed,
    OrderExecutor, PollingLoop, ReqwestTransport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// EMA crossover trader with bracket exits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (falls back to CONFIG_FILE, then config/default.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    utils::init_from_config(&config.logging)?;
    info!(
        symbol = %config.general.symbol,
        interval = %config.general.interval,
        base_url = %config.exchange.base_url,
        "Configuration loaded"
    );

    // Missing credentials are fatal here, before anything touches the venue
    let credentials = Credentials::from_env().context("loading API credentials")?;
    info!("API credentials loaded");

    let transport = Arc::new(ReqwestTransport::new(&config.exchange.base_url, config.request_timeout())?);
    let client = Arc::new(BinanceRestClient::new(
        transport,
        credentials,
        config.exchange.endpoints.clone(),
        config.orders.recv_window_ms,
    ));
    client.can_sign().context("checking signing credentials")?;

    match client.get_balance().await {
        Ok(balances) => {
            for balance in balances.iter().filter(|b| !b.balance.is_zero()) {
                info!(asset = %balance.asset, balance = %balance.balance, "Wallet balance");
            }
        }
        Err(e) => warn!(error = %e, "Could not read wallet balance"),
    }

    let feed = Arc::new(MarketDataFeed::new(client.clone()));
    let executor = OrderExecutor::new(
        client,
        feed.clone(),
        config.general.interval.clone(),
        config.orders.price_precision,
    );
    let detector = CrossoverDetector::new(config.strategy.history_capacity);

    let mut polling = PollingLoop::new(feed, executor, detector, config.loop_settings());

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, stopping after current step");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    });

    info!("Press Ctrl+C to stop");
    let stats = polling.run(shutdown).await;

    info!(
        cycles = stats.cycles,
        failed_cycles = stats.failed_cycles,
        signals = stats.signals,
        partial_executions = stats.partial_executions,
        failed_executions = stats.failed_executions,
        "Trader stopped"
    );

    Ok(())
}
