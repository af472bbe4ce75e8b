use anyhow::Context;
use clap::Parser;
use crossbot::config::{Settings, DEFAULT_CONFIG_PATH};
use crossbot::execution::TradingLoop;
use crossbot::BinanceClient;

/// Moving-average crossover bot for a single Binance spot pair
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Settings file, without extension (TOML, YAML or JSON)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the traded symbol (e.g. "ETHUSDT")
    #[arg(long, requires_all = ["base_asset", "quote_asset"])]
    symbol: Option<String>,

    /// Base asset of the overridden symbol (e.g. "ETH")
    #[arg(long)]
    base_asset: Option<String>,

    /// Quote asset of the overridden symbol (e.g. "USDT")
    #[arg(long)]
    quote_asset: Option<String>,

    /// Override the kline interval (e.g. "5m", "1h")
    #[arg(short, long)]
    interval: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    tracing::info!("🚀 Crossbot starting");
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Symbol: {} ({})", settings.market.symbol, settings.market.interval);
    tracing::info!(
        "  MA periods: fast {} / slow {}",
        settings.strategy.fast_period,
        settings.strategy.slow_period
    );
    tracing::info!("  Poll interval: {}s", settings.runtime.poll_interval_secs);
    if settings.exchange.api_key.is_empty() {
        tracing::warn!("No API key configured, signed requests will be rejected");
    }

    let client = BinanceClient::from_settings(&settings.exchange)
        .context("Failed to build exchange client")?;
    let (trading_loop, state) = TradingLoop::initialize(client, &settings)
        .await
        .context("Failed to fetch trading limits")?;

    tracing::info!("\nPress Ctrl+C to stop...\n");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
        }
        _ = trading_loop.run(state) => {}
    }

    tracing::info!("👋 Crossbot stopped");
    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crossbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config))?;

    if let Some(symbol) = &cli.symbol {
        settings.market.symbol = symbol.clone();
    }
    if let Some(base_asset) = &cli.base_asset {
        settings.market.base_asset = base_asset.clone();
    }
    if let Some(quote_asset) = &cli.quote_asset {
        settings.market.quote_asset = quote_asset.clone();
    }
    if let Some(interval) = &cli.interval {
        settings.market.interval = interval.clone();
    }

    settings.validate().context("Invalid settings")?;
    Ok(settings)
}
