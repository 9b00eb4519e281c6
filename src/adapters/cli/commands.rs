//! CLI Command Handlers
//!
//! Admin facade over the routing engine: quotes, health, venue toggles and
//! component stats.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

use crate::application::router::{to_base_units, to_whole_tokens, SwapRequest, MAX_TOKEN_DECIMALS};
use crate::application::SwapEngine;
use crate::config::{load_config, Config};
use crate::domain::tokens;
use crate::domain::Venue;

/// SwapBack router - multi-venue quote routing and atomic execution for Solana
#[derive(Parser, Debug)]
#[command(
    name = "swapback",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Multi-venue quote routing and atomic execution for Solana",
    long_about = "Quotes swaps across Jupiter, Raydium and Orca, splits large trades, sizes \
                  slippage dynamically and checks the internal liquidity pool for a better fill."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Route a swap and print the plan
    Quote(QuoteCmd),

    /// Probe every registered service once
    Health(HealthCmd),

    /// List quote sources, optionally toggling them first
    Sources(SourcesCmd),

    /// Internal liquidity pool statistics
    PoolStats,

    /// Compute the dynamic slippage for a trade
    Slippage(SlippageCmd),

    /// Quote cache statistics
    CacheStats,

    /// Look up a submitted bundle
    BundleStatus(BundleStatusCmd),
}

/// Get swap quote
#[derive(Parser, Debug)]
pub struct QuoteCmd {
    /// Input token symbol or mint (e.g., SOL)
    #[arg(value_name = "INPUT")]
    pub input_token: String,

    /// Output token symbol or mint (e.g., USDC)
    #[arg(value_name = "OUTPUT")]
    pub output_token: String,

    /// Amount to swap, in whole input tokens
    #[arg(value_name = "AMOUNT")]
    pub amount: Decimal,

    /// Fixed slippage tolerance in basis points (dynamic when omitted)
    #[arg(long, value_name = "BPS")]
    pub slippage: Option<u32>,

    /// Recent volatility of the pair in basis points
    #[arg(long, value_name = "BPS", default_value = "0")]
    pub volatility_bps: u32,

    /// Pool TVL in USD if known
    #[arg(long, value_name = "USD")]
    pub tvl_usd: Option<u64>,

    /// Decimals of an input mint the router does not know
    #[arg(long, value_name = "N")]
    pub input_decimals: Option<u8>,

    /// Decimals of an output mint the router does not know
    #[arg(long, value_name = "N")]
    pub output_decimals: Option<u8>,

    /// Print the routed quote as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct HealthCmd {
    /// Print the aggregate health as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct SourcesCmd {
    /// Disable a venue (repeatable)
    #[arg(long, value_name = "VENUE")]
    pub disable: Vec<Venue>,

    /// Enable a venue (repeatable)
    #[arg(long, value_name = "VENUE")]
    pub enable: Vec<Venue>,
}

#[derive(Parser, Debug)]
pub struct SlippageCmd {
    /// Trade size in USD
    #[arg(long, value_name = "USD")]
    pub trade_usd: u64,

    /// Pool TVL in USD (0 = unknown)
    #[arg(long, value_name = "USD", default_value = "0")]
    pub tvl_usd: u64,

    /// Volatility in basis points
    #[arg(long, value_name = "BPS", default_value = "0")]
    pub volatility_bps: u32,
}

#[derive(Parser, Debug)]
pub struct BundleStatusCmd {
    /// Bundle id returned on submission
    #[arg(value_name = "BUNDLE_ID")]
    pub bundle_id: String,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = match &app.config {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
            load_config(&expanded).with_context(|| format!("Failed to load configuration from {}", expanded))?
        }
        None => Config::from_env().context("Invalid default configuration")?,
    };

    init_logging(app.verbose, app.debug, &config.logging.level)?;

    // Slippage is pure arithmetic and needs no network clients
    if let Command::Slippage(cmd) = &app.command {
        return slippage_command(&config, cmd);
    }

    let engine = SwapEngine::from_config(&config).context("Failed to build routing engine")?;

    match app.command {
        Command::Quote(cmd) => quote_command(&engine, cmd).await,
        Command::Health(cmd) => health_command(&engine, cmd).await,
        Command::Sources(cmd) => sources_command(&engine, cmd),
        Command::PoolStats => pool_stats_command(&engine),
        Command::Slippage(_) => Ok(()),
        Command::CacheStats => cache_stats_command(&engine),
        Command::BundleStatus(cmd) => bundle_status_command(&engine, cmd).await,
    }
}

/// Initialize logging: flags win, then RUST_LOG, then the config file level
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn decimals_of(mint: &str, explicit: Option<u8>, side: &str) -> Result<u8> {
    let decimals = match (explicit, tokens::by_mint(mint)) {
        (Some(decimals), _) => decimals,
        (None, Some(info)) => info.decimals,
        (None, None) => bail!("Unknown {} token {}; pass --{}-decimals", side, mint, side),
    };
    if decimals > MAX_TOKEN_DECIMALS {
        bail!("--{}-decimals must be at most {}", side, MAX_TOKEN_DECIMALS);
    }
    Ok(decimals)
}

fn label(mint: &str) -> &str {
    tokens::by_mint(mint).map(|t| t.symbol).unwrap_or(mint)
}

/// Handle quote command
async fn quote_command(engine: &SwapEngine, cmd: QuoteCmd) -> Result<()> {
    let input_mint = tokens::resolve_mint(&cmd.input_token);
    let output_mint = tokens::resolve_mint(&cmd.output_token);
    let input_decimals = decimals_of(&input_mint, cmd.input_decimals, "input")?;
    let output_decimals = decimals_of(&output_mint, cmd.output_decimals, "output")?;

    let amount = to_base_units(cmd.amount, input_decimals).context("Invalid amount")?;
    if amount == 0 {
        bail!("Amount must be greater than zero");
    }

    let mut request = SwapRequest::new(input_mint.clone(), output_mint.clone(), amount)
        .with_decimals(input_decimals, output_decimals)
        .with_market(cmd.volatility_bps, cmd.tvl_usd);
    if let Some(bps) = cmd.slippage {
        request = request.with_slippage(bps);
    }

    tracing::info!("Routing {} {} -> {}", cmd.amount, label(&input_mint), label(&output_mint));
    let routed = engine.quote(&request).await.context("No quote available")?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&routed)?);
        return Ok(());
    }

    let scale = |raw: u64| to_whole_tokens(raw, output_decimals).unwrap_or_default();
    println!("Quote: {} {} -> {}", cmd.amount, label(&input_mint), label(&output_mint));
    println!("  Expected out: {} {}", scale(routed.expected_out), label(&output_mint));
    println!("  Minimum out:  {} {} ({} bps slippage)", scale(routed.min_out), label(&output_mint), routed.slippage_bps);
    if let Some(usd) = routed.trade_size_usd {
        println!("  Trade size:   ${:.2}", usd);
    }
    println!("  Cached:       {}", routed.from_cache);

    println!("\nPlan (expires {}):", routed.plan.expires_at.format("%H:%M:%S%.3f"));
    for split in &routed.plan.venues {
        println!(
            "  {:<9} {:>6.2}%  in {:>16}  out {:>16}",
            split.venue.name(),
            split.weight_bps as f64 / 100.0,
            split.input_amount,
            split.expected_output
        );
    }
    if let Some(internal) = &routed.internal {
        println!("  Internal fill saves {} (rebate {})", internal.savings, internal.rebate_amount);
    }
    if !routed.plan.fallback_plans.is_empty() {
        println!("  {} fallback plan(s)", routed.plan.fallback_plans.len());
    }

    println!("\nVenues:");
    for line in &routed.breakdown {
        println!(
            "  {:<9} out {:>16}  impact {:>6.3}%  {:>5}ms",
            line.venue.name(),
            line.out_amount,
            line.price_impact_pct,
            line.latency_ms
        );
    }

    Ok(())
}

/// Handle health command
async fn health_command(engine: &SwapEngine, cmd: HealthCmd) -> Result<()> {
    let health = engine.check_health().await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    println!("Overall: {}", health.overall.as_str());
    for service in &health.services {
        println!(
            "  {:<13} {:<9} {:>6}ms{}{}",
            service.name,
            service.status.as_str(),
            service.latency_ms,
            if service.critical { "  critical" } else { "" },
            service.message.as_deref().map(|m| format!("  ({})", m)).unwrap_or_default()
        );
    }
    Ok(())
}

/// Handle sources command
fn sources_command(engine: &SwapEngine, cmd: SourcesCmd) -> Result<()> {
    let aggregator = engine.aggregator();
    for venue in cmd.disable {
        if !aggregator.set_source_enabled(venue, false) {
            bail!("No quote source registered for {}", venue);
        }
    }
    for venue in cmd.enable {
        if !aggregator.set_source_enabled(venue, true) {
            bail!("No quote source registered for {}", venue);
        }
    }

    for stat in aggregator.source_stats() {
        println!(
            "  {:<9} priority {}  {}",
            stat.name,
            stat.priority,
            if stat.enabled { "enabled" } else { "disabled" }
        );
    }
    Ok(())
}

/// Handle pool-stats command
fn pool_stats_command(engine: &SwapEngine) -> Result<()> {
    let stats = engine.pool().get_pool_stats();
    if stats.is_empty() {
        println!("Internal pool holds no liquidity");
        return Ok(());
    }
    for stat in stats {
        println!(
            "  {:<5} liquidity {:>14}  providers {:>3}  utilization {:>5.2}%  APR {}%  volume {}",
            stat.symbol,
            stat.total_liquidity,
            stat.providers,
            stat.utilization_rate * Decimal::from(100),
            stat.apr_pct,
            stat.volume
        );
    }
    Ok(())
}

/// Handle slippage command
fn slippage_command(config: &Config, cmd: &SlippageCmd) -> Result<()> {
    let calculator = crate::domain::DynamicSlippageCalculator::new(config.slippage.clone());
    let breakdown = calculator.breakdown(cmd.trade_usd, cmd.tvl_usd, cmd.volatility_bps);

    println!("Slippage: {} bps", breakdown.slippage_bps);
    println!("  base        {}", breakdown.base_component);
    println!("  size        {}", breakdown.size_component);
    println!("  volatility  {}", breakdown.volatility_component);
    println!("  unknown TVL {}", breakdown.tvl_component);
    Ok(())
}

/// Handle cache-stats command
fn cache_stats_command(engine: &SwapEngine) -> Result<()> {
    let stats = engine.cache().stats();
    println!(
        "Quote cache: {} entries, {} hits, {} misses, hit rate {:.1}%",
        stats.size,
        stats.hits,
        stats.misses,
        stats.hit_rate * 100.0
    );
    for pair in &stats.hot_pairs {
        println!(
            "  hot {} -> {}: {} misses, last amount {}",
            label(&pair.input_mint),
            label(&pair.output_mint),
            pair.misses,
            pair.last_amount
        );
    }
    Ok(())
}

/// Handle bundle-status command
async fn bundle_status_command(engine: &SwapEngine, cmd: BundleStatusCmd) -> Result<()> {
    let status = engine
        .bundle_status(&cmd.bundle_id)
        .await
        .context("No block engine answered")?;
    println!("Bundle {}: {:?}", cmd.bundle_id, status);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quote() {
        let app = CliApp::try_parse_from([
            "swapback", "quote", "SOL", "USDC", "1.5", "--slippage", "75", "--json",
        ])
        .unwrap();
        match app.command {
            Command::Quote(cmd) => {
                assert_eq!(cmd.input_token, "SOL");
                assert_eq!(cmd.amount, Decimal::new(15, 1));
                assert_eq!(cmd.slippage, Some(75));
                assert!(cmd.json);
            }
            other => panic!("Expected quote, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sources_toggles() {
        let app = CliApp::try_parse_from([
            "swapback", "--verbose", "sources", "--disable", "raydium", "--enable", "orca",
        ])
        .unwrap();
        assert!(app.verbose);
        match app.command {
            Command::Sources(cmd) => {
                assert_eq!(cmd.disable, vec![Venue::Raydium]);
                assert_eq!(cmd.enable, vec![Venue::Orca]);
            }
            other => panic!("Expected sources, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_venue_rejected() {
        assert!(CliApp::try_parse_from(["swapback", "sources", "--disable", "serum"]).is_err());
    }

    #[test]
    fn test_parse_kebab_commands() {
        assert!(matches!(
            CliApp::try_parse_from(["swapback", "pool-stats"]).unwrap().command,
            Command::PoolStats
        ));
        assert!(matches!(
            CliApp::try_parse_from(["swapback", "cache-stats", "--debug"]).unwrap().command,
            Command::CacheStats
        ));
        let app = CliApp::try_parse_from([
            "swapback", "slippage", "--trade-usd", "1000", "--tvl-usd", "10000000",
        ])
        .unwrap();
        assert!(matches!(app.command, Command::Slippage(SlippageCmd { trade_usd: 1000, .. })));
    }

    #[test]
    fn test_decimals_lookup() {
        assert_eq!(decimals_of(tokens::SOL_MINT, None, "input").unwrap(), 9);
        assert_eq!(decimals_of("SomeMint", Some(8), "input").unwrap(), 8);
        assert!(decimals_of("SomeMint", None, "output").is_err());
        assert_eq!(decimals_of("SomeMint", Some(18), "input").unwrap(), 18);
        assert!(decimals_of("SomeMint", Some(20), "input").is_err());
    }
}
