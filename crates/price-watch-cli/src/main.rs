mod display;
mod evaluation;
mod watch;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use price_watch_core::signal::Holding;
use price_watch_core::store::SampleStore;
use price_watch_providers::fixed::FixedPriceProvider;
use price_watch_providers::kraken::KrakenProvider;
use price_watch_providers::provider::PriceProvider;
use tracing::info;

use crate::evaluation::{EvalSettings, evaluate};
use crate::watch::WatchOptions;

#[derive(Parser)]
#[command(
    name = "price-watch",
    about = "Sample spot prices and print moving-average signals"
)]
struct Cli {
    /// Root directory for data storage (default: current directory)
    #[arg(long, env = "PRICE_WATCH_DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Options that shape a signal and its chart.
#[derive(Args, Debug)]
struct SignalArgs {
    /// Asset ticker, e.g. BTC or ETH
    #[arg(short, long, env = "TICKER", default_value = "BTC")]
    symbol: String,

    /// Moving average window in days
    #[arg(long, env = "MOVING_AVG_DAYS", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    ma_days: u32,

    /// Percent deviation from the average that triggers BUY/SELL
    #[arg(long, env = "CHANGE_THRESHOLD", default_value_t = 10.0, value_parser = parse_threshold)]
    threshold: f64,

    /// Seconds between samples (sizes the chart's average window)
    #[arg(long, env = "SLEEP_SECONDS", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    interval_secs: u64,

    /// Chart width in columns
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u16).range(1..))]
    width: u16,

    /// Chart height in rows
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(1..))]
    height: u16,

    /// Amount bought previously, for the profit estimate on SELL
    #[arg(long, env = "PREVIOUS_BUY_AMOUNT")]
    buy_amount: Option<f64>,

    /// Price paid previously, for the profit estimate on SELL
    #[arg(long, env = "PREVIOUS_BUY_PRICE")]
    buy_price: Option<f64>,

    /// Transaction fee in percent of the buy value
    #[arg(long, env = "TRANSACTION_FEE_PCT", default_value_t = 0.0)]
    fee_pct: f64,
}

/// Percent threshold: finite and non-negative.
fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid threshold '{s}': {e}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("threshold must be a finite percent >= 0, got {s}"));
    }
    Ok(value)
}

impl SignalArgs {
    fn symbol(&self) -> String {
        self.symbol.to_uppercase()
    }

    fn settings(&self) -> EvalSettings {
        let holding = match (self.buy_amount, self.buy_price) {
            (Some(amount), Some(buy_price)) => Some(Holding { amount, buy_price }),
            _ => None,
        };

        EvalSettings {
            ma_days: self.ma_days,
            threshold_pct: self.threshold,
            interval: Duration::from_secs(self.interval_secs),
            chart_width: usize::from(self.width),
            chart_height: usize::from(self.height),
            holding,
            fee_pct: self.fee_pct,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the price in a loop, storing each sample and printing signals
    Watch {
        #[command(flatten)]
        signal: SignalArgs,

        /// Use this price instead of querying Kraken
        #[arg(long)]
        fixed_price: Option<f64>,

        /// Stop after this many cycles (runs until Ctrl-C if omitted)
        #[arg(long)]
        iterations: Option<u64>,

        /// Ring the terminal bell on SELL
        #[arg(long)]
        bell: bool,
    },

    /// Evaluate the latest stored sample without fetching
    Report {
        #[command(flatten)]
        signal: SignalArgs,

        /// Print the signal as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Show what data exists in the store
    Status {
        /// Filter by symbol (shows all if omitted)
        #[arg(short, long)]
        symbol: Option<String>,
    },

    /// Validate Parquet files and report issues
    Validate {
        /// Symbols to validate (all if omitted, comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,
    },
}

fn create_provider(fixed_price: Option<f64>) -> Result<Box<dyn PriceProvider>> {
    match fixed_price {
        Some(price) => Ok(Box::new(
            FixedPriceProvider::new(price).context("invalid --fixed-price")?,
        )),
        None => Ok(Box::new(KrakenProvider::new())),
    }
}

async fn cmd_watch(
    store: &SampleStore,
    signal: &SignalArgs,
    fixed_price: Option<f64>,
    iterations: Option<u64>,
    bell: bool,
) -> Result<()> {
    let provider = create_provider(fixed_price)?;
    let options = WatchOptions {
        symbol: signal.symbol(),
        settings: signal.settings(),
        iterations,
        bell,
    };
    watch::run(store, provider.as_ref(), &options).await
}

fn cmd_report(store: &SampleStore, signal: &SignalArgs, json: bool) -> Result<()> {
    let symbol = signal.symbol();
    let Some(latest) = store
        .latest_sample(&symbol)
        .with_context(|| format!("failed to read latest {symbol} sample"))?
    else {
        println!("{symbol}: no data");
        return Ok(());
    };

    let settings = signal.settings();
    let eval = evaluate(store, &symbol, latest.price, latest.timestamp, &settings)?;

    if json {
        let text =
            serde_json::to_string_pretty(&eval.signal).context("failed to encode signal")?;
        println!("{text}");
    } else {
        println!(
            "{}",
            display::report(
                &latest.timestamp,
                &symbol,
                &eval.signal,
                eval.grid.as_ref(),
                settings.ma_days,
            )
        );
    }

    Ok(())
}

fn cmd_status(store: &SampleStore, symbol: Option<&str>) -> Result<()> {
    let symbols = match symbol {
        Some(s) => vec![s.to_uppercase()],
        None => store.list_symbols().context("failed to list symbols")?,
    };

    if symbols.is_empty() {
        println!("No data in store.");
        return Ok(());
    }

    for sym in &symbols {
        let Some((first, last)) = store
            .date_range(sym)
            .with_context(|| format!("failed to list dates for {sym}"))?
        else {
            println!("{sym}: no data");
            continue;
        };

        let days = store.list_dates(sym)?.len();
        let latest = store
            .latest_sample(sym)
            .with_context(|| format!("failed to read latest {sym} sample"))?;

        match latest {
            Some(sample) => println!(
                "{sym}: {days} day(s), {first} to {last}, last ${} at {}",
                display::grouped(sample.price, 2),
                display::eastern_time(&sample.timestamp)
            ),
            None => println!("{sym}: {days} day(s), {first} to {last}"),
        }
    }

    Ok(())
}

/// Requested symbols upper-cased to match the store, or every stored symbol.
fn validated_symbols(store: &SampleStore, symbols: Option<&[String]>) -> Result<Vec<String>> {
    match symbols {
        Some(list) => Ok(list.iter().map(|s| s.to_uppercase()).collect()),
        None => store.list_symbols().context("failed to list symbols"),
    }
}

fn cmd_validate(store: &SampleStore, symbols: Option<&[String]>) -> Result<()> {
    let symbols_to_check = validated_symbols(store, symbols)?;

    if symbols_to_check.is_empty() {
        println!("No data to validate.");
        return Ok(());
    }

    let mut issues = 0;

    for sym in &symbols_to_check {
        let dates = store
            .list_dates(sym)
            .with_context(|| format!("failed to list dates for {sym}"))?;

        for date in &dates {
            match store.read_day(sym, *date) {
                Ok(samples) => {
                    if samples.is_empty() {
                        println!("WARN: {sym} {date}: empty file");
                        issues += 1;
                        continue;
                    }

                    for i in 1..samples.len() {
                        if samples[i].timestamp <= samples[i - 1].timestamp {
                            println!(
                                "WARN: {sym} {date}: timestamps not strictly ascending at index {i}"
                            );
                            issues += 1;
                            break;
                        }
                    }

                    let bad_prices = samples.iter().filter(|s| !s.has_valid_price()).count();
                    if bad_prices > 0 {
                        println!("WARN: {sym} {date}: {bad_prices} sample(s) with invalid price");
                        issues += 1;
                    }
                }
                Err(e) => {
                    println!("ERROR: {sym} {date}: failed to read: {e}");
                    issues += 1;
                }
            }
        }
    }

    if issues == 0 {
        println!("All files valid.");
    } else {
        println!("{issues} issue(s) found.");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    let store = SampleStore::new(&cli.data_dir);
    info!("Using store at {}", cli.data_dir.display());

    match &cli.command {
        Commands::Watch {
            signal,
            fixed_price,
            iterations,
            bell,
        } => {
            cmd_watch(&store, signal, *fixed_price, *iterations, *bell).await?;
        }
        Commands::Report { signal, json } => {
            cmd_report(&store, signal, *json)?;
        }
        Commands::Status { symbol } => {
            cmd_status(&store, symbol.as_deref())?;
        }
        Commands::Validate { symbols } => {
            cmd_validate(&store, symbols.as_deref())?;
        }
    }

    Ok(())
}
