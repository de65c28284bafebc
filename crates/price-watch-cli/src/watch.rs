use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use price_watch_core::sample::Sample;
use price_watch_core::signal::Action;
use price_watch_core::store::SampleStore;
use price_watch_providers::provider::PriceProvider;
use tracing::{info, warn};

use crate::display;
use crate::evaluation::{EvalSettings, evaluate};

pub struct WatchOptions {
    pub symbol: String,
    pub settings: EvalSettings,
    /// Stop after this many cycles; run until interrupted when None.
    pub iterations: Option<u64>,
    /// Ring the terminal bell on SELL.
    pub bell: bool,
}

/// Fetch, store, classify and print in a loop, sleeping `interval` between
/// cycles. Fetch failures are logged and retried on the next cycle; store
/// failures end the loop.
pub async fn run(
    store: &SampleStore,
    provider: &dyn PriceProvider,
    options: &WatchOptions,
) -> Result<()> {
    let symbol = &options.symbol;
    info!(
        "{symbol}: watching via {} every {}s, {}d average, threshold {}%",
        provider.name(),
        options.settings.interval.as_secs(),
        options.settings.ma_days,
        options.settings.threshold_pct,
    );

    let mut cycle: u64 = 0;
    loop {
        cycle += 1;

        match provider.fetch_price(symbol).await {
            Ok(price) => run_cycle(store, symbol, price, options)?,
            Err(e) => warn!("{symbol}: error fetching price: {e}"),
        }

        if options.iterations.is_some_and(|n| cycle >= n) {
            info!("{symbol}: finished after {cycle} cycle(s)");
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(options.settings.interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("{symbol}: interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

fn run_cycle(store: &SampleStore, symbol: &str, price: f64, options: &WatchOptions) -> Result<()> {
    let now = Utc::now();
    store
        .append_sample(symbol, &Sample::new(now, price))
        .with_context(|| format!("failed to store {symbol} sample"))?;

    let eval = evaluate(store, symbol, price, now, &options.settings)?;

    if options.bell && eval.signal.action == Action::Sell {
        print!("\x07");
    }

    println!(
        "{}\n",
        display::report(
            &now,
            symbol,
            &eval.signal,
            eval.grid.as_ref(),
            options.settings.ma_days,
        )
    );
    std::io::stdout().flush().context("failed to flush stdout")?;

    Ok(())
}
