use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use price_watch_core::chart::{self, ChartGrid};
use price_watch_core::moving_average::{rolling_average, trailing_average_series, window_size_for};
use price_watch_core::sample;
use price_watch_core::signal::{Holding, Signal, classify};
use price_watch_core::store::SampleStore;
use tracing::debug;

/// Parameters shared by every evaluation of a symbol.
#[derive(Debug, Clone)]
pub struct EvalSettings {
    pub ma_days: u32,
    pub threshold_pct: f64,
    pub interval: Duration,
    pub chart_width: usize,
    pub chart_height: usize,
    pub holding: Option<Holding>,
    pub fee_pct: f64,
}

impl EvalSettings {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.ma_days))
    }

    /// Samples per moving-average window at the configured sampling interval.
    pub fn window_size(&self) -> usize {
        let span = Duration::from_secs(u64::from(self.ma_days) * 24 * 60 * 60);
        window_size_for(span, self.interval)
    }
}

#[derive(Debug)]
pub struct Evaluation {
    pub signal: Signal,
    /// None when the window holds nothing to plot.
    pub grid: Option<ChartGrid>,
}

/// Classify `current_price` against the stored window ending at `now` and
/// render the window as a chart.
pub fn evaluate(
    store: &SampleStore,
    symbol: &str,
    current_price: f64,
    now: DateTime<Utc>,
    settings: &EvalSettings,
) -> Result<Evaluation> {
    let window_start = now.checked_sub_signed(settings.window()).with_context(|| {
        format!("{}d average window reaches before the earliest time", settings.ma_days)
    })?;
    let samples = store
        .query_since(symbol, window_start)
        .with_context(|| format!("failed to query {symbol} samples since {window_start}"))?;

    let average = rolling_average(&samples, window_start);
    debug!(
        "{symbol}: {} sample(s) since {window_start}, average {average:?}",
        samples.len()
    );

    let mut signal = classify(current_price, average, settings.threshold_pct);
    if let Some(holding) = &settings.holding {
        signal = signal.with_holding(holding, settings.fee_pct);
    }

    let prices = sample::prices(&samples);
    let grid = if prices.is_empty() {
        None
    } else {
        let averages = trailing_average_series(&prices, settings.window_size());
        Some(
            chart::render(
                &prices,
                &averages,
                settings.chart_width,
                settings.chart_height,
            )
            .context("failed to render chart")?,
        )
    };

    Ok(Evaluation { signal, grid })
}
