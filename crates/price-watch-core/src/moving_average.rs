use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::sample::Sample;

/// Arithmetic mean of the prices of every sample at or after `window_start`.
///
/// Returns `None` when no sample falls inside the window. Callers must treat
/// that as insufficient data, not as an average of zero.
pub fn rolling_average(samples: &[Sample], window_start: DateTime<Utc>) -> Option<f64> {
    let (sum, count) = samples
        .iter()
        .filter(|s| s.timestamp >= window_start)
        .fold((0.0, 0usize), |(sum, count), s| (sum + s.price, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Trailing mean for every index of `prices`.
///
/// `result[i]` is the mean of `prices[i + 1 - min(window_size, i + 1) ..= i]`,
/// so the first `window_size - 1` entries average a partial window rather
/// than padding with zeros. A `window_size` of 0 behaves like 1.
pub fn trailing_average_series(prices: &[f64], window_size: usize) -> Vec<f64> {
    let window_size = window_size.max(1);

    (0..prices.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window_size);
            let window = &prices[start..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Number of samples a time span covers when sampling every `interval`.
/// Never less than 1.
pub fn window_size_for(span: Duration, interval: Duration) -> usize {
    if interval.is_zero() {
        return 1;
    }
    let samples = span.as_secs_f64() / interval.as_secs_f64();
    (samples.floor() as usize).max(1)
}
