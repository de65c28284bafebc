use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single spot price observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }

    /// Prices must be finite and strictly positive to be stored.
    pub fn has_valid_price(&self) -> bool {
        self.price.is_finite() && self.price > 0.0
    }
}

/// Extract prices from a slice of samples, preserving order.
pub fn prices(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| s.price).collect()
}
