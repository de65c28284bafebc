use async_trait::async_trait;

use crate::error::ProviderError;

/// Trait for fetching the current spot price of an asset, quoted in USD.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider name (for logging/display).
    fn name(&self) -> &str;

    /// Fetch the latest traded price for `symbol` (e.g. `BTC`, `ETH`).
    async fn fetch_price(&self, symbol: &str) -> Result<f64, ProviderError>;
}
