use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::PriceProvider;

/// Returns the same price on every call. Useful for exercising the watch
/// loop and its signals without touching the network.
pub struct FixedPriceProvider {
    price: f64,
}

impl FixedPriceProvider {
    pub fn new(price: f64) -> Result<Self, ProviderError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(ProviderError::Config(format!(
                "fixed price must be finite and positive, got {price}"
            )));
        }
        Ok(Self { price })
    }
}

#[async_trait]
impl PriceProvider for FixedPriceProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch_price(&self, _symbol: &str) -> Result<f64, ProviderError> {
        Ok(self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_price() {
        let provider = FixedPriceProvider::new(116_438.805).unwrap();
        assert_eq!(provider.fetch_price("BTC").await.unwrap(), 116_438.805);
        assert_eq!(provider.fetch_price("ETH").await.unwrap(), 116_438.805);
        assert_eq!(provider.name(), "fixed");
    }

    #[test]
    fn rejects_non_positive_price() {
        assert!(matches!(
            FixedPriceProvider::new(0.0),
            Err(ProviderError::Config(_))
        ));
        assert!(FixedPriceProvider::new(-3.0).is_err());
        assert!(FixedPriceProvider::new(f64::NAN).is_err());
    }
}
