use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProviderError;
use crate::provider::PriceProvider;

const KRAKEN_BASE_URL: &str = "https://api.kraken.com";

/// Kraken asset code for a common ticker. Kraken calls bitcoin `XBT`;
/// everything else passes through upper-cased.
fn asset_code(symbol: &str) -> String {
    match symbol.to_uppercase().as_str() {
        "BTC" | "XBT" => "XBT".to_string(),
        other => other.to_string(),
    }
}

/// Kraken pair name quoted in USD, e.g. `XXBTZUSD` for `BTC`.
fn usd_pair(symbol: &str) -> String {
    format!("X{}ZUSD", asset_code(symbol))
}

/// Kraken public ticker provider.
/// No authentication required.
pub struct KrakenProvider {
    client: Client,
    base_url: String,
}

impl KrakenProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: KRAKEN_BASE_URL.to_string(),
        }
    }

    /// Create with a custom base URL, e.g. a local server.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

impl Default for KrakenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct KrakenTickerResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<BTreeMap<String, KrakenTicker>>,
}

#[derive(Debug, Deserialize)]
struct KrakenTicker {
    /// Last trade closed: `[price, lot volume]`
    #[serde(default)]
    c: Vec<String>,
}

/// Pull the last trade price out of a ticker response.
fn parse_last_trade(body: KrakenTickerResponse, symbol: &str) -> Result<f64, ProviderError> {
    if !body.error.is_empty() {
        return Err(ProviderError::Api {
            status: 200,
            message: body.error.join("; "),
        });
    }

    let tickers = body.result.unwrap_or_default();
    let Some(raw) = tickers.values().find_map(|t| t.c.first()) else {
        return Err(ProviderError::NoPrice {
            symbol: symbol.to_string(),
        });
    };

    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ProviderError::Parse(format!("invalid last trade price '{raw}': {e}")))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(ProviderError::Parse(format!(
            "last trade price out of range: {price}"
        )));
    }

    Ok(price)
}

#[async_trait]
impl PriceProvider for KrakenProvider {
    fn name(&self) -> &str {
        "kraken"
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64, ProviderError> {
        let pair = usd_pair(symbol);
        let url = format!("{}/0/public/Ticker", self.base_url);
        debug!("Fetching Kraken ticker {pair} from {url}");

        let response = self
            .client
            .get(&url)
            .query(&[("pair", pair.as_str())])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: body,
            });
        }

        let body: KrakenTickerResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("failed to parse response: {e}")))?;

        parse_last_trade(body, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single request on a local port with a canned response and
    /// return the base URL to point the provider at.
    async fn serve_once(status: &'static str, headers: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\n{headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn parse(json: &str) -> Result<f64, ProviderError> {
        let body: KrakenTickerResponse = serde_json::from_str(json).unwrap();
        parse_last_trade(body, "BTC")
    }

    #[test]
    fn pair_mapping() {
        assert_eq!(usd_pair("BTC"), "XXBTZUSD");
        assert_eq!(usd_pair("btc"), "XXBTZUSD");
        assert_eq!(usd_pair("XBT"), "XXBTZUSD");
        assert_eq!(usd_pair("ETH"), "XETHZUSD");
        assert_eq!(usd_pair("ltc"), "XLTCZUSD");
    }

    #[test]
    fn parse_ticker_response_json() {
        let json = r#"{
            "error": [],
            "result": {
                "XXBTZUSD": {
                    "a": ["116439.00000", "1", "1.000"],
                    "b": ["116438.90000", "2", "2.000"],
                    "c": ["116438.80000", "0.00012000"],
                    "v": ["1201.5", "2402.1"]
                }
            }
        }"#;

        assert_eq!(parse(json).unwrap(), 116_438.8);
    }

    #[test]
    fn parse_kraken_error_array() {
        let json = r#"{"error": ["EQuery:Unknown asset pair"]}"#;
        match parse(json) {
            Err(ProviderError::Api { message, .. }) => {
                assert_eq!(message, "EQuery:Unknown asset pair");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_missing_last_trade() {
        let json = r#"{"error": [], "result": {"XXBTZUSD": {"c": []}}}"#;
        assert!(matches!(parse(json), Err(ProviderError::NoPrice { .. })));

        let json = r#"{"error": [], "result": {}}"#;
        assert!(matches!(parse(json), Err(ProviderError::NoPrice { .. })));
    }

    #[test]
    fn parse_bad_price_string() {
        let json = r#"{"error": [], "result": {"XXBTZUSD": {"c": ["abc", "1"]}}}"#;
        assert!(matches!(parse(json), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn parse_zero_price_rejected() {
        let json = r#"{"error": [], "result": {"XXBTZUSD": {"c": ["0.00000", "1"]}}}"#;
        assert!(matches!(parse(json), Err(ProviderError::Parse(_))));
    }

    #[tokio::test]
    async fn fetch_price_from_ticker_endpoint() {
        let url = serve_once(
            "200 OK",
            "Content-Type: application/json\r\n",
            r#"{"error":[],"result":{"XXBTZUSD":{"c":["116438.80000","0.001"]}}}"#,
        )
        .await;
        let provider = KrakenProvider::with_base_url(url);
        assert_eq!(provider.fetch_price("BTC").await.unwrap(), 116_438.8);
    }

    #[tokio::test]
    async fn fetch_price_rate_limited() {
        let url = serve_once("429 Too Many Requests", "Retry-After: 7\r\n", "").await;
        let provider = KrakenProvider::with_base_url(url);
        match provider.fetch_price("BTC").await {
            Err(ProviderError::RateLimited { retry_after_secs }) => assert_eq!(retry_after_secs, 7),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_price_http_error() {
        let url = serve_once("503 Service Unavailable", "", "down").await;
        let provider = KrakenProvider::with_base_url(url);
        match provider.fetch_price("ETH").await {
            Err(ProviderError::Api { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_price_undecodable_body() {
        let url = serve_once("200 OK", "Content-Type: application/json\r\n", "not json").await;
        let provider = KrakenProvider::with_base_url(url);
        assert!(matches!(
            provider.fetch_price("BTC").await,
            Err(ProviderError::Parse(_))
        ));
    }
}
