use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value as JsonValue;

use super::datasource::MarketSource;
use super::error::ApiError;
use super::types::{IntradayData, PredictionSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://api-crypto.coolifyapp.com";

/// HTTP client for the Pebble analytics service.
pub struct PebbleApi {
    client: Arc<Client>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SymbolsResponse {
    symbols: Vec<String>,
}

impl PebbleApi {
    pub fn new(client: Arc<Client>, base_url: &str) -> PebbleApi {
        PebbleApi {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn symbols_url(&self) -> String {
        format!("{}/symbols", self.base_url)
    }

    fn intraday_url(&self, symbol: &str, interval: &str) -> String {
        format!("{}/intraday/{}?interval={}", self.base_url, symbol, interval)
    }

    fn prediction_url(&self, symbol: &str, interval: &str) -> String {
        format!("{}/predict/{}?interval={}", self.base_url, symbol, interval)
    }

    async fn run_query(&self, url: &str) -> Result<JsonValue, ApiError> {
        let resp_payload = self.client.get(url).send().await?;
        debug!("Pebble response code: {} for {}", resp_payload.status(), url);
        let response: JsonValue = resp_payload.error_for_status()?.json().await?;
        Ok(response)
    }
}

/// Turns a JSON body into `T`, surfacing service-reported errors and shape
/// mismatches as [`ApiError::InvalidData`].
fn decode<T: DeserializeOwned>(response: JsonValue) -> Result<T, ApiError> {
    for key in ["error", "detail"] {
        if let Some(message) = response[key].as_str() {
            return Err(ApiError::InvalidData(format!("Pebble: {}", message)));
        }
    }
    Ok(serde_json::from_value(response)?)
}

#[async_trait]
impl MarketSource for PebbleApi {
    async fn list_symbols(&self) -> Result<Vec<String>, ApiError> {
        info!("Querying Pebble symbols");
        let response = self.run_query(&self.symbols_url()).await?;
        let SymbolsResponse { symbols } = decode(response)?;
        Ok(symbols)
    }

    async fn get_intraday(&self, symbol: &str, interval: &str) -> Result<IntradayData, ApiError> {
        let response = self.run_query(&self.intraday_url(symbol, interval)).await?;
        decode(response)
    }

    async fn get_prediction(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<PredictionSnapshot, ApiError> {
        info!("Querying Pebble prediction for {} ({})", symbol, interval);
        let response = self.run_query(&self.prediction_url(symbol, interval)).await?;
        decode(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Answers a single request with `response` and returns the base URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    fn api(base_url: &str) -> PebbleApi {
        PebbleApi::new(Arc::new(Client::new()), base_url)
    }

    #[test]
    fn builds_endpoint_urls() {
        let api = api("https://example.test/");
        assert_eq!(api.symbols_url(), "https://example.test/symbols");
        assert_eq!(
            api.intraday_url("BTCUSDT", "1h"),
            "https://example.test/intraday/BTCUSDT?interval=1h"
        );
        assert_eq!(
            api.prediction_url("PEPEUSDT", "4h"),
            "https://example.test/predict/PEPEUSDT?interval=4h"
        );
    }

    #[test]
    fn decodes_symbol_list() {
        let SymbolsResponse { symbols } =
            decode(json!({ "symbols": ["BTCUSDT", "ETHUSDT"] })).unwrap();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn missing_symbols_is_invalid_data() {
        let err = decode::<SymbolsResponse>(json!({ "pairs": [] })).unwrap_err();
        assert!(matches!(err, ApiError::InvalidData(_)));
    }

    #[test]
    fn service_error_is_invalid_data() {
        let err = decode::<IntradayData>(json!({ "detail": "Symbol not found" })).unwrap_err();
        assert_eq!(err.to_string(), "invalid data: Pebble: Symbol not found");
    }

    #[test]
    fn decodes_intraday_payload() {
        let data: IntradayData = decode(json!({
            "symbol": "BTCUSDT",
            "interval": "1h",
            "intraday_data": [
                { "timestamp": 1700000000000i64, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10.0 },
                { "timestamp": 1700003600000i64, "open": 1.5, "high": 2.5, "low": 1.0, "close": 2.0, "volume": 12.0 }
            ],
            "time_updated": "2024-01-01T00:00:00Z",
            "intervals_elapsed": 2,
            "candles_returned": 2
        }))
        .unwrap();
        assert_eq!(data.symbol, "BTCUSDT");
        assert_eq!(data.closes().collect::<Vec<_>>(), vec![1.5, 2.0]);
        assert_eq!(data.candles_returned, 2);
    }

    #[test]
    fn prediction_sections_are_optional() {
        let snapshot: PredictionSnapshot = decode(json!({
            "metadata": { "symbol": "ETHUSDT", "interval": "1h" }
        }))
        .unwrap();
        assert_eq!(snapshot.metadata.symbol, "ETHUSDT");
        assert!(snapshot.price_analysis.is_none());
        assert!(snapshot.ai_insights.is_none());
    }

    #[test]
    fn fractional_timestamps_decode() {
        let data: IntradayData = decode(json!({
            "intraday_data": [
                { "timestamp": 1700000000000.0, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0, "volume": 0.0 }
            ]
        }))
        .unwrap();
        assert_eq!(data.intraday_data[0].timestamp, 1_700_000_000_000.0);
    }

    #[test]
    fn non_object_candle_list_is_invalid_data() {
        let err = decode::<IntradayData>(json!({ "intraday_data": "nope" })).unwrap_err();
        assert!(matches!(err, ApiError::InvalidData(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let err = api("http://127.0.0.1:9").list_symbols().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn error_status_is_network_error() {
        let url = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let err = api(&url).list_symbols().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_network_error() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        )
        .await;
        let err = api(&url).get_intraday("BTCUSDT", "1h").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }

    #[tokio::test]
    async fn service_error_body_is_invalid_data() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 29\r\nConnection: close\r\n\r\n{\"detail\":\"Symbol not found\"}",
        )
        .await;
        let err = api(&url).get_prediction("XYZUSDT", "1h").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidData(_)));
    }
}
