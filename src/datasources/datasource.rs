use std::{future::Future, time::Duration};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::ApiError;
use super::types::{IntradayData, PredictionSnapshot};

/// Candle interval requested when the caller has no preference.
pub const DEFAULT_INTERVAL: &str = "1h";

/// Read-only view of the remote analytics service.
///
/// Every call is a single attempt: implementations do not cache, retry or
/// impose deadlines. Callers own that policy.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketSource: Sync + Send {
    async fn list_symbols(&self) -> Result<Vec<String>, ApiError>;

    async fn get_intraday(&self, symbol: &str, interval: &str) -> Result<IntradayData, ApiError>;

    async fn get_prediction(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<PredictionSnapshot, ApiError>;
}

/// Awaits `request`, failing with [`ApiError::Timeout`] once `limit` has
/// elapsed. `None` waits indefinitely.
pub async fn with_deadline<T, F>(limit: Option<Duration>, request: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .map_err(|_| ApiError::Timeout(limit))?,
        None => request.await,
    }
}
