mod datasource;
mod error;
mod pebble;
mod types;

pub use datasource::{with_deadline, MarketSource, DEFAULT_INTERVAL};
#[cfg(test)]
pub use datasource::MockMarketSource;
pub use error::ApiError;
pub use pebble::{PebbleApi, DEFAULT_BASE_URL};
pub use types::{
    AiInsights, Candle, IntradayData, KeyLevels, Macd, PredictionMetadata, PredictionRange,
    PredictionSnapshot, PriceAnalysis, TradingRecommendation,
};
