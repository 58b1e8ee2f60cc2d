use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candle {
    /// Milliseconds since the Unix epoch. The service may send it with a
    /// fractional part.
    pub timestamp: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntradayData {
    pub symbol: String,
    pub interval: String,
    pub intraday_data: Vec<Candle>,
    pub time_updated: String,
    pub intervals_elapsed: u64,
    pub candles_returned: u64,
}

impl IntradayData {
    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.intraday_data.iter().map(|c| c.close)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictionSnapshot {
    pub metadata: PredictionMetadata,
    pub price_analysis: Option<PriceAnalysis>,
    pub ai_insights: Option<AiInsights>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictionMetadata {
    pub interval: String,
    pub last_updated: String,
    pub data_points: u64,
    pub data_quality: f64,
    pub confidence_score: f64,
    pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PriceAnalysis {
    pub current: f64,
    pub prediction: f64,
    pub prediction_range: PredictionRange,
    pub sma_20: f64,
    pub sma_50: f64,
    pub rsi: f64,
    pub macd: Macd,
    pub volatility: f64,
    pub key_levels: KeyLevels,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictionRange {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Macd {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KeyLevels {
    pub support: f64,
    pub resistance: f64,
    pub trend_strength: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AiInsights {
    pub market_summary: String,
    pub technical_observations: Vec<String>,
    pub trading_recommendations: Vec<TradingRecommendation>,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TradingRecommendation {
    pub action: String,
    pub entry: String,
    pub exit: String,
    pub rationale: String,
}
