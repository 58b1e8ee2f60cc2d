use std::time::Duration;

use log::{debug, error, info};

use crate::datasources::{with_deadline, ApiError, IntradayData, MarketSource, PredictionSnapshot};

pub const DEFAULT_SYMBOL: &str = "BTCUSDT";

/// Chart and insights data loaded together for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub intraday: IntradayData,
    pub prediction: PredictionSnapshot,
}

/// Issued by [`DetailView::begin_load`]; only the most recent ticket may
/// commit a result.
#[derive(Debug)]
pub struct LoadTicket {
    symbol: String,
    generation: u64,
}

/// Selected symbol plus the last detail that loaded successfully.
#[derive(Debug)]
pub struct DetailView {
    selected: String,
    detail: Option<Detail>,
    loading: bool,
    generation: u64,
}

impl DetailView {
    pub fn new(symbol: &str) -> DetailView {
        DetailView {
            selected: symbol.to_owned(),
            detail: None,
            loading: false,
            generation: 0,
        }
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    pub fn detail(&self) -> Option<&Detail> {
        self.detail.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_load(&mut self, symbol: &str) -> LoadTicket {
        self.generation += 1;
        self.selected = symbol.to_owned();
        self.loading = true;
        LoadTicket {
            symbol: symbol.to_owned(),
            generation: self.generation,
        }
    }

    /// Applies a load result. Failures keep the previous detail in place.
    /// Returns false when a newer load has superseded this one.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Detail, ApiError>) -> bool {
        if ticket.generation != self.generation {
            debug!("Dropping stale load for {}", ticket.symbol);
            return false;
        }
        self.loading = false;
        match result {
            Ok(detail) => self.detail = Some(detail),
            Err(e) => error!("Error fetching data for {}: {}", ticket.symbol, e),
        }
        true
    }
}

/// Fetches intraday candles and the prediction concurrently; both must
/// succeed within `limit`.
pub async fn fetch_detail(
    source: &dyn MarketSource,
    symbol: &str,
    interval: &str,
    limit: Option<Duration>,
) -> Result<Detail, ApiError> {
    with_deadline(limit, async {
        let (intraday, prediction) = tokio::join!(
            source.get_intraday(symbol, interval),
            source.get_prediction(symbol, interval),
        );
        Ok(Detail {
            intraday: intraday?,
            prediction: prediction?,
        })
    })
    .await
}

/// Loads the symbol list, logging and returning an empty list on failure.
pub async fn load_symbols(source: &dyn MarketSource, limit: Option<Duration>) -> Vec<String> {
    match with_deadline(limit, source.list_symbols()).await {
        Ok(symbols) => {
            info!("Loaded {} symbols", symbols.len());
            symbols
        }
        Err(e) => {
            error!("Error fetching symbols: {}", e);
            vec![]
        }
    }
}
