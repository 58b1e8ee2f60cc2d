use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use futures::future::join_all;
use log::{debug, error, info, warn};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::datasources::{with_deadline, ApiError, IntradayData, MarketSource};

pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(8);

pub const POPULAR_PAIRS: [&str; 19] = [
    "BTCUSDT", "ETHUSDT", "SOLUSDT", "BNBUSDT", "XRPUSDT", "ADAUSDT", "DOGEUSDT", "AVAUSDT",
    "AVAXUSDT", "LINKUSDT", "ATOMUSDT", "NEARUSDT", "AAVEUSDT", "UNIUSDT", "LTCUSDT", "PEPEUSDT",
    "FLOKIUSDT", "BONKUSDT", "SHIBUSDT",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub symbol: String,
    /// Close of the latest candle.
    pub price: f64,
    /// Change against the previous candle's close, in percent.
    pub change_percent: f64,
    /// Price emitted for this symbol by the last cycle that observed it.
    pub previous_price: Option<f64>,
}

/// Transient highlight after a price move between two observed cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    Up,
    Down,
    Steady,
}

impl PriceQuote {
    pub fn flash(&self) -> Flash {
        match self.previous_price {
            Some(prev) if prev != 0.0 && self.price > prev => Flash::Up,
            Some(prev) if prev != 0.0 && self.price < prev => Flash::Down,
            _ => Flash::Steady,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// No cycle has produced a quote yet.
    Idle,
    Active,
}

#[derive(Debug, Clone)]
pub struct TickerSnapshot {
    pub state: PollerState,
    pub quotes: Vec<PriceQuote>,
    pub updated_at: Option<SystemTime>,
}

impl Default for TickerSnapshot {
    fn default() -> Self {
        TickerSnapshot {
            state: PollerState::Idle,
            quotes: vec![],
            updated_at: None,
        }
    }
}

impl TickerSnapshot {
    pub fn is_loading(&self) -> bool {
        self.state == PollerState::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Committed(usize),
    Empty,
}

/// Polls intraday candles for a fixed set of symbols and publishes the
/// resulting quotes through a watch channel.
pub struct TickerPoller {
    source: Arc<dyn MarketSource>,
    symbols: Vec<String>,
    interval: String,
    fetch_timeout: Option<Duration>,
    last_known: HashMap<String, PriceQuote>,
    snapshot: watch::Sender<TickerSnapshot>,
}

impl TickerPoller {
    pub fn new(
        source: Arc<dyn MarketSource>,
        symbols: Vec<String>,
        interval: String,
    ) -> (TickerPoller, watch::Receiver<TickerSnapshot>) {
        let (snapshot, receiver) = watch::channel(TickerSnapshot::default());
        let poller = TickerPoller {
            source,
            symbols,
            interval,
            fetch_timeout: None,
            last_known: HashMap::new(),
            snapshot,
        };
        (poller, receiver)
    }

    /// Deadline for each per-symbol fetch. A fetch that exceeds it counts as
    /// a soft failure for the cycle.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> TickerPoller {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn snapshot(&self) -> TickerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn last_known(&self, symbol: &str) -> Option<&PriceQuote> {
        self.last_known.get(symbol)
    }

    /// Runs a single cycle: fetches every symbol concurrently and commits
    /// once all of them have settled.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let results = join_all(self.symbols.iter().map(|s| self.fetch_quote(s))).await;
        let mut quotes = vec![];
        for (symbol, result) in self.symbols.iter().zip(results) {
            match result {
                Ok(quote) if quote.price != 0.0 => quotes.push(quote),
                Ok(_) => warn!("Ticker: {} reported a zero price, skipping", symbol),
                Err(e) => warn!("Ticker: {} {}", symbol, e),
            }
        }
        self.commit(quotes)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<PriceQuote, ApiError> {
        let request = self.source.get_intraday(symbol, &self.interval);
        let data = with_deadline(self.fetch_timeout, request).await?;
        let (price, previous_close) = closing_pair(&data)?;
        Ok(PriceQuote {
            symbol: symbol.to_owned(),
            price,
            change_percent: change_percent(price, previous_close),
            previous_price: self.last_known.get(symbol).map(|q| q.price),
        })
    }

    fn commit(&mut self, quotes: Vec<PriceQuote>) -> CycleOutcome {
        if quotes.is_empty() {
            warn!("Ticker: no valid quotes this cycle, keeping previous prices");
            return CycleOutcome::Empty;
        }
        for quote in &quotes {
            self.last_known.insert(quote.symbol.clone(), quote.clone());
        }
        let count = quotes.len();
        self.snapshot.send_replace(TickerSnapshot {
            state: PollerState::Active,
            quotes,
            updated_at: Some(SystemTime::now()),
        });
        CycleOutcome::Committed(count)
    }

    /// Polls immediately and then once per `period` until the returned
    /// handle is shut down or dropped.
    pub fn spawn(self, period: Duration) -> PollerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(period, shutdown_rx));
        PollerHandle { shutdown_tx, task }
    }

    async fn run(mut self, period: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            "Ticker: polling {} symbols every {:?}",
            self.symbols.len(),
            period
        );
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => {}
            }
            // Dropping an in-flight cycle discards whatever it would have committed.
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                outcome = self.poll_once() => debug!("Ticker: cycle finished: {:?}", outcome),
            }
        }
        info!("Ticker: poller stopped");
    }
}

pub struct PollerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!("Ticker: poller task failed: {}", e);
        }
    }
}

/// Latest close and the close before it.
fn closing_pair(data: &IntradayData) -> Result<(f64, f64), ApiError> {
    match data.intraday_data.as_slice() {
        [.., previous, last] => Ok((last.close, previous.close)),
        candles => Err(ApiError::InvalidData(format!(
            "expected at least 2 candles, got {}",
            candles.len()
        ))),
    }
}

fn change_percent(price: f64, previous_close: f64) -> f64 {
    if previous_close == 0.0 {
        0.0
    } else {
        (price - previous_close) / previous_close * 100.0
    }
}
