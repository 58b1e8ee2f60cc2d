use std::{collections::HashMap, sync::Arc, time::Duration};

use log::info;
use teloxide::{
    prelude::*,
    types::{ChatId, ParseMode},
    utils::{command::BotCommands, html::escape},
};
use tokio::sync::{watch, Mutex};

use crate::{
    dashboard::{fetch_detail, load_symbols, DetailView},
    datasources::MarketSource,
    render::{render_chart, render_detail, render_insights, render_symbols, render_ticker},
    ticker::TickerSnapshot,
};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(
    rename_rule = "lowercase",
    description = "Pebble market bot. These commands are supported:"
)]
pub enum Command {
    #[command(description = "show this text.")]
    Help,
    #[command(description = "show the live price ticker.")]
    Ticker,
    #[command(description = "list tradable symbols.")]
    Symbols,
    #[command(description = "select a symbol and load its chart and insights.")]
    Select(String),
    #[command(description = "show the price chart for the selected symbol.")]
    Chart,
    #[command(description = "show AI market insights for the selected symbol.")]
    Insights,
}

/// Shared state behind every chat.
pub struct App {
    source: Arc<dyn MarketSource>,
    interval: String,
    default_symbol: String,
    fetch_timeout: Option<Duration>,
    ticker: watch::Receiver<TickerSnapshot>,
    symbols: Mutex<Vec<String>>,
    views: Mutex<HashMap<ChatId, DetailView>>,
}

impl App {
    pub fn new(
        source: Arc<dyn MarketSource>,
        interval: String,
        default_symbol: String,
        ticker: watch::Receiver<TickerSnapshot>,
    ) -> App {
        App {
            source,
            interval,
            default_symbol,
            fetch_timeout: None,
            ticker,
            symbols: Mutex::new(vec![]),
            views: Mutex::new(HashMap::new()),
        }
    }

    /// Deadline for symbol and detail loads.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> App {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Symbol list, fetched again while the last attempt came back empty.
    /// The lock is not held across the fetch.
    pub async fn symbols(&self) -> Vec<String> {
        let cached = self.symbols.lock().await.clone();
        if !cached.is_empty() {
            return cached;
        }
        let loaded = load_symbols(&*self.source, self.fetch_timeout).await;
        let mut symbols = self.symbols.lock().await;
        if symbols.is_empty() {
            *symbols = loaded;
        }
        symbols.clone()
    }

    pub fn ticker_text(&self) -> String {
        render_ticker(&self.ticker.borrow())
    }

    pub async fn symbols_text(&self, chat: ChatId) -> String {
        let symbols = self.symbols().await;
        let views = self.views.lock().await;
        let selected = views
            .get(&chat)
            .map(|v| v.selected())
            .unwrap_or(self.default_symbol.as_str());
        render_symbols(&symbols, selected)
    }

    /// Selects `symbol` for the chat and loads its detail. The chat keeps
    /// showing its previous detail if the load fails.
    pub async fn select(&self, chat: ChatId, symbol: &str) -> String {
        let ticket = self
            .views
            .lock()
            .await
            .entry(chat)
            .or_insert_with(|| DetailView::new(&self.default_symbol))
            .begin_load(symbol);
        let result =
            fetch_detail(&*self.source, symbol, &self.interval, self.fetch_timeout).await;
        let mut views = self.views.lock().await;
        let view = views
            .entry(chat)
            .or_insert_with(|| DetailView::new(&self.default_symbol));
        view.finish_load(ticket, result);
        render_detail(view)
    }

    /// Loads the default symbol the first time a chat asks for detail.
    async fn ensure_loaded(&self, chat: ChatId) {
        let pending = match self.views.lock().await.get(&chat) {
            Some(view) if view.detail().is_some() || view.is_loading() => None,
            Some(view) => Some(view.selected().to_owned()),
            None => Some(self.default_symbol.clone()),
        };
        if let Some(symbol) = pending {
            self.select(chat, &symbol).await;
        }
    }

    pub async fn chart_text(&self, chat: ChatId) -> String {
        self.ensure_loaded(chat).await;
        let views = self.views.lock().await;
        match views.get(&chat).and_then(|v| v.detail()) {
            Some(detail) => render_chart(&detail.intraday),
            None => views.get(&chat).map(render_detail).unwrap_or_default(),
        }
    }

    pub async fn insights_text(&self, chat: ChatId) -> String {
        self.ensure_loaded(chat).await;
        let views = self.views.lock().await;
        match views.get(&chat).and_then(|v| v.detail()) {
            Some(detail) => render_insights(&detail.prediction),
            None => views.get(&chat).map(render_detail).unwrap_or_default(),
        }
    }

    /// Reply for `/select`, or `None` when the symbol is accepted and a load
    /// should start.
    async fn reject_symbol(&self, symbol: &str) -> Option<String> {
        if symbol.is_empty() {
            return Some("Usage: /select SYMBOL, e.g. /select ETHUSDT".to_owned());
        }
        let known = self.symbols().await;
        if !known.is_empty() && !known.iter().any(|s| s == symbol) {
            return Some(format!("Unknown symbol: {}. Try /symbols.", escape(symbol)));
        }
        None
    }
}

pub async fn run(bot: Bot, app: Arc<App>) {
    info!("Starting Pebble bot");
    let handler = Update::filter_message()
        .filter_command::<Command>()
        .endpoint(answer);
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn answer(bot: Bot, msg: Message, cmd: Command, app: Arc<App>) -> ResponseResult<()> {
    let chat = msg.chat.id;
    let text = match cmd {
        Command::Help => Command::descriptions().to_string(),
        Command::Ticker => app.ticker_text(),
        Command::Symbols => app.symbols_text(chat).await,
        Command::Select(symbol) => {
            let symbol = symbol.trim().to_ascii_uppercase();
            match app.reject_symbol(&symbol).await {
                Some(reply) => reply,
                None => {
                    bot.send_message(chat, format!("Loading {}…", symbol)).await?;
                    app.select(chat, &symbol).await
                }
            }
        }
        Command::Chart => app.chart_text(chat).await,
        Command::Insights => app.insights_text(chat).await,
    };
    bot.send_message(chat, text).parse_mode(ParseMode::Html).await?;
    Ok(())
}
