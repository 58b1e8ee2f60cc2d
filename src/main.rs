use std::sync::Arc;

use anyhow::Result;
use log::info;
use reqwest::Client;
use teloxide::Bot;

use pebble::{
    bot::{self, App},
    config::Config,
    datasources::{MarketSource, PebbleApi},
    ticker::TickerPoller,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::from_env()?;
    info!("Using Pebble API at {}", config.api_url);

    let client = Arc::new(Client::builder().user_agent("Pebble 0.1.0").build()?);
    let source: Arc<dyn MarketSource> = Arc::new(PebbleApi::new(client, &config.api_url));

    let (poller, ticker) =
        TickerPoller::new(source.clone(), config.pairs.clone(), config.interval.clone());
    let poller = poller
        .with_fetch_timeout(config.fetch_timeout)
        .spawn(config.poll_period);

    let app = Arc::new(
        App::new(source, config.interval, config.default_symbol, ticker)
            .with_fetch_timeout(config.fetch_timeout),
    );
    app.symbols().await;

    bot::run(Bot::new(config.token), app).await;
    poller.shutdown().await;
    Ok(())
}
