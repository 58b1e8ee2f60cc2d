use std::{env, time::Duration};

use anyhow::{anyhow, ensure, Context, Result};

use crate::{
    dashboard::DEFAULT_SYMBOL,
    datasources::{DEFAULT_BASE_URL, DEFAULT_INTERVAL},
    ticker::{DEFAULT_POLL_PERIOD, POPULAR_PAIRS},
};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub api_url: String,
    pub interval: String,
    pub poll_period: Duration,
    pub fetch_timeout: Option<Duration>,
    pub pairs: Vec<String>,
    pub default_symbol: String,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let token = lookup("PEBBLE_TOKEN").ok_or(anyhow!("PEBBLE_TOKEN is not set"))?;
        let poll_period = match lookup("PEBBLE_POLL_SECS") {
            Some(secs) => {
                let secs: u64 = secs.parse().context("PEBBLE_POLL_SECS")?;
                ensure!(secs > 0, "PEBBLE_POLL_SECS must be positive");
                Duration::from_secs(secs)
            }
            None => DEFAULT_POLL_PERIOD,
        };
        let fetch_timeout = match lookup("PEBBLE_FETCH_TIMEOUT_SECS") {
            Some(secs) => match secs.parse::<u64>().context("PEBBLE_FETCH_TIMEOUT_SECS")? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => Some(DEFAULT_FETCH_TIMEOUT),
        };
        let pairs = lookup("PEBBLE_PAIRS")
            .map(|list| parse_symbols(&list))
            .filter(|pairs| !pairs.is_empty())
            .unwrap_or_else(|| POPULAR_PAIRS.iter().map(|s| s.to_string()).collect());
        Ok(Config {
            token,
            api_url: lookup("PEBBLE_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            interval: lookup("PEBBLE_INTERVAL").unwrap_or_else(|| DEFAULT_INTERVAL.to_owned()),
            poll_period,
            fetch_timeout,
            pairs,
            default_symbol: lookup("PEBBLE_DEFAULT_SYMBOL")
                .map(|s| s.trim().to_ascii_uppercase())
                .unwrap_or_else(|| DEFAULT_SYMBOL.to_owned()),
        })
    }
}

fn parse_symbols(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
