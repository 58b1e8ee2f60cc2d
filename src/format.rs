//! Display formatting for prices and percentages.
//!
//! Liquid coins are shown at cent-scale precision. Everything else keeps its
//! full shortest decimal form, since sub-cent tokens would otherwise collapse
//! to `$0.00`.

use rust_decimal::prelude::*;

const MAJOR_COINS: [&str; 14] = [
    "BTC", "ETH", "BNB", "SOL", "XRP", "ADA", "MATIC", "AVAX", "LINK", "ATOM", "NEAR", "AAVE",
    "UNI", "LTC",
];

const QUOTE_ASSET: &str = "USDT";

pub fn is_major_coin(symbol: &str) -> bool {
    MAJOR_COINS.iter().any(|coin| symbol.contains(coin))
}

pub fn format_currency(value: f64, symbol: &str) -> String {
    if value == 0.0 {
        return "$0.00".to_owned();
    }
    if is_major_coin(symbol) {
        if value >= 1000.0 {
            format!("${}", group_thousands(&to_fixed(value, 2)))
        } else if value >= 1.0 {
            format!("${}", to_fixed(value, 2))
        } else {
            format!("${}", to_fixed(value, 3))
        }
    } else if value.abs() < 1.0 {
        format!("${}", expand_fraction(value))
    } else {
        let exact = value.to_string();
        if exact.contains('.') {
            format!("${}", exact)
        } else {
            format!("${}.00000000", exact)
        }
    }
}

pub fn format_percentage(value: f64) -> String {
    if value == 0.0 {
        return "0.00%".to_owned();
    }
    format!("{}%", to_fixed(value, 2))
}

/// Period change with a direction arrow, e.g. `▲ 1.25%`.
pub fn format_change(change: f64) -> String {
    let arrow = if change >= 0.0 { '▲' } else { '▼' };
    format!("{} {}%", arrow, to_fixed(change.abs(), 2))
}

/// Ticker label without the quote asset: `BTCUSDT` becomes `BTC`.
pub fn display_symbol(symbol: &str) -> String {
    symbol.replacen(QUOTE_ASSET, "", 1)
}

/// Fixed-point rendering with half-away-from-zero rounding of the exact
/// binary value.
fn to_fixed(value: f64, dp: u32) -> String {
    match Decimal::from_f64_retain(value) {
        Some(decimal) => format!(
            "{:.*}",
            dp as usize,
            decimal.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => format!("{:.*}", dp as usize, value),
    }
}

/// Expands a value in `(-1, 1)` into plain decimal digits, building the
/// string from the shortest scientific decomposition: `1.23e-6` becomes
/// `0.00000123`.
fn expand_fraction(value: f64) -> String {
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let zeros = (-exponent - 1).max(0) as usize;
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}0.{}{}", sign, "0".repeat(zeros), digits)
}

fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    let grouped = integer
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|c| std::str::from_utf8(c).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",");
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}
