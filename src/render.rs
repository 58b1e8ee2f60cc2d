//! HTML message bodies for the chat front end.

use std::{fmt::Write, time::SystemTime};

use chrono::DateTime;
use pretty_duration::pretty_duration;
use teloxide::utils::html::escape;

use crate::{
    dashboard::DetailView,
    datasources::{IntradayData, PredictionSnapshot},
    format::{display_symbol, format_change, format_currency, format_percentage},
    ticker::{Flash, TickerSnapshot},
};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARK_WIDTH: usize = 48;
const LOADING_ROWS: usize = 5;

pub fn render_ticker(snapshot: &TickerSnapshot) -> String {
    if snapshot.is_loading() {
        let placeholder = vec!["░".repeat(16); LOADING_ROWS].join("\n");
        return format!(
            "<b>Price Ticker</b>\n<i>Loading prices…</i>\n<pre>{}</pre>",
            placeholder
        );
    }
    let rows: Vec<_> = snapshot
        .quotes
        .iter()
        .map(|q| {
            let flash = match q.flash() {
                Flash::Up => '↑',
                Flash::Down => '↓',
                Flash::Steady => ' ',
            };
            (
                display_symbol(&q.symbol),
                format!("{} {}", format_currency(q.price, &q.symbol), flash),
                format_change(q.change_percent),
            )
        })
        .collect();
    let symbol_width = rows.iter().map(|r| r.0.chars().count()).max().unwrap_or(4);
    let price_width = rows.iter().map(|r| r.1.chars().count()).max().unwrap_or(8);
    let mut body = String::new();
    for (symbol, price, change) in &rows {
        let _ = writeln!(
            body,
            "{:<sw$} {:>pw$} {}",
            symbol,
            price,
            change,
            sw = symbol_width,
            pw = price_width
        );
    }
    let updated = snapshot
        .updated_at
        .and_then(|t| SystemTime::now().duration_since(t).ok())
        .map(|d| format!("\nUpdated: {} ago", pretty_duration(&d, None)))
        .unwrap_or_default();
    format!(
        "<b>Price Ticker</b>\n<pre>{}</pre>{}",
        escape(body.trim_end()),
        updated
    )
}

pub fn render_chart(data: &IntradayData) -> String {
    let closes: Vec<f64> = data.closes().collect();
    let header = format!(
        "<b>{}</b> · {}",
        escape(&data.symbol),
        escape(&data.interval)
    );
    let last = match data.intraday_data.last() {
        Some(last) => last,
        None => return format!("{}\n<i>No candles available</i>", header),
    };
    let tail = &closes[closes.len().saturating_sub(SPARK_WIDTH)..];
    let shown_from = &data.intraday_data[data.intraday_data.len() - tail.len()];
    format!(
        "{}\n<pre>{}\n{} → {}</pre>\nLast close: {}\nCandles: {}\nUpdated: {}",
        header,
        sparkline(tail),
        candle_time(shown_from.timestamp),
        candle_time(last.timestamp),
        escape(&format_currency(last.close, &data.symbol)),
        closes.len(),
        escape(&data.time_updated)
    )
}

pub fn render_insights(snapshot: &PredictionSnapshot) -> String {
    let (analysis, insights) = match (&snapshot.price_analysis, &snapshot.ai_insights) {
        (Some(analysis), Some(insights)) => (analysis, insights),
        _ => return "<b>Market Insights</b>\n<i>No data available</i>".to_owned(),
    };
    let symbol = &snapshot.metadata.symbol;
    let direction = if analysis.prediction > analysis.current {
        '▲'
    } else {
        '▼'
    };
    let mut out = String::from("<b>Market Insights</b>\n");
    let _ = writeln!(
        out,
        "Current Price: <b>{}</b>",
        escape(&format_currency(analysis.current, symbol))
    );
    let _ = writeln!(
        out,
        "Prediction: <b>{}</b> {}",
        escape(&format_currency(analysis.prediction, symbol)),
        direction
    );

    out.push_str("\n<b>Technical Indicators</b>\n");
    let _ = writeln!(out, "RSI: {}", format_percentage(analysis.rsi));
    let _ = writeln!(
        out,
        "Volatility: {}",
        format_percentage(analysis.volatility * 100.0)
    );
    let _ = writeln!(
        out,
        "Support: {}",
        escape(&format_currency(analysis.key_levels.support, symbol))
    );
    let _ = writeln!(
        out,
        "Resistance: {}",
        escape(&format_currency(analysis.key_levels.resistance, symbol))
    );

    out.push_str("\n<b>AI Summary</b>\n");
    let _ = writeln!(out, "{}", escape(&insights.market_summary));
    for observation in &insights.technical_observations {
        let _ = writeln!(out, "• {}", escape(observation));
    }

    if !insights.trading_recommendations.is_empty() {
        out.push_str("\n<b>Trading Recommendations</b>\n");
        for rec in &insights.trading_recommendations {
            let _ = writeln!(
                out,
                "<b>{}</b>\nEntry: {}\nExit: {}",
                escape(&rec.action),
                escape(&rec.entry),
                escape(&rec.exit)
            );
        }
    }

    if !insights.risk_factors.is_empty() {
        out.push_str("\n<b>Risk Factors</b>\n");
        for risk in &insights.risk_factors {
            let _ = writeln!(out, "• {}", escape(risk));
        }
    }
    out.trim_end().to_owned()
}

pub fn render_symbols(symbols: &[String], selected: &str) -> String {
    if symbols.is_empty() {
        return "<i>Symbol list unavailable</i>".to_owned();
    }
    let list = symbols
        .iter()
        .map(|s| {
            if s == selected {
                format!("▸ <b>{}</b>", escape(s))
            } else {
                format!("  {}", escape(s))
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("<b>Symbols</b>\n{}", list)
}

/// Chart plus insights for the chat's current selection.
pub fn render_detail(view: &DetailView) -> String {
    if view.is_loading() {
        return format!("<i>Loading {}…</i>", escape(view.selected()));
    }
    match view.detail() {
        Some(detail) => format!(
            "{}\n\n{}",
            render_chart(&detail.intraday),
            render_insights(&detail.prediction)
        ),
        None => format!("<i>No data loaded for {}</i>", escape(view.selected())),
    }
}

fn sparkline(closes: &[f64]) -> String {
    let min = closes.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let top = (SPARK_LEVELS.len() - 1) as f64;
    closes
        .iter()
        .map(|&c| {
            let level = if max > min {
                ((c - min) / (max - min) * top).round()
            } else {
                top / 2.0
            };
            SPARK_LEVELS[level as usize]
        })
        .collect()
}

fn candle_time(timestamp_ms: f64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms as i64)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        datasources::{AiInsights, Candle, KeyLevels, PriceAnalysis, TradingRecommendation},
        ticker::{PollerState, PriceQuote},
    };

    fn candle(timestamp: f64, close: f64) -> Candle {
        Candle {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn loading_ticker_shows_placeholder() {
        let text = render_ticker(&TickerSnapshot::default());
        assert!(text.contains("Loading prices"));
        assert_eq!(text.matches('░').count(), 16 * LOADING_ROWS);
    }

    #[test]
    fn ticker_rows_show_price_flash_and_change() {
        let snapshot = TickerSnapshot {
            state: PollerState::Active,
            quotes: vec![
                PriceQuote {
                    symbol: "BTCUSDT".to_owned(),
                    price: 64250.5,
                    change_percent: 1.234,
                    previous_price: Some(64000.0),
                },
                PriceQuote {
                    symbol: "PEPEUSDT".to_owned(),
                    price: 0.00000123,
                    change_percent: -2.5,
                    previous_price: None,
                },
            ],
            updated_at: Some(SystemTime::now()),
        };
        let text = render_ticker(&snapshot);
        assert!(text.contains("BTC   $64,250.50 ↑ ▲ 1.23%"));
        assert!(text.contains("PEPE $0.00000123   ▼ 2.50%"));
        assert!(text.contains("Updated:"));
    }

    #[test]
    fn chart_spans_lowest_to_highest_level() {
        let data = IntradayData {
            symbol: "ETHUSDT".to_owned(),
            interval: "1h".to_owned(),
            intraday_data: vec![
                candle(0.0, 10.0),
                candle(3_600_000.0, 20.0),
                candle(7_200_000.5, 15.0),
            ],
            ..Default::default()
        };
        let text = render_chart(&data);
        assert!(text.contains("▁█▅"));
        assert!(text.contains("00:00 → 02:00"));
        assert!(text.contains("Last close: $15.00"));
        assert!(text.contains("Candles: 3"));
    }

    #[test]
    fn flat_chart_uses_middle_level() {
        assert_eq!(sparkline(&[3.0, 3.0]), "▄▄");
    }

    #[test]
    fn empty_chart_says_so() {
        let text = render_chart(&IntradayData::default());
        assert!(text.contains("No candles available"));
    }

    #[test]
    fn insights_without_analysis_are_unavailable() {
        let text = render_insights(&PredictionSnapshot::default());
        assert!(text.contains("No data available"));
    }

    #[test]
    fn insights_render_all_sections() {
        let mut snapshot = PredictionSnapshot::default();
        snapshot.metadata.symbol = "BTCUSDT".to_owned();
        snapshot.price_analysis = Some(PriceAnalysis {
            current: 64000.0,
            prediction: 65000.0,
            rsi: 55.5,
            volatility: 0.0321,
            key_levels: KeyLevels {
                support: 62000.0,
                resistance: 66000.0,
                trend_strength: 0.7,
            },
            ..Default::default()
        });
        snapshot.ai_insights = Some(AiInsights {
            market_summary: "Bulls <in> control".to_owned(),
            technical_observations: vec!["Golden cross".to_owned()],
            trading_recommendations: vec![TradingRecommendation {
                action: "Buy".to_owned(),
                entry: "64k".to_owned(),
                exit: "66k".to_owned(),
                rationale: "momentum".to_owned(),
            }],
            risk_factors: vec!["Macro news".to_owned()],
        });
        let text = render_insights(&snapshot);
        assert!(text.contains("Current Price: <b>$64,000.00</b>"));
        assert!(text.contains("Prediction: <b>$65,000.00</b> ▲"));
        assert!(text.contains("RSI: 55.50%"));
        assert!(text.contains("Volatility: 3.21%"));
        assert!(text.contains("Support: $62,000.00"));
        assert!(text.contains("Resistance: $66,000.00"));
        assert!(text.contains("Bulls &lt;in&gt; control"));
        assert!(text.contains("• Golden cross"));
        assert!(text.contains("Entry: 64k\nExit: 66k"));
        assert!(text.contains("• Macro news"));
    }

    #[test]
    fn symbol_list_marks_selection() {
        let symbols = vec!["BTCUSDT".to_owned(), "ETHUSDT".to_owned()];
        let text = render_symbols(&symbols, "ETHUSDT");
        assert!(text.contains("▸ <b>ETHUSDT</b>"));
        assert!(text.contains("  BTCUSDT"));
        assert!(render_symbols(&[], "BTCUSDT").contains("unavailable"));
    }

    #[test]
    fn detail_reports_loading_and_missing_data() {
        let mut view = DetailView::new("SOLUSDT");
        assert!(render_detail(&view).contains("No data loaded for SOLUSDT"));
        let _ticket = view.begin_load("ETHUSDT");
        assert!(render_detail(&view).contains("Loading ETHUSDT"));
    }
}
