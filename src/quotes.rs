// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Market price lookup. An unreliable external collaborator: callers
//! must tolerate `None` and never treat it as fatal.

use crate::utils::http_client;
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Market suffixes tried in order for a bare ticker.
pub const MARKET_SUFFIXES: [&str; 2] = [".TW", ".TWO"];

pub trait QuoteSource {
    /// Best-effort current price for a bare ticker, or None once every
    /// source and suffix is exhausted.
    fn lookup(&self, ticker: &str) -> Option<Decimal>;
}

pub struct YahooQuotes {
    client: reqwest::blocking::Client,
}

impl YahooQuotes {
    pub fn new() -> Result<Self> {
        Ok(YahooQuotes {
            client: http_client()?,
        })
    }

    /// Fast path: the quote endpoint's regular market price.
    fn quote_price(&self, symbol: &str) -> Option<Decimal> {
        let url = format!(
            "https://query1.finance.yahoo.com/v7/finance/quote?symbols={}",
            symbol
        );
        let resp = self.client.get(url).send().ok()?.error_for_status().ok()?;
        let yr: YahooResponse = resp.json().ok()?;
        let q = yr.quote_response.result.into_iter().next()?;
        positive(q.regular_market_price)
    }

    /// Fallback path: chart metadata price fields in priority order,
    /// then the most recent daily close.
    fn chart_price(&self, symbol: &str) -> Option<Decimal> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?range=5d&interval=1d",
            symbol
        );
        let resp = self.client.get(url).send().ok()?.error_for_status().ok()?;
        let cr: ChartResponse = resp.json().ok()?;
        let result = cr.chart.result?.into_iter().next()?;
        best_chart_price(&result)
    }
}

impl QuoteSource for YahooQuotes {
    fn lookup(&self, ticker: &str) -> Option<Decimal> {
        for suffix in MARKET_SUFFIXES {
            let symbol = format!("{}{}", ticker, suffix);
            if let Some(px) = self
                .quote_price(&symbol)
                .or_else(|| self.chart_price(&symbol))
            {
                return Some(px);
            }
        }
        None
    }
}

fn positive(px: Option<f64>) -> Option<Decimal> {
    let px = px?;
    if px > 0.0 { Decimal::from_f64_retain(px) } else { None }
}

fn best_chart_price(result: &ChartResult) -> Option<Decimal> {
    for candidate in [
        result.meta.regular_market_price,
        result.meta.previous_close,
        result.meta.chart_previous_close,
    ] {
        if let Some(px) = positive(candidate) {
            return Some(px);
        }
    }
    let quote = result.indicators.as_ref()?.quote.first()?;
    let closes = quote.close.as_ref()?;
    closes
        .iter()
        .rev()
        .flatten()
        .find_map(|c| positive(Some(*c)))
}

#[derive(Debug, Deserialize)]
struct YahooResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    result: Vec<YahooQuote>,
}
#[derive(Debug, Deserialize)]
struct YahooQuote {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}
#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}
#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}
#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "previousClose")]
    previous_close: Option<f64>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
}
#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<ChartQuote>,
}
#[derive(Debug, Deserialize)]
struct ChartQuote {
    close: Option<Vec<Option<f64>>>,
}
