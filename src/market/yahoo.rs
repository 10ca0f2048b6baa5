// src/market/yahoo.rs
//! Live `MarketDataSource` over the public Yahoo Finance HTTP API.
//! `lookup` and `history` ride on the v8 chart endpoint; recommendation
//! trends come from v10 quoteSummary. The base URL is configurable so
//! nothing in tests ever reaches the live service.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::market::{CapabilityPayload, DataTable, InstrumentInfo, MarketDataSource, TableRow};

pub struct YahooFinanceSource {
    http: reqwest::Client,
    base_url: String,
}

// ---- v8 chart ----

#[derive(Deserialize)]
struct ChartEnvelope {
    chart: ChartOutcome,
}
#[derive(Deserialize)]
struct ChartOutcome {
    result: Option<Vec<ChartData>>,
    #[allow(dead_code)]
    error: Option<Value>,
}
#[derive(Deserialize)]
struct ChartData {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}
#[derive(Deserialize)]
struct ChartMeta {
    symbol: String,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    currency: Option<String>,
}
#[derive(Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}
#[derive(Deserialize, Default)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

// ---- v10 quoteSummary ----

#[derive(Deserialize)]
struct SummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    quote_summary: SummaryOutcome,
}
#[derive(Deserialize)]
struct SummaryOutcome {
    result: Option<Vec<SummaryModules>>,
    #[allow(dead_code)]
    error: Option<Value>,
}
#[derive(Deserialize)]
struct SummaryModules {
    #[serde(rename = "recommendationTrend")]
    recommendation_trend: Option<TrendBlock>,
}
#[derive(Deserialize)]
struct TrendBlock {
    trend: Vec<TrendRow>,
}
#[derive(Deserialize)]
struct TrendRow {
    period: String,
    #[serde(rename = "strongBuy")]
    strong_buy: i64,
    buy: i64,
    hold: i64,
    sell: i64,
    #[serde(rename = "strongSell")]
    strong_sell: i64,
}

impl YahooFinanceSource {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("stock-insight-api/0.1")
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: config.yahoo_base_url.clone(),
        }
    }

    async fn fetch_chart(&self, ticker: &str, range: &str, interval: &str) -> Result<Option<ChartData>> {
        let url = format!("{}/v8/finance/chart/{ticker}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await
            .context("chart request")?;

        // Yahoo answers unknown symbols with 404 and an error body.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status().context("chart request status")?;
        let envelope: ChartEnvelope = resp.json().await.context("decoding chart response")?;
        Ok(envelope.chart.result.and_then(|mut v| {
            if v.is_empty() {
                None
            } else {
                Some(v.remove(0))
            }
        }))
    }

    async fn fetch_recommendation_trend(&self, ticker: &str) -> Result<Option<TrendBlock>> {
        let url = format!("{}/v10/finance/quoteSummary/{ticker}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("modules", "recommendationTrend")])
            .send()
            .await
            .context("quoteSummary request")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status().context("quoteSummary request status")?;
        let envelope: SummaryEnvelope = resp.json().await.context("decoding quoteSummary response")?;
        Ok(envelope
            .quote_summary
            .result
            .and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) })
            .and_then(|m| m.recommendation_trend))
    }
}

fn history_table(data: ChartData) -> DataTable {
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let open = quote.open.unwrap_or_default();
    let high = quote.high.unwrap_or_default();
    let low = quote.low.unwrap_or_default();
    let close = quote.close.unwrap_or_default();
    let volume = quote.volume.unwrap_or_default();

    let num = |v: Option<&Option<f64>>| -> Value {
        match v.copied().flatten() {
            Some(x) => json!(x),
            None => Value::Null,
        }
    };

    let mut rows = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(*ts, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let vol = match volume.get(i).copied().flatten() {
            Some(x) => json!(x),
            None => Value::Null,
        };
        rows.push(TableRow {
            index: Value::String(date),
            cells: vec![
                num(open.get(i)),
                num(high.get(i)),
                num(low.get(i)),
                num(close.get(i)),
                vol,
            ],
        });
    }

    DataTable {
        index_name: "Date".to_string(),
        columns: ["Open", "High", "Low", "Close", "Volume"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    }
}

fn trend_table(block: TrendBlock) -> DataTable {
    let rows = block
        .trend
        .into_iter()
        .map(|r| TableRow {
            index: Value::String(r.period),
            cells: vec![
                json!(r.strong_buy),
                json!(r.buy),
                json!(r.hold),
                json!(r.sell),
                json!(r.strong_sell),
            ],
        })
        .collect();
    DataTable {
        index_name: "period".to_string(),
        columns: ["strongBuy", "buy", "hold", "sell", "strongSell"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceSource {
    async fn lookup(&self, ticker: &str) -> Result<Option<InstrumentInfo>> {
        let Some(data) = self.fetch_chart(ticker, "1d", "1d").await? else {
            return Ok(None);
        };
        Ok(Some(InstrumentInfo {
            symbol: data.meta.symbol.clone(),
            regular_market_price: data.meta.regular_market_price,
            currency: data.meta.currency.clone(),
        }))
    }

    async fn capability(&self, ticker: &str, source_key: &str) -> Result<CapabilityPayload> {
        match source_key {
            "history" => {
                let data = self
                    .fetch_chart(ticker, "1mo", "1d")
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("no chart data for {ticker}"))?;
                Ok(CapabilityPayload::Table(history_table(data)))
            }
            "recommendations" => {
                let block = self
                    .fetch_recommendation_trend(ticker)
                    .await?
                    .unwrap_or(TrendBlock { trend: Vec::new() });
                Ok(CapabilityPayload::Table(trend_table(block)))
            }
            other => anyhow::bail!("unsupported market data capability: {other}"),
        }
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}
