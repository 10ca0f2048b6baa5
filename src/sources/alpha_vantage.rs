// src/sources/alpha_vantage.rs
//! Fundamentals/news adapter: one parameterized query URL, `function`
//! codes from the registry, and two error-indicator keys in otherwise
//! healthy JSON bodies. Successful payloads pass through unreshaped.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::AppConfig;
use crate::registry::{EndpointDescriptor, SourceFamily};
use crate::sources::{FetchResult, SourceAdapter};

pub struct AlphaVantageAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageAdapter {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("stock-insight-api/0.1")
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url: config.alpha_vantage_base_url.clone(),
            api_key: config.alpha_vantage_api_key.clone(),
        }
    }
}

/// Share-class tickers use "." on the market side but "-" upstream
/// ("BRK.B" -> "BRK-B").
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.replace('.', "-")
}

/// Query parameters for an endpoint, auth key excluded. The news/sentiment
/// function takes plural `tickers` plus a fixed sort order and result cap;
/// everything else is `function` + `symbol`.
pub(crate) fn query_params(
    endpoint: &EndpointDescriptor,
    ticker: &str,
) -> Vec<(&'static str, String)> {
    let symbol = normalize_ticker(ticker);
    if endpoint.source_key == "NEWS_SENTIMENT" {
        vec![
            ("function", endpoint.source_key.to_string()),
            ("tickers", symbol),
            ("sort", "LATEST".to_string()),
            ("limit", "50".to_string()),
        ]
    } else {
        vec![
            ("function", endpoint.source_key.to_string()),
            ("symbol", symbol),
        ]
    }
}

/// Interpret a response body: JSON with an error-indicator key becomes an
/// in-band error, unparseable bodies become an in-band error, anything
/// else is passed through as-is.
pub(crate) fn interpret_body(body: &str) -> FetchResult {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => return FetchResult::error(format!("Invalid JSON response: {e}")),
    };

    for key in ["Error Message", "Information"] {
        if let Some(found) = value.get(key) {
            let message = found
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| found.to_string());
            return FetchResult::error(message);
        }
    }

    FetchResult::data(value)
}

#[async_trait]
impl SourceAdapter for AlphaVantageAdapter {
    async fn fetch(&self, endpoint: &EndpointDescriptor, ticker: &str) -> Result<FetchResult> {
        let params = query_params(endpoint, ticker);
        debug!(endpoint = endpoint.name, "fetching Alpha Vantage data");

        let resp = match self
            .http
            .get(&self.base_url)
            .query(&params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(FetchResult::error(format!("Request failed: {e}"))),
        };

        if let Err(e) = resp.error_for_status_ref() {
            return Ok(FetchResult::error(format!("Request failed: {e}")));
        }

        match resp.text().await {
            Ok(body) => Ok(interpret_body(&body)),
            Err(e) => Ok(FetchResult::error(format!("Request failed: {e}"))),
        }
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::AlphaVantage
    }
}
