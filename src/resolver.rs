// src/resolver.rs
//! Intent resolution: map a free-text question to a verified ticker and a
//! small ordered subset of the endpoint registry, plus a conversational
//! rationale. All language understanding is delegated to the completion
//! oracle; this module owns the prompts, the parsing, and the market-data
//! verification step.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::market::MarketDataSource;
use crate::oracle::{CompletionOracle, ModelTier};
use crate::registry::{self, EndpointDescriptor};

/// At most this many descriptors survive selection, whatever the oracle says.
pub const MAX_SELECTED_ENDPOINTS: usize = 3;

/// Result of endpoint selection. `endpoints` keeps the order the oracle
/// named them in; `dropped` records names that matched nothing in the
/// registry and were silently excluded.
#[derive(Debug, Clone)]
pub struct EndpointSelection {
    pub endpoints: Vec<&'static EndpointDescriptor>,
    pub rationale: String,
    pub dropped: Vec<String>,
}

pub struct IntentResolver {
    oracle: Arc<dyn CompletionOracle>,
    market: Arc<dyn MarketDataSource>,
}

// Cheap shape check before the market lookup; replies that cannot be a
// symbol fail verification without a network round-trip.
fn looks_like_ticker(symbol: &str) -> bool {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9.\-]{0,9}$").unwrap());
    re.is_match(symbol)
}

impl IntentResolver {
    pub fn new(oracle: Arc<dyn CompletionOracle>, market: Arc<dyn MarketDataSource>) -> Self {
        Self { oracle, market }
    }

    /// Extract the ticker the question is about and verify it resolves to
    /// an instrument with a live market price. `Ok(None)` means no
    /// verifiable ticker; callers abort the pipeline on it.
    pub async fn detect_ticker(&self, question: &str) -> Result<Option<String>, ServiceError> {
        let prompt = format!(
            "Extract the stock ticker symbol from this question. If multiple companies are \
             mentioned, identify the main one being asked about. If no specific ticker is \
             mentioned but a company name is, provide its ticker. Only return the ticker \
             symbol in capital letters, nothing else.\n\nQuestion: \"{question}\"\n"
        );

        let reply = self
            .oracle
            .complete(&prompt, 10, 0.0, ModelTier::Standard)
            .await
            .map_err(ServiceError::Oracle)?;
        let ticker = reply.trim().to_string();

        if !looks_like_ticker(&ticker) {
            warn!(id = %crate::anon_hash(question), "oracle reply is not a plausible ticker");
            return Ok(None);
        }

        match self.market.lookup(&ticker).await {
            Ok(Some(info)) if info.has_live_price() => {
                info!(ticker = %ticker, "detected ticker");
                Ok(Some(ticker))
            }
            Ok(_) => {
                warn!(ticker = %ticker, "ticker failed market verification");
                Ok(None)
            }
            Err(e) => {
                warn!(ticker = %ticker, error = ?e, "ticker verification lookup errored");
                Ok(None)
            }
        }
    }

    /// Pick the 1–3 registry entries most relevant to the question. Names
    /// the oracle invents are dropped, not errors; a failed rationale call
    /// degrades to an empty string and never blocks the selection.
    pub async fn select_endpoints(&self, question: &str) -> Result<EndpointSelection, ServiceError> {
        let listing = registry::all()
            .iter()
            .map(|e| format!("- {}: {} (Category: {})", e.name, e.description, e.category.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "Given the following financial data API endpoints:\n\n{listing}\n\nAnd this user \
             question: \"{question}\"\n\nSelect between 1~3 most relevant API endpoints to \
             answer this question effectively. If only one endpoint is relevant, you can select \
             just that one.\nReturn only the endpoint names in a comma-separated list, no \
             explanation needed."
        );

        let reply = self
            .oracle
            .complete(&prompt, 50, 0.0, ModelTier::Standard)
            .await
            .map_err(ServiceError::Oracle)?;

        let raw_names: Vec<String> = reply
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut endpoints: Vec<&'static EndpointDescriptor> = Vec::new();
        let mut dropped = Vec::new();
        for name in &raw_names {
            match registry::find(name) {
                Some(e) if endpoints.iter().any(|kept| kept.name == e.name) => {}
                Some(e) => endpoints.push(e),
                None => {
                    warn!(name = %name, "selected endpoint not in registry; dropping");
                    dropped.push(name.clone());
                }
            }
        }
        endpoints.truncate(MAX_SELECTED_ENDPOINTS);

        // Rationale is best-effort: the selection must survive its failure.
        let rationale = match self.rationale(question, &raw_names).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = ?e, "rationale generation failed; continuing without one");
                String::new()
            }
        };

        Ok(EndpointSelection {
            endpoints,
            rationale,
            dropped,
        })
    }

    async fn rationale(&self, question: &str, raw_names: &[String]) -> anyhow::Result<String> {
        let prompt = format!(
            "Based on the question: \"{question}\"\n\nI've selected the following data sources \
             to help answer this question:\n{}\n\nGenerate a brief, friendly explanation for \
             why these data sources were chosen. Start with \"I'll help you with that! Based on \
             your question...\" and explain what kind of data we'll be retrieving from each \
             source. Keep it conversational and clear.",
            raw_names.join(", ")
        );
        let reply = self
            .oracle
            .complete(&prompt, 200, 0.7, ModelTier::Standard)
            .await?;
        Ok(reply.trim().to_string())
    }
}
