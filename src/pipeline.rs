// src/pipeline.rs
//! Aggregation pipeline: intent resolution fans out to source adapters,
//! per-endpoint failures are contained, and everything lands in a single
//! result bundle with metadata. Fetches run strictly sequentially; the
//! bundle is keyed by endpoint name in selection order.

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::market::MarketDataSource;
use crate::oracle::CompletionOracle;
use crate::registry::{self, DataCategory, EndpointDescriptor};
use crate::resolver::IntentResolver;
use crate::sources::alpha_vantage::AlphaVantageAdapter;
use crate::sources::yahoo::YahooFinanceAdapter;
use crate::sources::{AdapterMap, FetchResult, SourceAdapter};

/// Defensive cap on fetches per question, over and above the selection bound.
const MAX_ENDPOINTS_PER_QUESTION: usize = 6;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_questions_total", "Questions entering the pipeline.");
        describe_counter!(
            "pipeline_detection_failures_total",
            "Questions with no verifiable ticker."
        );
        describe_counter!(
            "pipeline_endpoint_skips_total",
            "Endpoints skipped because an adapter failed outright."
        );
        describe_counter!(
            "source_fetch_errors_total",
            "Fetches that produced an in-band error payload."
        );
        describe_histogram!("source_fetch_ms", "Per-endpoint fetch time in milliseconds.");
    });
}

#[derive(Debug, Clone, Serialize)]
pub struct BundleMetadata {
    pub question: String,
    pub detected_ticker: String,
    pub timestamp: String,
    pub explanation: String,
}

/// One endpoint's slot in the bundle. `data` is exactly the adapter's
/// outcome; error payloads stay nested here rather than being unwrapped.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSection {
    pub data: FetchResult,
    pub category: DataCategory,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultBundle {
    pub metadata: BundleMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub results: IndexMap<String, EndpointSection>,
}

pub struct FinancialDataPipeline {
    resolver: IntentResolver,
    adapters: AdapterMap,
}

impl FinancialDataPipeline {
    /// Production wiring: live adapters for both source families.
    pub fn new(
        oracle: Arc<dyn CompletionOracle>,
        market: Arc<dyn MarketDataSource>,
        config: &AppConfig,
    ) -> Self {
        let mut adapters: AdapterMap = AdapterMap::new();
        let av = Arc::new(AlphaVantageAdapter::new(config));
        adapters.insert(av.family(), av);
        let yf = Arc::new(YahooFinanceAdapter::new(market.clone()));
        adapters.insert(yf.family(), yf);

        Self {
            resolver: IntentResolver::new(oracle, market),
            adapters,
        }
    }

    /// Assemble from pre-built parts. Tests use this to swap in stub
    /// adapters while keeping the pipeline's own behavior under test.
    pub fn with_adapters(resolver: IntentResolver, adapters: AdapterMap) -> Self {
        Self { resolver, adapters }
    }

    /// Full question path: detect ticker (fatal if unverifiable), select
    /// endpoints once, fetch each in selection order with per-endpoint
    /// error isolation, and return the assembled bundle.
    pub async fn process_question(&self, question: &str) -> Result<ResultBundle, ServiceError> {
        ensure_metrics_described();
        counter!("pipeline_questions_total").increment(1);
        info!(id = %crate::anon_hash(question), "processing question");

        let Some(ticker) = self.resolver.detect_ticker(question).await? else {
            counter!("pipeline_detection_failures_total").increment(1);
            return Err(ServiceError::Detection);
        };

        let selection = self.resolver.select_endpoints(question).await?;
        let mut warnings: Vec<String> = selection
            .dropped
            .iter()
            .map(|name| format!("selected endpoint '{name}' is not in the registry"))
            .collect();

        let metadata = BundleMetadata {
            question: question.to_string(),
            detected_ticker: ticker.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            explanation: selection.rationale,
        };

        let mut results = IndexMap::new();
        for endpoint in selection.endpoints.iter().take(MAX_ENDPOINTS_PER_QUESTION) {
            match self.dispatch(endpoint, &ticker).await {
                Ok(outcome) => {
                    results.insert(endpoint.name.to_string(), section(endpoint, outcome));
                }
                Err(e) => {
                    warn!(endpoint = endpoint.name, error = ?e, "skipping endpoint");
                    counter!("pipeline_endpoint_skips_total").increment(1);
                    warnings.push(format!("endpoint '{}' skipped: {e}", endpoint.name));
                }
            }
        }

        Ok(ResultBundle {
            metadata,
            warnings,
            results,
        })
    }

    /// Direct path for callers that already know the ticker: iterate the
    /// whole registry (or the requested subset), no cap, no detection.
    pub async fn fetch_for_ticker(
        &self,
        ticker: &str,
        requested: Option<&[String]>,
    ) -> IndexMap<String, EndpointSection> {
        ensure_metrics_described();

        let mut results = IndexMap::new();
        for endpoint in registry::all() {
            if let Some(names) = requested {
                if !names.iter().any(|n| n == endpoint.name) {
                    continue;
                }
            }
            match self.dispatch(endpoint, ticker).await {
                Ok(outcome) => {
                    results.insert(endpoint.name.to_string(), section(endpoint, outcome));
                }
                Err(e) => {
                    warn!(endpoint = endpoint.name, error = ?e, "skipping endpoint");
                    counter!("pipeline_endpoint_skips_total").increment(1);
                }
            }
        }
        results
    }

    async fn dispatch(
        &self,
        endpoint: &EndpointDescriptor,
        ticker: &str,
    ) -> anyhow::Result<FetchResult> {
        let adapter = self.adapters.get(&endpoint.family).ok_or_else(|| {
            anyhow::anyhow!("no adapter registered for source family {:?}", endpoint.family)
        })?;

        let t0 = Instant::now();
        let outcome = adapter.fetch(endpoint, ticker).await;
        histogram!("source_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if let Ok(result) = &outcome {
            if result.is_error() {
                counter!("source_fetch_errors_total").increment(1);
            }
        }
        outcome
    }
}

fn section(endpoint: &EndpointDescriptor, data: FetchResult) -> EndpointSection {
    EndpointSection {
        data,
        category: endpoint.category,
        description: endpoint.description,
    }
}

/// Registry dump for the transport's `/available-endpoints`.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    pub name: &'static str,
    pub category: DataCategory,
    pub description: &'static str,
}

pub fn list_available_endpoints() -> Vec<EndpointInfo> {
    registry::all()
        .iter()
        .map(|e| EndpointInfo {
            name: e.name,
            category: e.category,
            description: e.description,
        })
        .collect()
}
