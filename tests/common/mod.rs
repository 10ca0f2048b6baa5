// tests/common/mod.rs
// Shared doubles for integration tests: a stub market-data source and a
// stub source adapter. The oracle double (`ScriptedOracle`) lives in the
// library itself.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use stock_insight_api::market::{CapabilityPayload, DataTable, InstrumentInfo, MarketDataSource};
use stock_insight_api::oracle::ScriptedOracle;
use stock_insight_api::registry::{EndpointDescriptor, SourceFamily};
use stock_insight_api::resolver::IntentResolver;
use stock_insight_api::sources::{AdapterMap, FetchResult, SourceAdapter};
use stock_insight_api::FinancialDataPipeline;

#[derive(Default)]
pub struct StubMarketData {
    prices: HashMap<String, f64>,
    tables: HashMap<String, DataTable>,
    pub fail_lookup: bool,
    pub lookups: AtomicUsize,
}

impl StubMarketData {
    pub fn with_instrument(symbol: &str, price: f64) -> Self {
        let mut stub = Self::default();
        stub.prices.insert(symbol.to_string(), price);
        stub
    }

    pub fn with_table(mut self, source_key: &str, table: DataTable) -> Self {
        self.tables.insert(source_key.to_string(), table);
        self
    }

    pub fn failing_lookup() -> Self {
        Self {
            fail_lookup: true,
            ..Self::default()
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for StubMarketData {
    async fn lookup(&self, ticker: &str) -> Result<Option<InstrumentInfo>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookup {
            anyhow::bail!("lookup unavailable");
        }
        Ok(self.prices.get(ticker).map(|price| InstrumentInfo {
            symbol: ticker.to_string(),
            regular_market_price: Some(*price),
            currency: Some("USD".to_string()),
        }))
    }

    async fn capability(&self, _ticker: &str, source_key: &str) -> Result<CapabilityPayload> {
        match self.tables.get(source_key) {
            Some(table) => Ok(CapabilityPayload::Table(table.clone())),
            None => anyhow::bail!("no stub capability for {source_key}"),
        }
    }

    fn name(&self) -> &'static str {
        "stub-market"
    }
}

/// Adapter double: canned per-endpoint results, optional hard failures,
/// and a fetch counter so tests can assert "no fetches occurred".
pub struct StubAdapter {
    family: SourceFamily,
    results: HashMap<String, FetchResult>,
    hard_fail: HashSet<String>,
    pub fetches: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub fn new(family: SourceFamily) -> Self {
        Self {
            family,
            results: HashMap::new(),
            hard_fail: HashSet::new(),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_result(mut self, endpoint_name: &str, result: FetchResult) -> Self {
        self.results.insert(endpoint_name.to_string(), result);
        self
    }

    /// Make `fetch` return `Err` for this endpoint, as if the adapter
    /// itself broke rather than the upstream source.
    pub fn with_hard_failure(mut self, endpoint_name: &str) -> Self {
        self.hard_fail.insert(endpoint_name.to_string());
        self
    }

    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        self.fetches.clone()
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    async fn fetch(&self, endpoint: &EndpointDescriptor, _ticker: &str) -> Result<FetchResult> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hard_fail.contains(endpoint.name) {
            anyhow::bail!("stub adapter failure for {}", endpoint.name);
        }
        Ok(self
            .results
            .get(endpoint.name)
            .cloned()
            .unwrap_or_else(|| FetchResult::data(json!({ "stub": endpoint.name }))))
    }

    fn family(&self) -> SourceFamily {
        self.family
    }
}

/// Wire a pipeline from doubles. Callers keep their own clones of the
/// oracle/market Arcs when they need to inspect recorded calls.
pub fn build_pipeline(
    oracle: Arc<ScriptedOracle>,
    market: Arc<StubMarketData>,
    adapters: Vec<StubAdapter>,
) -> FinancialDataPipeline {
    let resolver = IntentResolver::new(oracle, market);
    let mut map: AdapterMap = AdapterMap::new();
    for adapter in adapters {
        map.insert(adapter.family(), Arc::new(adapter));
    }
    FinancialDataPipeline::with_adapters(resolver, map)
}
