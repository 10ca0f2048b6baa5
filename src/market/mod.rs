// src/market/mod.rs
//! Market-data collaborator interface: instrument lookup (used to verify
//! detected tickers) plus capability calls keyed by the registry's
//! `source_key`. Capabilities return either a tabular result or an opaque
//! JSON value; shaping both into the wire format is the adapter's job.

pub mod yahoo;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Minimal instrument snapshot. Verification only needs to know a live
/// market price exists.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentInfo {
    pub symbol: String,
    pub regular_market_price: Option<f64>,
    pub currency: Option<String>,
}

impl InstrumentInfo {
    pub fn has_live_price(&self) -> bool {
        self.regular_market_price.is_some()
    }
}

/// A DataFrame-like payload: named columns, ordered rows, and a labeled
/// index column carried separately from the cells.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub index: Value,
    pub cells: Vec<Value>,
}

impl DataTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// What a capability call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityPayload {
    Table(DataTable),
    Value(Value),
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Resolve a ticker to an instrument, `Ok(None)` when unknown.
    async fn lookup(&self, ticker: &str) -> Result<Option<InstrumentInfo>>;

    /// Invoke a capability (`history`, `recommendations`, ...) for a ticker.
    async fn capability(&self, ticker: &str, source_key: &str) -> Result<CapabilityPayload>;

    fn name(&self) -> &'static str;
}
