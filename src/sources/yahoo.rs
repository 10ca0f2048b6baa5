// src/sources/yahoo.rs
//! Market-data adapter. Dispatches on the registry `source_key`:
//! recommendation trends are reshaped into parallel arrays, other tabular
//! results are flattened into row-records with the index materialized as a
//! field, scalar results pass through. Every source failure is absorbed
//! into an in-band `{error, empty}` result.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::market::{CapabilityPayload, DataTable, MarketDataSource};
use crate::registry::{EndpointDescriptor, SourceFamily};
use crate::sources::{FetchResult, SourceAdapter};

const RECOMMENDATION_BUCKETS: [&str; 5] = ["strongBuy", "buy", "hold", "sell", "strongSell"];

pub struct YahooFinanceAdapter {
    source: Arc<dyn MarketDataSource>,
}

impl YahooFinanceAdapter {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }
}

fn index_label(index: &Value) -> String {
    match index {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reshape a recommendation-trend table into parallel arrays keyed by
/// column name: period labels plus the five rating buckets, row order
/// preserved.
pub(crate) fn reshape_recommendations(table: &DataTable) -> FetchResult {
    let mut out = Map::new();
    out.insert(
        "period".to_string(),
        Value::Array(
            table
                .rows
                .iter()
                .map(|r| Value::String(index_label(&r.index)))
                .collect(),
        ),
    );

    for bucket in RECOMMENDATION_BUCKETS {
        let Some(col) = table.column(bucket) else {
            return FetchResult::empty_error(format!(
                "Failed to fetch recommendations: missing column {bucket}"
            ));
        };
        let series = table
            .rows
            .iter()
            .map(|r| r.cells.get(col).cloned().unwrap_or(Value::Null))
            .collect();
        out.insert(bucket.to_string(), Value::Array(series));
    }

    FetchResult::data(Value::Object(out))
}

/// Flatten a table into an ordered sequence of row-records, index column
/// included as a regular field.
pub(crate) fn flatten_table(table: &DataTable) -> Value {
    let records = table
        .rows
        .iter()
        .map(|row| {
            let mut record = Map::new();
            record.insert(table.index_name.clone(), row.index.clone());
            for (col, cell) in table.columns.iter().zip(row.cells.iter()) {
                record.insert(col.clone(), cell.clone());
            }
            Value::Object(record)
        })
        .collect();
    Value::Array(records)
}

#[async_trait]
impl SourceAdapter for YahooFinanceAdapter {
    async fn fetch(&self, endpoint: &EndpointDescriptor, ticker: &str) -> Result<FetchResult> {
        debug!(endpoint = endpoint.name, "fetching market data");

        if endpoint.source_key == "recommendations" {
            return Ok(match self.source.capability(ticker, endpoint.source_key).await {
                Ok(CapabilityPayload::Table(table)) if !table.is_empty() => {
                    reshape_recommendations(&table)
                }
                Ok(_) => FetchResult::empty_error("No recommendations data available"),
                Err(e) => FetchResult::empty_error(format!("Failed to fetch recommendations: {e}")),
            });
        }

        Ok(match self.source.capability(ticker, endpoint.source_key).await {
            Ok(CapabilityPayload::Table(table)) => FetchResult::data(flatten_table(&table)),
            Ok(CapabilityPayload::Value(value)) => FetchResult::data(value),
            Err(e) => FetchResult::empty_error(format!("Failed to fetch data: {e}")),
        })
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::Yahoo
    }
}
