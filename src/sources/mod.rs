// src/sources/mod.rs
//! Source adapters: one per upstream family, each normalizing that
//! source's quirks into a uniform per-endpoint outcome.

pub mod alpha_vantage;
pub mod yahoo;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::registry::{EndpointDescriptor, SourceFamily};

/// Per-endpoint outcome. Upstream failures travel in-band as an error
/// payload; they never abort aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FetchResult {
    Data(Value),
    Error(FetchError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchError {
    pub error: String,
    #[serde(skip_serializing_if = "is_false")]
    pub empty: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FetchResult {
    pub fn data(value: Value) -> Self {
        FetchResult::Data(value)
    }

    pub fn error(message: impl Into<String>) -> Self {
        FetchResult::Error(FetchError {
            error: message.into(),
            empty: false,
        })
    }

    /// Error variant flagged as "nothing upstream", e.g. an empty table.
    pub fn empty_error(message: impl Into<String>) -> Self {
        FetchResult::Error(FetchError {
            error: message.into(),
            empty: true,
        })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FetchResult::Error(_))
    }
}

/// One upstream source family. `fetch` absorbs that source's failures into
/// an in-band `FetchResult`; an `Err` here means the adapter itself broke
/// and the pipeline should skip the endpoint entirely.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, endpoint: &EndpointDescriptor, ticker: &str) -> Result<FetchResult>;

    fn family(&self) -> SourceFamily;
}

/// Dispatch table used by the aggregation pipeline.
pub type AdapterMap = HashMap<SourceFamily, Arc<dyn SourceAdapter>>;
