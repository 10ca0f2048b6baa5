// src/registry.rs
//! Static catalog of the data capabilities the pipeline can fetch.
//! Configuration data, not logic — but every other component depends on its
//! exact contents and order, so it lives in one place with a stable API.

use serde::Serialize;

/// Broad category of the data an endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    Price,
    News,
    Fundamentals,
    Technical,
    Sentiment,
    FinancialStatements,
    InsiderTrading,
    CompanyProfile,
    Visualization,
    SecFilings,
    Esg,
}

impl DataCategory {
    /// Wire/prompt label, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Price => "price",
            DataCategory::News => "news",
            DataCategory::Fundamentals => "fundamentals",
            DataCategory::Technical => "technical",
            DataCategory::Sentiment => "sentiment",
            DataCategory::FinancialStatements => "financial_statements",
            DataCategory::InsiderTrading => "insider_trading",
            DataCategory::CompanyProfile => "company_profile",
            DataCategory::Visualization => "visualization",
            DataCategory::SecFilings => "sec_filings",
            DataCategory::Esg => "esg",
        }
    }
}

/// Upstream source family an endpoint is served by. The aggregation
/// pipeline routes each fetch through a lookup table keyed by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFamily {
    AlphaVantage,
    Yahoo,
}

/// One fetchable capability. `source_key` is the operation identifier
/// inside its source family: an Alpha Vantage `function` code, or a
/// market-data capability name.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub category: DataCategory,
    pub description: &'static str,
    pub source_key: &'static str,
    pub family: SourceFamily,
}

pub static AVAILABLE_ENDPOINTS: [EndpointDescriptor; 7] = [
    EndpointDescriptor {
        name: "av_news_sentiment",
        category: DataCategory::News,
        description: "Get latest news and sentiment analysis for specific tickers",
        source_key: "NEWS_SENTIMENT",
        family: SourceFamily::AlphaVantage,
    },
    EndpointDescriptor {
        name: "av_income_statement",
        category: DataCategory::FinancialStatements,
        description: "Get annual and quarterly income statements",
        source_key: "INCOME_STATEMENT",
        family: SourceFamily::AlphaVantage,
    },
    EndpointDescriptor {
        name: "av_balance_sheet",
        category: DataCategory::FinancialStatements,
        description: "Get annual and quarterly balance sheets",
        source_key: "BALANCE_SHEET",
        family: SourceFamily::AlphaVantage,
    },
    EndpointDescriptor {
        name: "yf_price",
        category: DataCategory::Price,
        description: "Get real-time and historical price data",
        source_key: "history",
        family: SourceFamily::Yahoo,
    },
    EndpointDescriptor {
        name: "yf_recommendations",
        category: DataCategory::Sentiment,
        description: "Get analyst recommendations",
        source_key: "recommendations",
        family: SourceFamily::Yahoo,
    },
    EndpointDescriptor {
        name: "av_insider_transactions",
        category: DataCategory::InsiderTrading,
        description: "Get latest insider transactions by key stakeholders",
        source_key: "INSIDER_TRANSACTIONS",
        family: SourceFamily::AlphaVantage,
    },
    EndpointDescriptor {
        name: "yf_stock_graph",
        category: DataCategory::Visualization,
        description: "Get basic stock price chart data",
        source_key: "history",
        family: SourceFamily::Yahoo,
    },
];

/// All registered endpoints, in fixed catalog order.
pub fn all() -> &'static [EndpointDescriptor] {
    &AVAILABLE_ENDPOINTS
}

/// Exact-name lookup.
pub fn find(name: &str) -> Option<&'static EndpointDescriptor> {
    AVAILABLE_ENDPOINTS.iter().find(|e| e.name == name)
}
