//! Stock Insight API — Binary Entrypoint
//! Boots the Axum HTTP server, wiring configuration, shared state, and middleware.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stock_insight_api::config::AppConfig;
use stock_insight_api::market::yahoo::YahooFinanceSource;
use stock_insight_api::market::MarketDataSource;
use stock_insight_api::metrics::Metrics;
use stock_insight_api::oracle::{CompletionOracle, OpenAiOracle};
use stock_insight_api::summarizer::Summarizer;
use stock_insight_api::{api, AppState, FinancialDataPipeline};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - STOCK_INSIGHT_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("STOCK_INSIGHT_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stock_insight_api=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = AppConfig::from_env().expect("Failed to load service configuration");

    let oracle: Arc<dyn CompletionOracle> = Arc::new(OpenAiOracle::new(&config));
    let market: Arc<dyn MarketDataSource> = Arc::new(YahooFinanceSource::new(&config));

    let pipeline = FinancialDataPipeline::new(oracle.clone(), market, &config);
    let summarizer = Summarizer::new(oracle);

    let metrics = Metrics::init();

    let state = AppState {
        pipeline: Arc::new(pipeline),
        summarizer: Arc::new(summarizer),
    };
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
