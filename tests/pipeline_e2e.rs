// tests/pipeline_e2e.rs
//
// End-to-end pipeline behavior with a scripted oracle and stub sources:
// ticker detection, selection filtering, per-endpoint error isolation,
// and bundle assembly. No network, no live services.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::json;

use common::{build_pipeline, StubAdapter, StubMarketData};
use stock_insight_api::oracle::ScriptedOracle;
use stock_insight_api::registry::SourceFamily;
use stock_insight_api::sources::FetchResult;
use stock_insight_api::ServiceError;

fn default_adapters() -> Vec<StubAdapter> {
    vec![
        StubAdapter::new(SourceFamily::AlphaVantage),
        StubAdapter::new(SourceFamily::Yahoo),
    ]
}

#[tokio::test]
async fn apple_news_question_selects_news_sentiment() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("AAPL")
            .reply("av_news_sentiment")
            .reply("I'll help you with that! Based on your question, we'll look at news."),
    );
    let market = Arc::new(StubMarketData::with_instrument("AAPL", 195.3));
    let pipeline = build_pipeline(oracle.clone(), market, default_adapters());

    let bundle = pipeline
        .process_question("What's Apple's latest news sentiment?")
        .await
        .expect("bundle");

    assert_eq!(bundle.metadata.detected_ticker, "AAPL");
    assert_eq!(
        bundle.metadata.question,
        "What's Apple's latest news sentiment?"
    );
    assert!(bundle
        .metadata
        .explanation
        .starts_with("I'll help you with that!"));
    assert!(bundle.results.contains_key("av_news_sentiment"));
    assert_eq!(bundle.results.len(), 1);

    // Detection and selection run at temperature 0; rationale runs warmer.
    let calls = oracle.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].temperature, 0.0);
    assert_eq!(calls[1].temperature, 0.0);
    assert_eq!(calls[2].temperature, 0.7);
}

#[tokio::test]
async fn unverifiable_ticker_aborts_before_any_fetch() {
    let oracle = Arc::new(ScriptedOracle::new().reply("XXXXX123"));
    let market = Arc::new(StubMarketData::default()); // knows no symbols
    let adapters = default_adapters();
    let counters: Vec<_> = adapters.iter().map(|a| a.fetch_counter()).collect();
    let pipeline = build_pipeline(oracle, market, adapters);

    let err = pipeline
        .process_question("Tell me about an imaginary company")
        .await
        .expect_err("detection must fail");
    assert!(matches!(err, ServiceError::Detection));

    for counter in counters {
        assert_eq!(counter.load(Ordering::SeqCst), 0, "no fetch may run");
    }
}

#[tokio::test]
async fn lookup_errors_count_as_detection_failure() {
    let oracle = Arc::new(ScriptedOracle::new().reply("AAPL"));
    let market = Arc::new(StubMarketData::failing_lookup());
    let pipeline = build_pipeline(oracle, market, default_adapters());

    let err = pipeline.process_question("How is Apple doing?").await;
    assert!(matches!(err, Err(ServiceError::Detection)));
}

#[tokio::test]
async fn oracle_failure_during_selection_is_fatal() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("AAPL")
            .failure("upstream 500 from completion provider"),
    );
    let market = Arc::new(StubMarketData::with_instrument("AAPL", 195.3));
    let pipeline = build_pipeline(oracle, market, default_adapters());

    let err = pipeline.process_question("How is Apple doing?").await;
    assert!(matches!(err, Err(ServiceError::Oracle(_))));
}

#[tokio::test]
async fn hallucinated_endpoint_names_are_dropped_with_warning() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("MSFT")
            .reply("av_crystal_ball, yf_price")
            .reply("I'll help you with that! Based on your question..."),
    );
    let market = Arc::new(StubMarketData::with_instrument("MSFT", 420.0));
    let pipeline = build_pipeline(oracle, market, default_adapters());

    let bundle = pipeline
        .process_question("Where is Microsoft's price heading?")
        .await
        .expect("bundle");

    assert_eq!(bundle.results.len(), 1);
    assert!(bundle.results.contains_key("yf_price"));
    assert!(
        bundle.warnings.iter().any(|w| w.contains("av_crystal_ball")),
        "dropped name should surface in warnings: {:?}",
        bundle.warnings
    );
}

#[tokio::test]
async fn zero_valid_endpoints_still_yields_a_bundle() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("MSFT")
            .reply("definitely_not_registered")
            .reply("I'll help you with that! Based on your question..."),
    );
    let market = Arc::new(StubMarketData::with_instrument("MSFT", 420.0));
    let pipeline = build_pipeline(oracle, market, default_adapters());

    let bundle = pipeline
        .process_question("Anything about Microsoft?")
        .await
        .expect("no data is not an error");
    assert!(bundle.results.is_empty());
    assert_eq!(bundle.metadata.detected_ticker, "MSFT");
}

#[tokio::test]
async fn one_failing_endpoint_does_not_block_the_others() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("AAPL")
            .reply("av_income_statement, yf_price")
            .reply("I'll help you with that! Based on your question..."),
    );
    let market = Arc::new(StubMarketData::with_instrument("AAPL", 195.3));
    let av = StubAdapter::new(SourceFamily::AlphaVantage).with_result(
        "av_income_statement",
        FetchResult::error("Request failed: 500 Internal Server Error"),
    );
    let yf = StubAdapter::new(SourceFamily::Yahoo)
        .with_result("yf_price", FetchResult::data(json!([{"Date": "2024-01-02"}])));
    let pipeline = build_pipeline(oracle, market, vec![av, yf]);

    let bundle = pipeline
        .process_question("Compare Apple's income to its price trend")
        .await
        .expect("bundle");

    // The failed endpoint stays in the bundle with its error nested under `data`.
    let value = serde_json::to_value(&bundle).unwrap();
    assert_eq!(
        value["av_income_statement"]["data"]["error"],
        json!("Request failed: 500 Internal Server Error")
    );
    assert_eq!(value["yf_price"]["data"], json!([{"Date": "2024-01-02"}]));
}

#[tokio::test]
async fn hard_adapter_failure_skips_endpoint_entirely() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("AAPL")
            .reply("av_balance_sheet, yf_price")
            .reply("I'll help you with that! Based on your question..."),
    );
    let market = Arc::new(StubMarketData::with_instrument("AAPL", 195.3));
    let av = StubAdapter::new(SourceFamily::AlphaVantage).with_hard_failure("av_balance_sheet");
    let yf = StubAdapter::new(SourceFamily::Yahoo);
    let pipeline = build_pipeline(oracle, market, vec![av, yf]);

    let bundle = pipeline
        .process_question("Apple balance sheet vs price?")
        .await
        .expect("bundle");

    assert!(!bundle.results.contains_key("av_balance_sheet"));
    assert!(bundle.results.contains_key("yf_price"));
    assert!(bundle
        .warnings
        .iter()
        .any(|w| w.contains("av_balance_sheet")));
}

#[tokio::test]
async fn selection_order_is_preserved_in_the_bundle() {
    let oracle = Arc::new(
        ScriptedOracle::new()
            .reply("AAPL")
            .reply("yf_recommendations, av_news_sentiment, yf_price")
            .reply("I'll help you with that! Based on your question..."),
    );
    let market = Arc::new(StubMarketData::with_instrument("AAPL", 195.3));
    let pipeline = build_pipeline(oracle, market, default_adapters());

    let bundle = pipeline
        .process_question("Broad look at Apple please")
        .await
        .expect("bundle");

    let keys: Vec<&str> = bundle.results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["yf_recommendations", "av_news_sentiment", "yf_price"]);
}

#[tokio::test]
async fn fetch_for_ticker_covers_the_whole_registry() {
    let oracle = Arc::new(ScriptedOracle::new()); // never called on this path
    let market = Arc::new(StubMarketData::default());
    let pipeline = build_pipeline(oracle.clone(), market, default_adapters());

    let results = pipeline.fetch_for_ticker("TSLA", None).await;
    assert_eq!(results.len(), stock_insight_api::registry::all().len());
    assert!(oracle.calls().is_empty(), "no intent resolution on this path");
}

#[tokio::test]
async fn fetch_for_ticker_honors_the_requested_subset() {
    let oracle = Arc::new(ScriptedOracle::new());
    let market = Arc::new(StubMarketData::default());
    let pipeline = build_pipeline(oracle, market, default_adapters());

    let requested = vec!["yf_price".to_string(), "no_such_endpoint".to_string()];
    let results = pipeline.fetch_for_ticker("TSLA", Some(&requested)).await;

    let keys: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["yf_price"]);
}
