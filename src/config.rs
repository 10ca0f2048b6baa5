// src/config.rs
//! Process-wide configuration, built once at startup and passed to the
//! components that need it. No ambient env lookups inside the pipeline.

use std::env;

use anyhow::Result;

pub const DEFAULT_STANDARD_MODEL: &str = "gpt-4o";
pub const DEFAULT_PREMIUM_MODEL: &str = "gpt-4";
pub const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub alpha_vantage_api_key: String,
    pub openai_api_key: String,
    /// Model used for ticker detection, endpoint selection, and rationale.
    pub standard_model: String,
    /// Higher-capability model used by the summarizer.
    pub premium_model: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Overridable upstream bases so tests never hit the live services.
    pub alpha_vantage_base_url: String,
    pub yahoo_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            alpha_vantage_api_key: String::new(),
            openai_api_key: String::new(),
            standard_model: DEFAULT_STANDARD_MODEL.to_string(),
            premium_model: DEFAULT_PREMIUM_MODEL.to_string(),
            connect_timeout_secs: 4,
            request_timeout_secs: 10,
            alpha_vantage_base_url: DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string(),
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the environment. The two API keys are
    /// required; everything else falls back to defaults. Call
    /// `dotenvy::dotenv()` first when running locally.
    pub fn from_env() -> Result<Self> {
        let alpha_vantage_api_key = env::var("ALPHAVANTAGE_API_KEY")
            .map_err(|_| anyhow::anyhow!("Missing ALPHAVANTAGE_API_KEY env var"))?;
        let openai_api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?;

        let defaults = AppConfig::default();
        Ok(Self {
            alpha_vantage_api_key,
            openai_api_key,
            standard_model: env_or("OPENAI_MODEL", defaults.standard_model),
            premium_model: env_or("OPENAI_PREMIUM_MODEL", defaults.premium_model),
            connect_timeout_secs: env_secs("HTTP_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            request_timeout_secs: env_secs("HTTP_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            alpha_vantage_base_url: env_or("ALPHAVANTAGE_BASE_URL", defaults.alpha_vantage_base_url),
            yahoo_base_url: env_or("YAHOO_BASE_URL", defaults.yahoo_base_url),
        })
    }
}

fn env_or(name: &str, default: String) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

// Unparseable or zero values fall back to the default.
fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
