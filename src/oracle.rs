// src/oracle.rs
//! Completion oracle: the narrow seam through which all language
//! understanding flows. The pipeline only ever sees the trait; the OpenAI
//! client below is the production implementation and `ScriptedOracle` is
//! the deterministic double used by tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// Which model a call should run on. `Standard` covers detection,
/// selection, and rationale; `Premium` is reserved for summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Standard,
    Premium,
}

#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// One prompt in, trimmed plain text out.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        tier: ModelTier,
    ) -> Result<String>;

    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider (Chat Completions API).
pub struct OpenAiOracle {
    http: reqwest::Client,
    api_key: String,
    standard_model: String,
    premium_model: String,
}

impl OpenAiOracle {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("stock-insight-api/0.1")
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: config.openai_api_key.clone(),
            standard_model: config.standard_model.clone(),
            premium_model: config.premium_model.clone(),
        }
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.standard_model,
            ModelTier::Premium => &self.premium_model,
        }
    }
}

#[async_trait]
impl CompletionOracle for OpenAiOracle {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        tier: ModelTier,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        anyhow::ensure!(!self.api_key.is_empty(), "OpenAI API key is not configured");

        let req = Req {
            model: self.model_for(tier),
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let resp = self
            .http
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("sending completion request")?;

        let status = resp.status();
        anyhow::ensure!(
            status.is_success(),
            "completion endpoint returned status {status}"
        );

        let body: Resp = resp.json().await.context("decoding completion response")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.trim())
            .unwrap_or_default();
        anyhow::ensure!(!content.is_empty(), "completion response had no content");
        Ok(content.to_string())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// One recorded oracle invocation, for assertions in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub tier: ModelTier,
}

/// Deterministic oracle for tests: replays queued replies in order and
/// records every call it receives. An exhausted script is an error, so a
/// test that triggers an unexpected extra call fails loudly.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .expect("poisoned script")
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .expect("poisoned script")
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("poisoned call log").clone()
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        tier: ModelTier,
    ) -> Result<String> {
        self.calls.lock().expect("poisoned call log").push(RecordedCall {
            prompt: prompt.to_string(),
            max_tokens,
            temperature,
            tier,
        });
        match self.replies.lock().expect("poisoned script").pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("scripted oracle exhausted")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
