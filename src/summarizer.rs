// src/summarizer.rs
//! Secondary capability: turn pre-computed analysis summaries into one
//! natural-language answer. Independent of the aggregation pipeline — it
//! consumes the frontend's summaries, not raw fetch output.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::error::ServiceError;
use crate::oracle::{CompletionOracle, ModelTier};

pub struct Summarizer {
    oracle: Arc<dyn CompletionOracle>,
}

impl Summarizer {
    pub fn new(oracle: Arc<dyn CompletionOracle>) -> Self {
        Self { oracle }
    }

    /// One premium-tier completion embedding the question and the
    /// serialized summaries. Oracle failures propagate; there is no
    /// degraded fallback for the summary itself.
    pub async fn summarize(&self, question: &str, summaries: &Value) -> Result<String, ServiceError> {
        let serialized = serde_json::to_string_pretty(summaries)
            .map_err(|e| ServiceError::Oracle(anyhow::Error::new(e).context("serializing summaries")))?;

        let prompt = format!(
            "Given a user's question about a stock and the analyzed data, provide a \
             comprehensive answer.\n\nOriginal Question: \"{question}\"\n\nAvailable Data \
             Summaries:\n{serialized}\n\nAnalyze the data and provide a clear, comprehensive \
             answer that:\n1. Directly addresses the user's question\n2. Highlights key \
             insights from each type of analysis\n3. Notes any significant patterns or \
             trends\n4. Provides context for the numbers\n5. Concludes with actionable \
             insights or key takeaways\n\nKeep the tone professional but conversational. \
             Structure the response clearly using bullet points or paragraphs as needed. If \
             the data presented is self explanatory, be concise in your response."
        );

        let reply = self
            .oracle
            .complete(&prompt, 1000, 0.7, ModelTier::Premium)
            .await
            .map_err(ServiceError::Oracle)?;

        info!(id = %crate::anon_hash(question), "generated summary");
        Ok(reply.trim().to_string())
    }
}
