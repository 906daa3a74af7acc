// AI implementation over any OpenAI-compatible chat completions endpoint
//
// This is the infrastructure implementation of BaseAI.
// Business logic (what to prompt for) lives in domain layers.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use openai_client::OpenAIClient;

use super::BaseAI;
use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// `BaseAI` backed by `openai-client`, defaulting to Gemini's endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiCompatible {
    client: OpenAIClient,
    model: String,
}

impl OpenAiCompatible {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OpenAIClient::new(config.llm_api_key()?)
            .with_base_url(&config.llm_base_url)
            .with_timeout(REQUEST_TIMEOUT)
            .context("Failed to build LLM client")?;
        Ok(Self::new(client, &config.llm_model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl BaseAI for OpenAiCompatible {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        match self.client.complete(&self.model, system, user).await {
            Ok(text) => Ok(text),
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, model = %self.model, "Transient LLM error, retrying once");
                tokio::time::sleep(RETRY_DELAY).await;
                self.client
                    .complete(&self.model, system, user)
                    .await
                    .context("LLM completion failed after retry")
            }
            Err(e) => Err(e).context("LLM completion failed"),
        }
    }
}
