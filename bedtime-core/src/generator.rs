//! Text-generation service seam.
//!
//! Everything that talks to a language model goes through [`TextGenerator`],
//! so the engine can run against [`AzureGenerator`] in production and a
//! scripted mock in tests.

use async_trait::async_trait;
use azure::{AzureOpenAi, FinishReason, Message, Request};
use thiserror::Error;

/// Failure talking to the text-generation service.
///
/// Callers treat every variant as an opaque transient failure.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("service error: {0}")]
    Service(#[from] azure::Error),

    #[error("service returned an empty response")]
    Empty,

    #[error("{0}")]
    Other(String),
}

/// What a request is for. Lets a provider route to different deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Summary,
    Story,
    Chapter,
}

/// Sampling parameters sent with a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Sampling {
    /// Summary negotiation: short output.
    pub const SUMMARY: Sampling = Sampling {
        max_tokens: 500,
        temperature: 0.8,
        top_p: 0.95,
    };

    /// Standalone stories and serial chapters.
    pub const NARRATIVE: Sampling = Sampling {
        max_tokens: 1024,
        temperature: 0.8,
        top_p: 0.95,
    };
}

/// A role-tagged message list plus sampling configuration.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub purpose: Purpose,
    pub messages: Vec<Message>,
    pub sampling: Sampling,
}

impl GenerationRequest {
    /// The usual shape: one system instruction followed by one user prompt.
    pub fn new(
        purpose: Purpose,
        system: impl Into<String>,
        user: impl Into<String>,
        sampling: Sampling,
    ) -> Self {
        Self {
            purpose,
            messages: vec![Message::system(system), Message::user(user)],
            sampling,
        }
    }

    /// Content of the last user message.
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == azure::Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

/// A service that turns a [`GenerationRequest`] into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError>;
}

/// [`TextGenerator`] backed by Azure OpenAI chat completions.
#[derive(Clone)]
pub struct AzureGenerator {
    client: AzureOpenAi,
    summary_deployment: Option<String>,
}

impl AzureGenerator {
    pub fn new(client: AzureOpenAi) -> Self {
        Self {
            client,
            summary_deployment: None,
        }
    }

    /// Route summary and standalone requests to a different (usually smaller) deployment.
    pub fn with_summary_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.summary_deployment = Some(deployment.into());
        self
    }

    fn deployment_for(&self, purpose: Purpose) -> Option<&str> {
        match purpose {
            Purpose::Summary | Purpose::Story => self.summary_deployment.as_deref(),
            Purpose::Chapter => None,
        }
    }
}

#[async_trait]
impl TextGenerator for AzureGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GeneratorError> {
        let mut api_request = Request::new(request.messages)
            .with_max_tokens(request.sampling.max_tokens)
            .with_temperature(request.sampling.temperature)
            .with_top_p(request.sampling.top_p);

        if let Some(deployment) = self.deployment_for(request.purpose) {
            api_request = api_request.with_deployment(deployment);
        }

        let response = self.client.complete(api_request).await?;
        tracing::debug!(
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            "completion received"
        );
        if response.is_truncated() {
            tracing::warn!(purpose = ?request.purpose, "completion cut off at the token limit");
        } else if response.finish_reason == FinishReason::ContentFilter {
            tracing::warn!(purpose = ?request.purpose, "completion stopped by the content filter");
        }

        let text = response.text();
        if text.is_empty() {
            return Err(GeneratorError::Empty);
        }
        Ok(text.to_string())
    }
}
