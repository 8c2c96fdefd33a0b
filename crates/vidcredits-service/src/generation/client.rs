//! Generation provider client implementation.

use std::time::Duration;

use reqwest::Client;

use vidcredits_core::GenerationOutcome;

use super::types::{ChatMessage, ChatRequest, ChatResponse};

/// Instructions sent ahead of every user prompt.
const SYSTEM_PROMPT: &str = "Generate high-quality, cinematic videos based on user descriptions. \
Focus on visual storytelling, smooth transitions, and professional production quality.";

/// Error type for generation calls.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

/// Client for the chat-completions generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    customer_id: Option<String>,
}

impl GenerationClient {
    /// Create a new client. Every call is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        customer_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            customer_id,
        })
    }

    /// Request a video and classify the provider's answer.
    ///
    /// Transport failures, timeouts and non-2xx responses become
    /// [`GenerationOutcome::ProviderError`]. A 2xx body that does not decode
    /// or carries no usable URL is [`GenerationOutcome::Malformed`]. This
    /// never returns early.
    pub async fn generate(&self, prompt: &str, duration_seconds: u32) -> GenerationOutcome {
        match self.complete(prompt, duration_seconds).await {
            Ok(body) => classify_body(&body, duration_seconds),
            Err(e) => {
                tracing::warn!(error = %e, "Generation provider call failed");
                GenerationOutcome::ProviderError(e.to_string())
            }
        }
    }

    async fn complete(
        &self,
        prompt: &str,
        duration_seconds: u32,
    ) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(build_prompt(prompt, duration_seconds)),
            }],
        };

        tracing::debug!(
            model = %self.model,
            duration_seconds = %duration_seconds,
            "Calling generation provider"
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        if let Some(customer_id) = &self.customer_id {
            request = request.header("CustomerId", customer_id);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(response.text().await?)
    }
}

/// Classify a successful response body.
fn classify_body(body: &str, duration_seconds: u32) -> GenerationOutcome {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(response) => GenerationOutcome::from_content(response.first_content(), duration_seconds),
        Err(e) => {
            tracing::warn!(error = %e, "Generation provider returned an undecodable body");
            GenerationOutcome::Malformed(format!("undecodable provider response: {e}"))
        }
    }
}

/// Compose the message sent to the provider.
#[must_use]
pub fn build_prompt(prompt: &str, duration_seconds: u32) -> String {
    format!("{SYSTEM_PROMPT} Duration: {duration_seconds} seconds.\n\nUser Request: {prompt}")
}
