use std::time::Duration;

use async_trait::async_trait;
use civiqa_models::AgentConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AgentError;

/// Text-in/text-out language model driving the answer loop. Mockable for
/// testing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError>;

    fn model_name(&self) -> &str;
}

/// Connection settings for the Gemini HTTP provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: String,
    pub base_url: String,
    /// Environment variable the API key is read from at construction.
    pub api_key_env: String,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro-latest".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    pub fn from_agent(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            api_key_env: config.api_key_env.clone(),
            timeout: Duration::from_secs(config.llm_timeout_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn single_turn(text: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Concatenated text of the first candidate. Empty candidate lists happen
/// when the provider filters the response; those surface as
/// [`AgentError::EmptyResponse`] rather than an empty answer.
fn first_candidate_text(response: GenerateResponse) -> Result<String, AgentError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(AgentError::EmptyResponse)?;
    let text: String = candidate
        .content
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect();
    if text.trim().is_empty() {
        return Err(AgentError::EmptyResponse);
    }
    Ok(text)
}

/// Language model backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug)]
pub struct GeminiHttp {
    client: reqwest::Client,
    config: GeminiConfig,
    api_key: String,
}

impl GeminiHttp {
    /// Reads the API key from the configured environment variable.
    pub fn new(config: GeminiConfig) -> Result<Self, AgentError> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AgentError::Provider(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiHttp {
    async fn generate(&self, prompt: &str) -> Result<String, AgentError> {
        debug!(model = %self.config.model, prompt_len = prompt.len(), "Calling Gemini");

        let request = GenerateRequest::single_turn(prompt);
        let response = tokio::time::timeout(self.config.timeout, async {
            self.client
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
        })
        .await
        .map_err(|_| AgentError::Timeout(self.config.timeout.as_secs()))?
        .map_err(|e| AgentError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            warn!(%status, "Gemini API returned error status");
            return Err(AgentError::Provider(format!("HTTP {status}: {detail}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("unreadable response body: {e}")))?;
        first_candidate_text(parsed)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
