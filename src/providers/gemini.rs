use std::time::Duration;

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{GenerationRequest, GenerationResponse, TextGenerator};
use crate::errors::ProviderError;

/// Default public endpoint of the Generative Language API
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Gemini client for interacting with the Generative Language API
#[derive(Debug)]
pub struct GeminiClient {
    /// HTTP client for API requests
    client: Client,
    /// Model name, e.g. "gemini-2.0-flash"
    model: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
}

/// Gemini generateContent request body
#[derive(Debug, Serialize)]
struct GeminiRequest {
    /// Conversation contents
    contents: Vec<GeminiContent>,

    /// System instruction to guide the model
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,

    /// Generation parameters
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// One content block in a Gemini request or response
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    /// Role of the content producer (user, model)
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,

    /// The content parts
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![GeminiPart { text: text.into() }],
        }
    }

    fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![GeminiPart { text: text.into() }],
        }
    }
}

/// A single text part
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    /// The text content
    text: String,
}

/// Generation parameters
#[derive(Debug, Serialize)]
struct GenerationConfig {
    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini generateContent response body
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,

    /// Token usage information
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

/// One generated candidate
#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    /// The candidate content
    content: GeminiContent,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct UsageMetadata {
    /// Number of prompt tokens
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u64>,

    /// Number of generated tokens
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u64>,
}

impl GeminiClient {
    /// Create a new Gemini client for the given model.
    ///
    /// An empty endpoint selects the public API.
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_timeout(model, endpoint, Duration::from_secs(120))
    }

    /// Create a new Gemini client with an explicit request timeout
    pub fn with_timeout(
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            model: model.into(),
            endpoint: endpoint.into(),
        }
    }

    /// The model this client targets
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the generateContent URL for this client
    fn api_url(&self) -> Result<String, ProviderError> {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            &self.endpoint
        };

        // Validate early so a malformed endpoint fails with a clear message
        // instead of a confusing transport error.
        Url::parse(base)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Gemini endpoint {}: {}", base, e)))?;

        Ok(format!(
            "{}/v1beta/models/{}:generateContent",
            base.trim_end_matches('/'),
            self.model
        ))
    }

    fn map_error_status(status: u16, body: String) -> ProviderError {
        match status {
            429 => ProviderError::QuotaExceeded(body),
            401 => ProviderError::AuthenticationError(body),
            403 => {
                // 403 is how the API reports both a revoked key and an
                // exhausted project quota; the body tells them apart.
                if body.to_lowercase().contains("api key") {
                    ProviderError::AuthenticationError(body)
                } else {
                    ProviderError::QuotaExceeded(body)
                }
            }
            code => ProviderError::ApiError {
                status_code: code,
                message: body,
            },
        }
    }

    fn extract_text(response: &GeminiResponse) -> Result<String, ProviderError> {
        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| ProviderError::ParseError("response contained no candidates".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|part| part.text.as_str())
            .collect();

        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        let url = self.api_url()?;

        let body = GeminiRequest {
            contents: vec![GeminiContent::user(&request.prompt)],
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(GeminiContent::system),
            generation_config: match (request.temperature, request.max_output_tokens) {
                (None, None) => None,
                (temperature, max_output_tokens) => Some(GenerationConfig {
                    temperature,
                    max_output_tokens,
                }),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ProviderError::RequestFailed(format!("Failed to send request to Gemini API: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(Self::map_error_status(status.as_u16(), error_text));
        }

        let gemini_response = response.json::<GeminiResponse>().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse Gemini API response: {}", e))
        })?;

        let text = Self::extract_text(&gemini_response)?;
        let (prompt_tokens, completion_tokens) = match gemini_response.usage_metadata {
            Some(usage) => (usage.prompt_token_count, usage.candidates_token_count),
            None => (None, None),
        };

        Ok(GenerationResponse {
            text,
            prompt_tokens,
            completion_tokens,
        })
    }
}
