/*!
 * Provider implementations for text generation services.
 *
 * This module contains the provider-agnostic request/response model and the
 * client implementations behind it:
 * - Gemini: Google Generative Language API integration
 * - Mock: scripted in-process provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A single-shot text generation request.
///
/// The API key travels with the request because the credential-aware call
/// wrapper selects a fresh key from the pool on every attempt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Credential to authenticate the call with
    pub api_key: String,

    /// The user prompt
    pub prompt: String,

    /// System instruction guiding the model
    pub system_instruction: Option<String>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate
    pub max_output_tokens: Option<u32>,
}

/// Builder methods for GenerationRequest - API surface for library consumers
#[allow(dead_code)]
impl GenerationRequest {
    /// Create a new request for the given key and prompt
    pub fn new(api_key: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            prompt: prompt.into(),
            system_instruction: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Set the system instruction
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        if !instruction.is_empty() {
            self.system_instruction = Some(instruction);
        }
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output token budget
    pub fn max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

/// A completed generation with optional usage accounting
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    /// The generated text
    pub text: String,

    /// Number of prompt tokens, when the provider reports it
    pub prompt_tokens: Option<u64>,

    /// Number of generated tokens, when the provider reports it
    pub completion_tokens: Option<u64>,
}

/// Common trait for all text generation providers
#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    /// Complete a single-shot generation request
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, ProviderError>;
}

pub mod gemini;
pub mod mock;
