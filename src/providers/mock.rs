/*!
 * Mock generator for testing.
 *
 * The mock replays a scripted sequence of replies and records every request
 * it receives, so tests can assert on call counts, prompts, and the API key
 * each call was made with. Cloning a mock shares its script and counters.
 */

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GenerationRequest, GenerationResponse, TextGenerator};
use crate::errors::ProviderError;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with the given text
    Text(String),
    /// Fail with a quota error
    Quota(String),
    /// Fail with an authentication error
    Auth(String),
    /// Fail with a transport error (no status code)
    Network(String),
    /// Fail with an arbitrary API status
    Api(u16, String),
}

impl MockReply {
    fn to_result(&self) -> Result<GenerationResponse, ProviderError> {
        match self {
            MockReply::Text(text) => Ok(GenerationResponse {
                text: text.clone(),
                prompt_tokens: Some(10),
                completion_tokens: Some(20),
            }),
            MockReply::Quota(message) => Err(ProviderError::QuotaExceeded(message.clone())),
            MockReply::Auth(message) => Err(ProviderError::AuthenticationError(message.clone())),
            MockReply::Network(message) => Err(ProviderError::RequestFailed(message.clone())),
            MockReply::Api(status_code, message) => Err(ProviderError::ApiError {
                status_code: *status_code,
                message: message.clone(),
            }),
        }
    }
}

/// Scripted mock implementation of [`TextGenerator`]
#[derive(Debug, Clone)]
pub struct MockGenerator {
    /// Replies consumed front-to-back; when empty, `fallback` answers
    script: Arc<Mutex<VecDeque<MockReply>>>,
    /// Reply used once the script is exhausted
    fallback: MockReply,
    /// Total number of generate() calls
    call_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockGenerator {
    /// Create a mock that always answers with the same text
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_script(Vec::new(), MockReply::Text(text.into()))
    }

    /// Create a mock that replays `script` and then falls back to `fallback`
    pub fn with_script(script: Vec<MockReply>, fallback: MockReply) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            fallback,
            call_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails with a quota error
    pub fn always_quota() -> Self {
        Self::with_script(Vec::new(), MockReply::Quota("resource exhausted".to_string()))
    }

    /// Create a mock that always fails with an authentication error
    pub fn always_auth() -> Self {
        Self::with_script(Vec::new(), MockReply::Auth("API key not valid".to_string()))
    }

    /// Number of generate() calls made so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// All requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// API keys used by each call, in order
    pub fn keys_used(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.api_key.clone()).collect()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);

        let reply = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        reply.to_result()
    }
}
