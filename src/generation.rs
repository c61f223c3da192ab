/*!
 * Credential-aware generation client.
 *
 * This is the second retry layer that sits above the generic backoff policy,
 * specifically for model calls. Quota-class failures rotate to the next key
 * in the pool after a short cooldown; authentication failures surface
 * immediately without rotation; everything else is whatever the generic
 * policy produced. The rotation loop is globally bounded so a pool of bad
 * keys cannot spin forever.
 */

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::errors::ProviderError;
use crate::key_pool::KeyPool;
use crate::providers::{GenerationRequest, TextGenerator};
use crate::retry::RetryPolicy;

/// Default cooldown between key rotations
const DEFAULT_ROTATION_COOLDOWN: Duration = Duration::from_secs(1);

/// Minimum number of global attempts regardless of pool size
const MIN_ROTATION_ATTEMPTS: usize = 5;

/// Generation client composing a provider, the key pool, and a retry policy
#[derive(Debug, Clone)]
pub struct GenerationClient {
    provider: Arc<dyn TextGenerator>,
    keys: KeyPool,
    retry: RetryPolicy,
    cooldown: Duration,
}

impl GenerationClient {
    /// Create a new client with the default rotation cooldown
    pub fn new(provider: Arc<dyn TextGenerator>, keys: KeyPool, retry: RetryPolicy) -> Self {
        Self {
            provider,
            keys,
            retry,
            cooldown: DEFAULT_ROTATION_COOLDOWN,
        }
    }

    /// Override the cooldown between key rotations
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// The key pool backing this client
    pub fn key_pool(&self) -> &KeyPool {
        &self.keys
    }

    /// Generate text for `prompt` under `system_instruction`, rotating
    /// credentials on quota errors.
    ///
    /// The attempt bound is `max(2 * key_count, 5)` so every key gets more
    /// than one chance (a quota rejection is often transient) while staying
    /// finite. Exhausting the bound re-raises the last quota error.
    pub async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
    ) -> Result<String, ProviderError> {
        let key_count = self.keys.len();
        if key_count == 0 {
            return Err(ProviderError::AuthenticationError(
                "no API keys configured".to_string(),
            ));
        }

        let max_attempts = (2 * key_count).max(MIN_ROTATION_ATTEMPTS);
        let mut last_quota_error: Option<ProviderError> = None;

        for attempt in 0..max_attempts {
            let Some(key) = self.keys.next() else {
                break;
            };
            debug!(
                "Generation attempt {}/{} using key ending ...{}",
                attempt + 1,
                max_attempts,
                key_suffix(&key)
            );

            let result = self
                .retry
                .execute(|| {
                    let provider = Arc::clone(&self.provider);
                    let request = GenerationRequest::new(&key, prompt)
                        .system_instruction(system_instruction);
                    async move { provider.generate(request).await }
                })
                .await;

            match result {
                Ok(response) => return Ok(response.text),
                Err(err) if err.is_auth() => {
                    self.keys.mark_invalid(&key, &err.to_string());
                    warn!("Authentication failure, not rotating: {}", err);
                    return Err(err);
                }
                Err(err) if err.is_quota() => {
                    self.keys.mark_invalid(&key, &err.to_string());
                    info!(
                        "Quota exhausted on key ...{}, rotating ({}/{})",
                        key_suffix(&key),
                        attempt + 1,
                        max_attempts
                    );
                    last_quota_error = Some(err);
                    if attempt + 1 < max_attempts {
                        tokio::time::sleep(self.cooldown).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_quota_error.unwrap_or_else(|| {
            ProviderError::QuotaExceeded("all credentials exhausted".to_string())
        }))
    }
}

/// Last few characters of a key, safe to log
fn key_suffix(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    chars[chars.len().saturating_sub(4)..].iter().collect()
}
