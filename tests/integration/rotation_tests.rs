/*!
 * Integration tests for credential rotation under quota pressure.
 */

use std::sync::Arc;
use std::time::Duration;

use sceneforge::errors::ProviderError;
use sceneforge::generation::GenerationClient;
use sceneforge::key_pool::KeyPool;
use sceneforge::providers::mock::{MockGenerator, MockReply};

use crate::common;

fn client_over(mock: &MockGenerator, keys: KeyPool) -> GenerationClient {
    GenerationClient::new(Arc::new(mock.clone()), keys, common::fast_retry())
        .with_cooldown(Duration::from_millis(1))
}

#[tokio::test]
async fn test_rotationBound_threeBadKeys_shouldMakeExactlySixCalls() {
    let mock = MockGenerator::always_quota();
    let client = client_over(&mock, KeyPool::from_keys(["k1", "k2", "k3"]));

    let result = client.generate("prompt", "system").await;

    assert_eq!(mock.call_count(), 6);
    match result {
        Err(ProviderError::QuotaExceeded(message)) => {
            // The last underlying quota error, not a synthetic wrapper.
            assert!(message.contains("resource exhausted"));
        }
        other => panic!("expected QuotaExceeded, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rotationBound_oneBadKey_shouldStillGetFiveAttempts() {
    let mock = MockGenerator::always_quota();
    let client = client_over(&mock, KeyPool::from_keys(["only"]));

    let result = client.generate("prompt", "system").await;

    assert_eq!(mock.call_count(), 5);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_rotation_secondKeySucceeds_shouldRecover() {
    let mock = MockGenerator::with_script(
        vec![
            MockReply::Quota("quota exceeded for key 1".to_string()),
            MockReply::Text("generated text".to_string()),
        ],
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let client = client_over(&mock, KeyPool::from_keys(["k1", "k2"]));

    let text = client.generate("prompt", "system").await.unwrap();

    assert_eq!(text, "generated text");
    assert_eq!(mock.keys_used(), vec!["k1".to_string(), "k2".to_string()]);
    // Key 1 is remembered as invalid for the rest of the session.
    let snapshot = client.key_pool().snapshot();
    assert!(snapshot[0].invalid);
    assert!(!snapshot[1].invalid);
}

#[tokio::test]
async fn test_rotation_status429ApiError_shouldCountAsQuota() {
    let mock = MockGenerator::with_script(
        vec![
            MockReply::Api(429, "too many requests".to_string()),
            MockReply::Text("ok".to_string()),
        ],
        MockReply::Api(500, "script exhausted".to_string()),
    );
    let client = client_over(&mock, KeyPool::from_keys(["k1", "k2"]));

    let text = client.generate("prompt", "system").await.unwrap();

    assert_eq!(text, "ok");
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_authFailure_shouldSurfaceWithoutRotatingIntoSecondKey() {
    let mock = MockGenerator::always_auth();
    let client = client_over(&mock, KeyPool::from_keys(["bad", "never-tried"]));

    let result = client.generate("prompt", "system").await;

    assert_eq!(mock.call_count(), 1);
    assert_eq!(mock.keys_used(), vec!["bad".to_string()]);
    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
}

#[tokio::test]
async fn test_allKeysInvalid_nextCallStillTriesOptimistically() {
    // Exhaust both keys once, then let the service recover.
    let mock = MockGenerator::with_script(
        vec![
            MockReply::Quota("exhausted".to_string()),
            MockReply::Quota("exhausted".to_string()),
            MockReply::Text("service recovered".to_string()),
        ],
        MockReply::Quota("exhausted".to_string()),
    );
    let client = client_over(&mock, KeyPool::from_keys(["k1", "k2"]));

    let text = client.generate("prompt", "system").await.unwrap();

    assert_eq!(text, "service recovered");
    // Third attempt fell back to the first key even though it was flagged.
    assert_eq!(mock.keys_used()[2], "k1");
}
