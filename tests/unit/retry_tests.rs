/*!
 * Unit tests for the retry policy, using tokio's paused clock so the
 * exponential backoff schedule is observable without wall-clock delay.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sceneforge::errors::ProviderError;
use sceneforge::retry::RetryPolicy;

#[tokio::test(start_paused = true)]
async fn test_execute_backoffSchedule_shouldBeExponential() {
    let policy = RetryPolicy::new(3, Duration::from_millis(100), 2.0);
    let start = tokio::time::Instant::now();

    let result: Result<(), _> = policy
        .execute(|| async {
            Err(ProviderError::RequestFailed("connection refused".to_string()))
        })
        .await;

    assert!(result.is_err());
    // Two backoffs before exhaustion: 100ms + 200ms.
    assert_eq!(start.elapsed(), Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_execute_successOnSecondAttempt_shouldOnlyPayFirstBackoff() {
    let policy = RetryPolicy::new(5, Duration::from_millis(100), 3.0);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let start = tokio::time::Instant::now();

    let result = policy
        .execute(|| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ProviderError::ApiError {
                        status_code: 502,
                        message: "bad gateway".to_string(),
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(start.elapsed(), Duration::from_millis(100));
}

#[tokio::test]
async fn test_execute_singleAttemptPolicy_shouldNeverSleep() {
    let policy = RetryPolicy::new(1, Duration::from_secs(3600), 2.0);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let result: Result<(), _> = policy
        .execute(|| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::RequestFailed("down".to_string()))
            }
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execute_authError_shouldBypassBackoff() {
    let policy = RetryPolicy::new(5, Duration::from_secs(3600), 2.0);

    let result: Result<(), _> = policy
        .execute(|| async {
            Err(ProviderError::AuthenticationError("API key not valid".to_string()))
        })
        .await;

    // Finishing at all proves the hour-long backoff was never taken.
    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
}
