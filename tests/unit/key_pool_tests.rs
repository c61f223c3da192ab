/*!
 * Unit tests for the credential pool.
 */

use rand::Rng;

use sceneforge::key_pool::KeyPool;

#[test]
fn test_next_manyKeys_shouldVisitAllBeforeRepeating() {
    let mut rng = rand::rng();
    let keys: Vec<String> = (0..10)
        .map(|i| format!("key-{}-{:04}", i, rng.random_range(0..10_000)))
        .collect();
    let pool = KeyPool::from_keys(keys.clone());

    let mut seen = Vec::new();
    for _ in 0..keys.len() {
        seen.push(pool.next().expect("pool is non-empty"));
    }

    assert_eq!(seen, keys);
    // The next draw wraps around to the start.
    assert_eq!(pool.next().as_deref(), Some(keys[0].as_str()));
}

#[test]
fn test_markInvalid_unknownKey_shouldBeIgnored() {
    let pool = KeyPool::from_keys(["key-a"]);

    pool.mark_invalid("never-added", "whatever");

    assert!(pool.snapshot().iter().all(|k| !k.invalid));
}

#[test]
fn test_invalidation_shouldSurviveRotationButNotReset() {
    let pool = KeyPool::from_keys(["key-a", "key-b", "key-c"]);
    pool.mark_invalid("key-b", "quota");

    // Several full rotations never hand out key-b.
    for _ in 0..6 {
        assert_ne!(pool.next().as_deref(), Some("key-b"));
    }

    pool.reset_all();
    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(pool.next().expect("non-empty"));
    }
    assert!(seen.contains(&"key-b".to_string()));
}

#[test]
fn test_snapshot_shouldExposeLastErrorForDiagnostics() {
    let pool = KeyPool::from_keys(["key-a"]);
    pool.mark_invalid("key-a", "Quota exhausted: resource exhausted");

    let snapshot = pool.snapshot();

    assert_eq!(snapshot.len(), 1);
    assert!(
        snapshot[0]
            .last_error
            .as_deref()
            .unwrap_or_default()
            .contains("resource exhausted")
    );
}

#[test]
fn test_removeAllKeys_shouldMakeNextReturnNone() {
    let pool = KeyPool::from_keys(["key-a", "key-b"]);
    for key in pool.snapshot() {
        assert!(pool.remove(&key.id));
    }

    assert!(pool.is_empty());
    assert!(pool.next().is_none());
}
