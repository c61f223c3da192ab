/*!
 * Credential pool with round-robin rotation.
 *
 * The pool holds an ordered set of opaque API key strings and tracks per-key
 * session state: whether the key has been rejected, why, and how often it has
 * been handed out. Invalidity is advisory cached state, not deletion - a key
 * is never discarded for being refused, and every process start begins with
 * all keys presumed valid.
 */

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use uuid::Uuid;

/// One credential entry with its derived session state
#[derive(Debug, Clone)]
pub struct ApiKey {
    /// Stable identifier for management commands
    pub id: String,

    /// The opaque credential string
    pub key: String,

    /// Whether the key has been rejected this session
    pub invalid: bool,

    /// The message of the last rejection, if any
    pub last_error: Option<String>,

    /// How many times `next()` has handed this key out
    pub use_count: u64,

    /// When the key was last handed out
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    fn new(key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            key: key.into(),
            invalid: false,
            last_error: None,
            use_count: 0,
            last_used_at: None,
        }
    }
}

#[derive(Debug, Default)]
struct PoolInner {
    keys: Vec<ApiKey>,
    cursor: usize,
}

/// Thread-safe round-robin pool of API credentials
#[derive(Debug, Clone, Default)]
pub struct KeyPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl KeyPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool seeded from an iterator of key strings
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pool = Self::new();
        for key in keys {
            pool.add(key);
        }
        pool
    }

    /// Add a key to the end of the rotation order, returning its id.
    ///
    /// Adding a key string that is already present is a no-op and returns the
    /// existing entry's id.
    pub fn add(&self, key: impl Into<String>) -> String {
        let key = key.into();
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.keys.iter().find(|k| k.key == key) {
            return existing.id.clone();
        }
        let entry = ApiKey::new(key);
        let id = entry.id.clone();
        inner.keys.push(entry);
        id
    }

    /// Remove a key by id. Returns true if an entry was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.keys.len();
        inner.keys.retain(|k| k.id != id);
        let after = inner.keys.len();
        inner.cursor = if after == 0 { 0 } else { inner.cursor % after };
        after < before
    }

    /// Select the next key in round-robin order, skipping invalid keys.
    ///
    /// When every key has been marked invalid the pool falls back to the
    /// first key in insertion order anyway: the rejection may have been
    /// transient, and callers must always get something while the pool is
    /// non-empty. Returns `None` only for an empty pool.
    pub fn next(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let len = inner.keys.len();
        if len == 0 {
            return None;
        }

        for _ in 0..len {
            let idx = inner.cursor % len;
            inner.cursor = (inner.cursor + 1) % len;
            if !inner.keys[idx].invalid {
                return Some(Self::checkout(&mut inner.keys[idx]));
            }
        }

        // Every key is flagged. Optimistically hand out the first one rather
        // than failing hard; the caller's bounded rotation loop keeps this
        // from spinning forever.
        warn!("All {} API keys are marked invalid, falling back to the first key", len);
        Some(Self::checkout(&mut inner.keys[0]))
    }

    fn checkout(entry: &mut ApiKey) -> String {
        entry.use_count += 1;
        entry.last_used_at = Some(Utc::now());
        entry.key.clone()
    }

    /// Mark a key as invalid for the rest of the session.
    ///
    /// Idempotent and monotonic: once marked, the key is skipped by `next()`
    /// until `reset_all()` is called. Unknown key strings are ignored.
    pub fn mark_invalid(&self, key: &str, reason: &str) {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.keys.iter_mut().find(|k| k.key == key) {
            if !entry.invalid {
                debug!("Marking API key {} invalid: {}", entry.id, reason);
            }
            entry.invalid = true;
            entry.last_error = Some(reason.to_string());
        }
    }

    /// Clear the invalid flag and last error on every key
    pub fn reset_all(&self) {
        let mut inner = self.inner.lock();
        for entry in inner.keys.iter_mut() {
            entry.invalid = false;
            entry.last_error = None;
        }
    }

    /// Number of keys in the pool, valid or not
    pub fn len(&self) -> usize {
        self.inner.lock().keys.len()
    }

    /// Whether the pool holds no keys at all
    pub fn is_empty(&self) -> bool {
        self.inner.lock().keys.is_empty()
    }

    /// Snapshot of every key's state, for observability
    pub fn snapshot(&self) -> Vec<ApiKey> {
        self.inner.lock().keys.clone()
    }
}
