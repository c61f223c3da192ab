/*!
 * Segment batching and the injected sleep dependency.
 *
 * The scene stage processes segments in fixed-size chunks with a delay
 * between calls to respect external rate limits. The delay goes through a
 * `Sleeper` so tests can observe it without paying wall-clock time.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::segments::Segment;

/// Split segments into chunks of at most `batch_size` entries.
///
/// A batch size of zero is clamped to one.
pub fn chunk_segments(segments: &[Segment], batch_size: usize) -> Vec<&[Segment]> {
    segments.chunks(batch_size.max(1)).collect()
}

/// Injected sleep dependency for inter-batch delays
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    /// Suspend for the given duration
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer
#[derive(Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Test sleeper that records requested durations instead of sleeping
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    /// Create a new recording sleeper
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far, in order
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}
