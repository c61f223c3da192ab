/*!
 * Single-flight job scheduler.
 *
 * One worker drains the queue: it pulls the first pending job (FIFO by
 * discovery order), runs it through the pipeline to a terminal state, and
 * only then looks at the queue again. The drain loop is guarded by an
 * async mutex so a second start is a no-op, and a separate run flag
 * requests shutdown - which takes effect at the next job boundary, never
 * mid-stage.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info};
use parking_lot::RwLock;

use crate::database::repository::Repository;
use crate::jobs::models::{Job, JobStatus};
use crate::pipeline::PipelineExecutor;

/// In-memory job queue, FIFO by insertion order
#[derive(Debug, Clone, Default)]
pub struct JobQueue {
    jobs: Arc<RwLock<Vec<Job>>>,
}

impl JobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job, returning its id.
    ///
    /// A resubmitted job enters at the back like any other pending job;
    /// discovery order, not submission timestamp, decides scheduling.
    pub fn submit(&self, job: Job) -> String {
        let id = job.id.clone();
        self.jobs.write().push(job);
        id
    }

    /// Take the first pending job, marking it processing in place so the
    /// next call skips it
    fn take_next_pending(&self) -> Option<Job> {
        let mut jobs = self.jobs.write();
        let slot = jobs.iter_mut().find(|job| job.status.is_pending())?;
        slot.status = JobStatus::Processing;
        Some(slot.clone())
    }

    /// Write an updated job back over the entry with the same id
    pub fn update(&self, job: Job) {
        let mut jobs = self.jobs.write();
        if let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job;
        } else {
            jobs.push(job);
        }
    }

    /// Snapshot of a job by id
    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.read().iter().find(|j| j.id == id).cloned()
    }

    /// Snapshot of every job in discovery order
    pub fn all(&self) -> Vec<Job> {
        self.jobs.read().clone()
    }

    /// Number of jobs in the queue
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Number of jobs in a terminal state
    pub fn terminal_count(&self) -> usize {
        self.jobs.read().iter().filter(|j| j.status.is_terminal()).count()
    }
}

/// Outcome of one drain run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Jobs that reached Completed
    pub completed: usize,
    /// Jobs that reached Error
    pub failed: usize,
}

impl DrainSummary {
    /// Total jobs processed by this drain
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }
}

/// Single-flight scheduler owning the drain loop
#[derive(Debug)]
pub struct Scheduler {
    queue: JobQueue,
    executor: PipelineExecutor,
    repository: Option<Repository>,
    run_flag: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    drain_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Scheduler {
    /// Create a scheduler over the given queue and executor
    pub fn new(queue: JobQueue, executor: PipelineExecutor) -> Self {
        Self {
            queue,
            executor,
            repository: None,
            run_flag: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
            drain_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Persist terminal jobs through the given repository
    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// The queue this scheduler drains
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Whether a drain loop is currently running
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Request the drain loop to stop at the next job boundary.
    ///
    /// An in-flight job always runs to stage completion or terminal error;
    /// there is no per-job cancellation.
    pub fn stop(&self) {
        self.run_flag.store(false, Ordering::SeqCst);
    }

    /// Drain the queue until no pending job remains or stop() is called.
    ///
    /// Starting a drain while one is already running is a no-op and
    /// returns an empty summary immediately.
    pub async fn drain(&self) -> DrainSummary {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            debug!("Drain loop already running, ignoring start");
            return DrainSummary::default();
        };

        self.run_flag.store(true, Ordering::SeqCst);
        self.active.store(true, Ordering::SeqCst);
        let mut summary = DrainSummary::default();

        while self.run_flag.load(Ordering::SeqCst) {
            let Some(mut job) = self.queue.take_next_pending() else {
                break;
            };

            info!("Scheduler picked job {}", job.short_id());
            self.executor.run(&mut job).await;

            match job.status {
                JobStatus::Completed => summary.completed += 1,
                _ => summary.failed += 1,
            }

            self.queue.update(job.clone());
            if let Some(repo) = &self.repository {
                if let Err(e) = repo.save_job(&job).await {
                    error!("Failed to persist job {}: {}", job.short_id(), e);
                }
            }
        }

        self.active.store(false, Ordering::SeqCst);
        self.run_flag.store(false, Ordering::SeqCst);
        info!(
            "Drain finished: {} completed, {} failed",
            summary.completed, summary.failed
        );
        summary
    }

    /// Spawn the drain loop on the current runtime
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<DrainSummary> {
        tokio::spawn(async move { self.drain().await })
    }
}
