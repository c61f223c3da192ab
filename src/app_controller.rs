/*!
 * Application controller.
 *
 * Wires configuration, the job store, the credential pool, the provider,
 * and the scheduler together behind the thin CLI binary. The controller
 * owns submission (including resubmission detection), the drain run with
 * its progress bar, and key management.
 */

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::app_config::Config;
use crate::database::connection::DatabaseConnection;
use crate::database::repository::{Repository, StoredKey};
use crate::file_utils::FileManager;
use crate::generation::GenerationClient;
use crate::jobs::models::{Job, JobStatus, hash_input};
use crate::key_pool::KeyPool;
use crate::pipeline::PipelineExecutor;
use crate::providers::gemini::GeminiClient;
use crate::scheduler::{DrainSummary, JobQueue, Scheduler};
use crate::segments::SegmentParser;

/// Main application controller
pub struct Controller {
    config: Config,
    repo: Repository,
}

impl Controller {
    /// Create a controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let db = match &config.database_path {
            Some(path) => DatabaseConnection::new(path)?,
            None => DatabaseConnection::new_default()?,
        };

        Ok(Self {
            config,
            repo: Repository::new(db),
        })
    }

    /// The repository backing this controller
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit a single input file or every input file under a directory.
    ///
    /// Returns the ids of the queued jobs.
    pub async fn submit_path(&self, path: &Path, style: Option<String>) -> Result<Vec<String>> {
        let files = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            let files = FileManager::discover_input_files(path);
            if files.is_empty() {
                return Err(anyhow!(
                    "No input files (.txt/.json) found under {}",
                    path.display()
                ));
            }
            files
        } else {
            return Err(anyhow!("Input path does not exist: {}", path.display()));
        };

        let style = style.unwrap_or_else(|| self.config.default_style.clone());
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let raw = FileManager::read_input(&file)?;
            ids.push(self.submit_raw(&raw, &style).await?);
        }
        Ok(ids)
    }

    /// Submit a raw payload, reusing an unfinished job with identical input.
    pub async fn submit_raw(&self, raw: &str, style: &str) -> Result<String> {
        let segments = SegmentParser::parse(raw);
        if segments.is_empty() {
            return Err(anyhow!("Input produced no segments"));
        }

        // Identical input with an unfinished job: re-queue that job instead
        // of duplicating the work.
        if let Some(mut existing) = self.repo.find_unfinished_by_hash(&hash_input(raw)).await? {
            warn!(
                "Input already submitted as job {}, re-queueing it",
                existing.short_id()
            );
            existing.status = JobStatus::Queued;
            let id = existing.id.clone();
            self.repo.save_job(&existing).await?;
            return Ok(id);
        }

        let mut job = Job::new(raw, style, segments);
        job.status = JobStatus::Queued;
        job.append_log("info", format!("submitted with {} segments", job.segments.len()));
        let id = job.id.clone();
        self.repo.save_job(&job).await?;
        info!("Submitted job {} ({} segments)", job.short_id(), job.segments.len());
        Ok(id)
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Re-hydrate pending jobs and stored keys, then drain the queue.
    pub async fn run(&self) -> Result<DrainSummary> {
        let keys = self.load_key_pool().await?;
        if keys.is_empty() {
            return Err(anyhow!(
                "No API keys configured; add one with `sceneforge keys add <key>`"
            ));
        }

        let pending = self.repo.load_pending_jobs().await?;
        if pending.is_empty() {
            info!("No pending jobs to run");
            return Ok(DrainSummary::default());
        }

        let queue = JobQueue::new();
        for job in pending {
            queue.submit(job);
        }
        let total = queue.len();

        let provider = GeminiClient::with_timeout(
            &self.config.provider.model,
            &self.config.provider.endpoint,
            Duration::from_secs(self.config.provider.timeout_secs),
        );
        let client = GenerationClient::new(Arc::new(provider), keys, self.config.retry_policy())
            .with_cooldown(self.config.rotation_cooldown());
        let executor = PipelineExecutor::new(client, Arc::new(self.config.clone()));

        let scheduler =
            Arc::new(Scheduler::new(queue.clone(), executor).with_repository(self.repo.clone()));

        info!("Draining {} pending job(s)", total);
        let progress = ProgressBar::new(total as u64);
        progress.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let handle = Arc::clone(&scheduler).start();
        while !handle.is_finished() {
            progress.set_position(queue.terminal_count() as u64);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        progress.set_position(queue.terminal_count() as u64);
        progress.finish_with_message("drain complete");

        let summary = handle.await.context("Drain task panicked")?;
        info!(
            "Run finished: {} completed, {} failed",
            summary.completed, summary.failed
        );
        Ok(summary)
    }

    async fn load_key_pool(&self) -> Result<KeyPool> {
        let pool = KeyPool::new();
        for stored in self.repo.load_keys().await? {
            pool.add(stored.key);
        }
        // Config-seeded keys join the stored ones; duplicates collapse.
        for key in &self.config.api_keys {
            pool.add(key);
        }
        Ok(pool)
    }

    // =========================================================================
    // Key management
    // =========================================================================

    /// Store a credential, returning its id
    pub async fn add_key(&self, key: &str) -> Result<String> {
        let id = self.repo.add_key(key).await?;
        info!("Stored API key {}", id);
        Ok(id)
    }

    /// List stored credentials
    pub async fn list_keys(&self) -> Result<Vec<StoredKey>> {
        self.repo.load_keys().await
    }

    /// Remove a stored credential by id
    pub async fn remove_key(&self, id: &str) -> Result<bool> {
        self.repo.remove_key(id).await
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Snapshot of every stored job
    pub async fn status(&self) -> Result<Vec<Job>> {
        self.repo.load_all_jobs().await
    }
}

/// Mask a key string for display: keep a short prefix, hide the rest
pub fn mask_key(key: &str) -> String {
    let visible = key.chars().take(8).collect::<String>();
    if key.chars().count() <= 8 {
        visible
    } else {
        format!("{}...", visible)
    }
}
