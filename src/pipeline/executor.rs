/*!
 * Pipeline executor: the per-job state machine.
 *
 * Drives one job through its three dependent stages. Every stage follows
 * the same contract: skip if its completion flag is set, otherwise build
 * the stage prompt from the style's system instruction plus the prior
 * stage's validated artifact, call the model through the credential-aware
 * client, validate the response, attach the artifact and flag, and log.
 * A stage failure puts the owning job into the error state and never
 * touches other jobs.
 */

use std::sync::Arc;

use log::{debug, info};

use crate::app_config::{Config, StyleConfig};
use crate::errors::{PipelineError, ValidationError};
use crate::generation::GenerationClient;
use crate::jobs::models::{Job, JobStatus, PipelineStep};
use crate::validation;

use super::batch::{Sleeper, TokioSleeper, chunk_segments};
use super::prompts;

/// Executor driving jobs through the generation pipeline
#[derive(Debug, Clone)]
pub struct PipelineExecutor {
    client: GenerationClient,
    config: Arc<Config>,
    sleeper: Arc<dyn Sleeper>,
}

impl PipelineExecutor {
    /// Create an executor with the production sleeper
    pub fn new(client: GenerationClient, config: Arc<Config>) -> Self {
        Self {
            client,
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the inter-batch sleeper (used by tests)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Run a job to a terminal state.
    ///
    /// The outcome is written onto the job itself: `Completed` with all
    /// artifacts attached, or `Error` with the cause recorded. This method
    /// never propagates stage failures to the caller.
    pub async fn run(&self, job: &mut Job) {
        job.status = JobStatus::Processing;
        job.append_log("info", "pipeline started");
        info!("Job {} processing ({} segments)", job.short_id(), job.segments.len());

        match self.run_stages(job).await {
            Ok(()) => {
                job.status = JobStatus::Completed;
                job.advance_to(PipelineStep::Done);
                job.append_log("info", "pipeline completed");
                info!("Job {} completed with {} scenes", job.short_id(), job.scenes.len());
            }
            Err(err) => {
                job.mark_error(err.to_string());
                info!("Job {} failed: {}", job.short_id(), err);
            }
        }
    }

    async fn run_stages(&self, job: &mut Job) -> Result<(), PipelineError> {
        let style = self.config.style(&job.style).clone();

        self.character_stage(job, &style).await?;
        self.snippet_stage(job, &style).await?;
        self.scene_stage(job, &style).await?;

        Ok(())
    }

    async fn character_stage(&self, job: &mut Job, style: &StyleConfig) -> Result<(), PipelineError> {
        if job.stages.characters {
            debug!("Job {}: character stage already complete, skipping", job.short_id());
            job.advance_to(PipelineStep::Snippet);
            return Ok(());
        }

        job.advance_to(PipelineStep::Character);
        let prompt = prompts::character_prompt(&job.segments);
        let raw = self
            .client
            .generate(&prompt, &style.character_system_prompt)
            .await?;

        let bible = validation::parse_character_bible(&raw)?;
        job.append_log(
            "info",
            format!("character bible generated ({} characters)", bible.len()),
        );
        job.character_bible = Some(bible);
        job.stages.characters = true;
        job.advance_to(PipelineStep::Snippet);

        Ok(())
    }

    async fn snippet_stage(&self, job: &mut Job, style: &StyleConfig) -> Result<(), PipelineError> {
        if job.stages.snippets {
            debug!("Job {}: snippet stage already complete, skipping", job.short_id());
            job.advance_to(PipelineStep::Scene);
            return Ok(());
        }

        job.advance_to(PipelineStep::Snippet);
        let bible = job
            .character_bible
            .clone()
            .ok_or_else(|| PipelineError::Unknown("character bible missing before snippet stage".to_string()))?;

        let snippets = if bible.is_empty() {
            // Nothing to describe; an empty artifact is still a completed stage.
            Vec::new()
        } else {
            let prompt = prompts::snippet_prompt(&bible);
            let raw = self
                .client
                .generate(&prompt, &style.snippet_system_prompt)
                .await?;
            validation::parse_prompt_snippets(&raw, &bible)?
        };

        job.append_log("info", format!("{} prompt snippets generated", snippets.len()));
        job.snippets = Some(snippets);
        job.stages.snippets = true;
        job.advance_to(PipelineStep::Scene);

        Ok(())
    }

    async fn scene_stage(&self, job: &mut Job, style: &StyleConfig) -> Result<(), PipelineError> {
        if job.stages.scenes {
            debug!("Job {}: scene stage already complete, skipping", job.short_id());
            job.advance_to(PipelineStep::Done);
            return Ok(());
        }

        job.advance_to(PipelineStep::Scene);

        if job.scenes.len() == job.segments.len() {
            // Every segment already has a scene; nothing to call the model for.
            job.append_log("info", "scene list already complete");
            job.stages.scenes = true;
            job.advance_to(PipelineStep::Done);
            return Ok(());
        }

        let bible = job
            .character_bible
            .clone()
            .ok_or_else(|| PipelineError::Unknown("character bible missing before scene stage".to_string()))?;
        let snippets = job.snippets.clone().unwrap_or_default();

        // Resume from the first segment without a scene; completed batches
        // are never regenerated.
        let done = job.scenes.len();
        let remaining = job.segments.get(done..).unwrap_or_default().to_vec();
        let batches = chunk_segments(&remaining, style.batch_size);
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            let prompt = prompts::scene_prompt(&bible, &snippets, batch);
            let raw = self
                .client
                .generate(&prompt, &style.scene_system_prompt)
                .await?;

            let scenes = validation::parse_scenes(&raw, batch)?;
            if scenes.is_empty() {
                return Err(ValidationError::schema(vec![format!(
                    "scene batch {}/{}: model returned no usable scenes",
                    index + 1,
                    batch_count
                )])
                .into());
            }

            job.scenes.extend(scenes);
            job.append_log(
                "info",
                format!(
                    "scene batch {}/{} complete ({}/{} scenes)",
                    index + 1,
                    batch_count,
                    job.scenes.len(),
                    job.segments.len()
                ),
            );

            if index + 1 < batch_count {
                self.sleeper
                    .sleep(std::time::Duration::from_millis(style.batch_delay_ms))
                    .await;
            }
        }

        if job.scenes.len() != job.segments.len() {
            return Err(ValidationError::schema(vec![format!(
                "expected {} scenes but the model produced {}",
                job.segments.len(),
                job.scenes.len()
            )])
            .into());
        }

        job.stages.scenes = true;
        job.advance_to(PipelineStep::Done);

        Ok(())
    }
}
