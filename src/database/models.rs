/*!
 * Database row records and their conversions to the in-memory model.
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::jobs::models::{Job, JobStatus, PipelineStep};

/// One row of the jobs table
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: String,
    pub style: String,
    pub raw_input: String,
    pub input_hash: String,
    pub status: String,
    pub current_step: String,
    pub segments_json: String,
    pub stage_flags_json: String,
    pub character_bible_json: Option<String>,
    pub snippets_json: Option<String>,
    pub scenes_json: String,
    pub log_json: String,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl JobRecord {
    /// Serialize an in-memory job into a row record
    pub fn from_job(job: &Job) -> Result<Self> {
        Ok(Self {
            id: job.id.clone(),
            style: job.style.clone(),
            raw_input: job.raw_input.clone(),
            input_hash: job.input_hash.clone(),
            status: job.status.to_string(),
            current_step: job.current_step.to_string(),
            segments_json: serde_json::to_string(&job.segments)
                .context("Failed to serialize segments")?,
            stage_flags_json: serde_json::to_string(&job.stages)
                .context("Failed to serialize stage flags")?,
            character_bible_json: job
                .character_bible
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("Failed to serialize character bible")?,
            snippets_json: job
                .snippets
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .context("Failed to serialize snippets")?,
            scenes_json: serde_json::to_string(&job.scenes).context("Failed to serialize scenes")?,
            log_json: serde_json::to_string(&job.log).context("Failed to serialize job log")?,
            error_message: job.error_message.clone(),
            created_at: job.created_at.to_rfc3339(),
        })
    }

    /// Rehydrate the in-memory job from a row record.
    ///
    /// A job that was mid-flight when the process died comes back as
    /// queued: its completion flags and artifacts still mark where the
    /// pipeline will resume.
    pub fn into_job(self) -> Result<Job> {
        let mut status: JobStatus = self.status.parse()?;
        if status == JobStatus::Processing {
            status = JobStatus::Queued;
        }
        let current_step: PipelineStep = self.current_step.parse()?;

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("Invalid created_at timestamp: {}", self.created_at))?
            .with_timezone(&Utc);

        Ok(Job {
            id: self.id,
            created_at,
            style: self.style,
            raw_input: self.raw_input,
            input_hash: self.input_hash,
            segments: serde_json::from_str(&self.segments_json)
                .context("Failed to deserialize segments")?,
            status,
            current_step,
            stages: serde_json::from_str(&self.stage_flags_json)
                .context("Failed to deserialize stage flags")?,
            character_bible: self
                .character_bible_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Failed to deserialize character bible")?,
            snippets: self
                .snippets_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("Failed to deserialize snippets")?,
            scenes: serde_json::from_str(&self.scenes_json)
                .context("Failed to deserialize scenes")?,
            log: serde_json::from_str(&self.log_json).context("Failed to deserialize job log")?,
            error_message: self.error_message,
        })
    }
}
