/*!
 * Job records, pipeline state enumerations, and stage artifacts.
 *
 * These structures are the in-memory representation the pipeline operates
 * on; the database layer serializes them to and from row records.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

use crate::segments::Segment;

/// Job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Freshly submitted, not yet queued for processing
    Idle,
    /// Waiting for the scheduler to pick it up
    Queued,
    /// Currently being driven through the pipeline
    Processing,
    /// Terminal failure; error_message carries the cause
    Error,
    /// All stages finished
    Completed,
}

impl JobStatus {
    /// Whether the scheduler may pick this job up
    pub fn is_pending(self) -> bool {
        matches!(self, JobStatus::Idle | JobStatus::Queued)
    }

    /// Whether the job has reached a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "idle"),
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Error => write!(f, "error"),
            JobStatus::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(JobStatus::Idle),
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "error" => Ok(JobStatus::Error),
            "completed" => Ok(JobStatus::Completed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Pipeline step enumeration, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Character extraction
    Character,
    /// Visual-prompt synthesis
    Snippet,
    /// Batched scene generation
    Scene,
    /// Pipeline finished
    Done,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Character => write!(f, "character"),
            PipelineStep::Snippet => write!(f, "snippet"),
            PipelineStep::Scene => write!(f, "scene"),
            PipelineStep::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for PipelineStep {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "character" => Ok(PipelineStep::Character),
            "snippet" => Ok(PipelineStep::Snippet),
            "scene" => Ok(PipelineStep::Scene),
            "done" => Ok(PipelineStep::Done),
            _ => Err(anyhow::anyhow!("Invalid pipeline step: {}", s)),
        }
    }
}

/// Explicit per-stage completion flags.
///
/// A stage is skipped if and only if its flag is set; artifact presence
/// alone never decides, so a legitimately empty artifact (zero characters
/// detected) is not recomputed on resume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    /// Character extraction finished
    #[serde(default)]
    pub characters: bool,

    /// Prompt-snippet synthesis finished
    #[serde(default)]
    pub snippets: bool,

    /// Scene generation finished
    #[serde(default)]
    pub scenes: bool,
}

/// One timestamped entry in a job's append-only log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogEntry {
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,

    /// Log level label
    pub level: String,

    /// The message
    pub message: String,
}

/// One variant of a character: a context plus feature deltas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterVariant {
    /// When this variant applies (e.g. "flashback", "disguised")
    pub context: String,

    /// Feature deltas relative to the base description
    #[serde(default)]
    pub features: Vec<String>,
}

/// One character extracted from the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Unique identifier within the bible ("Character A", "Character B", ...)
    pub id: String,

    /// Display name, defaults to the identifier
    pub name: String,

    /// Free-form base description
    pub description: String,

    /// Physical appearance notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,

    /// Clothing notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attire: Option<String>,

    /// Context-specific variants
    #[serde(default)]
    pub variants: Vec<CharacterVariant>,
}

/// The set of characters a job's input mentions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterBible {
    /// All character records
    pub characters: Vec<CharacterProfile>,
}

impl CharacterBible {
    /// Whether the bible contains a character with the given id
    pub fn contains_id(&self, id: &str) -> bool {
        self.characters.iter().any(|c| c.id == id)
    }

    /// All character identifiers in order
    pub fn ids(&self) -> Vec<&str> {
        self.characters.iter().map(|c| c.id.as_str()).collect()
    }

    /// Number of characters in the bible
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// Whether the bible is empty
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// One short reusable visual descriptor for a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSnippet {
    /// Identifier of the character this snippet describes; must resolve to
    /// an entry in the job's character bible
    pub character_id: String,

    /// Descriptive text, capped at 60 words
    pub text: String,
}

/// How realistic it is to render a scene as specified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    /// Hard to render faithfully
    Low,
    /// Reasonable default
    #[default]
    Medium,
    /// Straightforward to render
    High,
}

impl fmt::Display for Feasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feasibility::Low => write!(f, "Low"),
            Feasibility::Medium => write!(f, "Medium"),
            Feasibility::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Feasibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Feasibility::Low),
            "medium" => Ok(Feasibility::Medium),
            "high" => Ok(Feasibility::High),
            _ => Err(anyhow::anyhow!("Invalid feasibility level: {}", s)),
        }
    }
}

/// One generated scene, paired with exactly one input segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    /// Identifier of the originating segment
    pub segment_id: String,

    /// Natural-language description of the scene
    pub description: String,

    /// Camera directive
    pub camera: String,

    /// Visual style directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,

    /// Audio cue directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_cue: Option<String>,

    /// Prompt for still-image rendering
    pub image_prompt: String,

    /// Prompt for video rendering
    pub video_prompt: String,

    /// Feasibility classification
    #[serde(default)]
    pub feasibility: Feasibility,

    /// Free-form metadata tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One user-submitted unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque unique identifier
    pub id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Name of the style bundle driving the stage prompts
    pub style: String,

    /// The raw voice/text payload as submitted
    pub raw_input: String,

    /// SHA-256 fingerprint of the raw payload, used to detect resubmission
    pub input_hash: String,

    /// Parsed input segments, read-only after submission
    pub segments: Vec<Segment>,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Stage the pipeline is at or about to run; advances monotonically
    pub current_step: PipelineStep,

    /// Per-stage completion flags (the resumability checkpoint)
    #[serde(default)]
    pub stages: StageFlags,

    /// Character extraction artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_bible: Option<CharacterBible>,

    /// Prompt-snippet artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippets: Option<Vec<PromptSnippet>>,

    /// Generated scenes, appended batch by batch
    #[serde(default)]
    pub scenes: Vec<Scene>,

    /// Append-only diagnostic log
    #[serde(default)]
    pub log: Vec<JobLogEntry>,

    /// Terminal error message, when status is Error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    /// Create a new idle job from a raw payload and its parsed segments
    pub fn new(raw_input: impl Into<String>, style: impl Into<String>, segments: Vec<Segment>) -> Self {
        let raw_input = raw_input.into();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            style: style.into(),
            input_hash: hash_input(&raw_input),
            raw_input,
            segments,
            status: JobStatus::Idle,
            current_step: PipelineStep::Character,
            stages: StageFlags::default(),
            character_bible: None,
            snippets: None,
            scenes: Vec::new(),
            log: Vec::new(),
            error_message: None,
        }
    }

    /// Append a timestamped entry to the job log
    pub fn append_log(&mut self, level: &str, message: impl Into<String>) {
        self.log.push(JobLogEntry {
            timestamp: Utc::now(),
            level: level.to_string(),
            message: message.into(),
        });
    }

    /// Transition to the terminal error state, recording the cause
    pub fn mark_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.append_log("error", message.clone());
        self.error_message = Some(message);
        self.status = JobStatus::Error;
    }

    /// Advance `current_step` forward; a step never regresses
    pub fn advance_to(&mut self, step: PipelineStep) {
        if step > self.current_step {
            self.current_step = step;
        }
    }

    /// Short id prefix for log lines
    pub fn short_id(&self) -> &str {
        &self.id[..self.id.len().min(8)]
    }
}

/// Hex SHA-256 fingerprint of a raw input payload
pub fn hash_input(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}
