/*!
 * Job domain model.
 *
 * A job is one user-submitted unit of work moving through the three-stage
 * generation pipeline. This module holds the job record itself plus the
 * artifacts each stage produces.
 */

pub mod models;

pub use models::{
    CharacterBible, CharacterProfile, CharacterVariant, Feasibility, Job, JobLogEntry, JobStatus,
    PipelineStep, PromptSnippet, Scene, StageFlags,
};
