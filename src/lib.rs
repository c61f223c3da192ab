/*!
 * # sceneforge - AI storyboard generation pipeline
 *
 * A Rust library for turning voice/text transcripts into storyboards
 * through a resilient three-stage AI generation pipeline.
 *
 * ## Features
 *
 * - Three dependent generation stages: character extraction,
 *   visual-prompt synthesis, batched scene generation
 * - Resume at the last completed stage after partial failure
 * - Pool of interchangeable API credentials, rotated on quota exhaustion
 * - Defensive validation and repair of loosely-structured model output
 * - Single-flight scheduler draining the job queue one job at a time
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `key_pool`: Round-robin credential pool
 * - `retry`: Exponential-backoff retry policy
 * - `generation`: Credential-aware call wrapper above the retry policy
 * - `providers`: Client implementations for generation services:
 *   - `providers::gemini`: Gemini API client
 *   - `providers::mock`: Scripted mock for tests
 * - `segments`: Input segmentation
 * - `validation`: Parsing, schema validation, and alignment repair of
 *   model output
 * - `jobs`: Job records and stage artifacts
 * - `pipeline`: The per-job three-stage state machine
 * - `scheduler`: Single-flight queue drain loop
 * - `database`: SQLite persistence for jobs and credentials
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod generation;
pub mod jobs;
pub mod key_pool;
pub mod pipeline;
pub mod providers;
pub mod retry;
pub mod scheduler;
pub mod segments;
pub mod validation;

// Re-export main types for easier usage
pub use app_config::{Config, StyleConfig};
pub use app_controller::Controller;
pub use errors::{PipelineError, ProviderError, ValidationError};
pub use generation::GenerationClient;
pub use jobs::{Job, JobStatus, PipelineStep};
pub use key_pool::KeyPool;
pub use pipeline::PipelineExecutor;
pub use retry::RetryPolicy;
pub use scheduler::{JobQueue, Scheduler};
pub use segments::{Segment, SegmentParser};
