use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Retry configuration for provider calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Key rotation configuration
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Seed API keys, merged with keys stored in the database
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Named style bundles
    #[serde(default = "default_styles")]
    pub styles: HashMap<String, StyleConfig>,

    /// Style used when a submission names none
    #[serde(default = "default_style_name")]
    pub default_style: String,

    /// Override for the job database location
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

/// Log level configuration
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's level filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Generation provider configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Service URL; empty selects the public endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retry configuration for provider calls
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied after each failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// Key rotation configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RotationConfig {
    /// Cooldown between key rotations in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// One named style: the per-stage system prompts plus batching parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StyleConfig {
    /// System instruction for the character extraction stage
    pub character_system_prompt: String,

    /// System instruction for the snippet synthesis stage
    pub snippet_system_prompt: String,

    /// System instruction for the scene generation stage
    pub scene_system_prompt: String,

    /// Number of segments per scene-generation call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between scene batches in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        cinematic_style()
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_delay_ms() -> u64 {
    2000
}

fn default_style_name() -> String {
    "cinematic".to_string()
}

fn cinematic_style() -> StyleConfig {
    StyleConfig {
        character_system_prompt: "You are a story analyst. Read the numbered input segments and \
            extract every distinct character. Respond with a JSON array of character objects, \
            each with fields: id (\"Character A\", \"Character B\", ...), name, description, \
            appearance, attire, and optional variants (context plus feature deltas). Respond \
            with JSON only."
            .to_string(),
        snippet_system_prompt: "You are a visual prompt writer. For each character in the \
            provided character bible, write one reusable visual descriptor of at most 60 words. \
            Respond with a JSON array of objects with fields character_id and text. Respond \
            with JSON only."
            .to_string(),
        scene_system_prompt: "You are a storyboard director. For each input segment, produce \
            one scene object with fields: segment_id (copied from the input), description, \
            camera, visual_style, audio_cue, image_prompt, video_prompt, feasibility (Low, \
            Medium or High) and tags. Use the character bible and snippets for visual \
            consistency. Respond with a JSON array only, one scene per segment, in input order."
            .to_string(),
        batch_size: default_batch_size(),
        batch_delay_ms: default_batch_delay_ms(),
    }
}

fn default_styles() -> HashMap<String, StyleConfig> {
    let mut styles = HashMap::new();
    styles.insert(default_style_name(), cinematic_style());
    styles
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            provider: ProviderConfig::default(),
            retry: RetryConfig::default(),
            rotation: RotationConfig::default(),
            api_keys: Vec::new(),
            styles: default_styles(),
            default_style: default_style_name(),
            database_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(anyhow!("retry.max_attempts must be at least 1"));
        }
        if self.provider.model.trim().is_empty() {
            return Err(anyhow!("provider.model must not be empty"));
        }
        if !self.styles.contains_key(&self.default_style) {
            return Err(anyhow!(
                "default_style `{}` is not defined in styles",
                self.default_style
            ));
        }
        for (name, style) in &self.styles {
            if style.batch_size == 0 {
                return Err(anyhow!("style `{}`: batch_size must be at least 1", name));
            }
        }
        Ok(())
    }

    /// Resolve a style by name, falling back to the default style
    pub fn style(&self, name: &str) -> &StyleConfig {
        self.styles
            .get(name)
            .or_else(|| self.styles.get(&self.default_style))
            .unwrap_or_else(|| {
                // validate() guarantees the default style exists; this is
                // unreachable for a validated config.
                panic!("default style `{}` missing", self.default_style)
            })
    }

    /// Build the retry policy described by this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
            self.retry.backoff_multiplier,
        )
    }

    /// Cooldown between key rotations
    pub fn rotation_cooldown(&self) -> Duration {
        Duration::from_millis(self.rotation.cooldown_ms)
    }
}
