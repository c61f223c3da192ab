// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use app_controller::{Controller, mask_key};
use crate::app_config::{Config, LogLevel};

mod app_config;
mod app_controller;
mod database;
mod errors;
mod file_utils;
mod generation;
mod jobs;
mod key_pool;
mod pipeline;
mod providers;
mod retry;
mod scheduler;
mod segments;
mod validation;

/// CLI wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit an input file or directory as generation jobs
    Submit {
        /// Input file or directory (.txt/.json)
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Style to generate with (defaults to the configured default style)
        #[arg(short, long)]
        style: Option<String>,
    },

    /// Run all pending jobs through the generation pipeline
    Run,

    /// Show all jobs and their pipeline state
    Status,

    /// Manage stored API keys
    Keys {
        #[command(subcommand)]
        command: KeysCommand,
    },

    /// Generate shell completions for sceneforge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Store a new API key
    Add {
        /// The key string
        key: String,
    },
    /// List stored API keys (masked)
    List,
    /// Remove a stored API key by id
    Remove {
        /// Key id as shown by `keys list`
        id: String,
    },
}

/// sceneforge - AI storyboard generation pipeline
///
/// Turns voice/text transcripts into storyboards in three stages: character
/// extraction, visual-prompt synthesis, and batched scene generation.
#[derive(Parser, Debug)]
#[command(name = "sceneforge")]
#[command(version = "0.1.0")]
#[command(about = "AI storyboard generation pipeline")]
#[command(long_about = "sceneforge drives text transcripts through a three-stage AI generation \
pipeline: character extraction, visual-prompt synthesis, and batched scene generation.

EXAMPLES:
    sceneforge keys add AIza...                # Store an API key
    sceneforge submit script.txt               # Queue one job
    sceneforge submit ./transcripts/ -s noir   # Queue a directory with a style
    sceneforge run                             # Drain all pending jobs
    sceneforge status                          # Inspect job state
    sceneforge completions bash                # Generate bash completions

CONFIGURATION:
    Configuration is stored in sceneforge.json by default. You can specify a
    different config file with --config. If the config file doesn't exist, a
    default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "sceneforge.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// Minimal stderr logger with timestamps and level colors
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the level is adjusted once config and CLI flags are read.
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "sceneforge", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_or_create_config(&cli.config_path, cli.log_level)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;

    match cli.command {
        Commands::Submit { input_path, style } => {
            let ids = controller.submit_path(&input_path, style).await?;
            for id in &ids {
                println!("queued {}", id);
            }
            println!("{} job(s) queued", ids.len());
        }
        Commands::Run => {
            let summary = controller.run().await?;
            println!(
                "{} completed, {} failed",
                summary.completed, summary.failed
            );
        }
        Commands::Status => {
            let jobs = controller.status().await?;
            if jobs.is_empty() {
                println!("no jobs");
            }
            for job in jobs {
                println!(
                    "{}  {:10}  step={:9}  scenes={}/{}  style={}{}",
                    job.short_id(),
                    job.status.to_string(),
                    job.current_step.to_string(),
                    job.scenes.len(),
                    job.segments.len(),
                    job.style,
                    job.error_message
                        .as_deref()
                        .map(|e| format!("  error: {}", e))
                        .unwrap_or_default()
                );
            }
        }
        Commands::Keys { command } => match command {
            KeysCommand::Add { key } => {
                let id = controller.add_key(&key).await?;
                println!("stored key {}", id);
            }
            KeysCommand::List => {
                let keys = controller.list_keys().await?;
                if keys.is_empty() {
                    println!("no keys stored");
                }
                for key in keys {
                    println!("{}  {}", key.id, mask_key(&key.key));
                }
            }
            KeysCommand::Remove { id } => {
                if controller.remove_key(&id).await? {
                    println!("removed key {}", id);
                } else {
                    println!("no key with id {}", id);
                }
            }
        },
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

fn load_or_create_config(config_path: &str, cli_level: Option<CliLogLevel>) -> Result<Config> {
    let mut config = if Path::new(config_path).exists() {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path))?
    } else {
        warn!("Config file not found at '{}', creating default config.", config_path);
        let config = Config::default();
        config.save_to_file(config_path)?;
        config
    };

    if let Some(level) = cli_level {
        config.log_level = level.into();
    }

    Ok(config)
}
