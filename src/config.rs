// src/config.rs
use crate::constants::{DEFAULT_REQUESTS_PER_HOUR, ENRICHER_IDLE, MAX_WORKERS};
use crate::coverage::JsonCoverageFile;
use crate::error::AppError;
use crate::types::{ApiKey, ValidationError};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding comma-separated API keys.
pub const API_KEYS_ENV: &str = "FLICKR_API_KEYS";

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// SQLite database to store photos and users in
    #[arg(long, env = "FLICKR_HISTORY_DATABASE", default_value = "flickr_history.sqlite")]
    pub database: PathBuf,

    /// Where to keep track of already downloaded time spans
    /// (defaults to flickr-history/coverage.json in the user cache directory)
    #[arg(long)]
    pub coverage_file: Option<PathBuf>,

    /// flickr API key; repeat for several keys. Keys in FLICKR_API_KEYS
    /// (comma-separated) are added.
    #[arg(long = "api-key")]
    pub api_keys: Vec<String>,

    /// Number of concurrent workers, one of which updates user profiles
    /// (default: number of CPUs + 1)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Requests per hour allowed for each API key
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_HOUR)]
    pub requests_per_hour: u32,

    /// Seconds to wait before looking for new user profiles when none are left
    #[arg(long, default_value_t = ENRICHER_IDLE.as_secs())]
    pub enricher_idle_secs: u64,

    /// Enable verbose logging (debug level)
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Do not print the progress line
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

/// Resolved configuration, validated once and handed to every component.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub database: PathBuf,
    pub coverage_file: PathBuf,
    pub api_keys: Vec<ApiKey>,
    /// Worker slots, including the one reserved for the profile enricher
    pub workers: usize,
    pub requests_per_hour: u32,
    pub enricher_idle: Duration,
    pub verbose: bool,
    pub show_progress: bool,
}

impl HarvestConfig {
    /// Resolves a complete configuration from CLI input and environment.
    pub fn resolve(cli: CommandLineInput) -> Result<Self, AppError> {
        Self::resolve_with_env_keys(cli, std::env::var(API_KEYS_ENV).ok())
    }

    fn resolve_with_env_keys(
        cli: CommandLineInput,
        env_keys: Option<String>,
    ) -> Result<Self, AppError> {
        let mut raw_keys = cli.api_keys;
        if let Some(env_keys) = env_keys {
            raw_keys.extend(env_keys.split(',').map(str::to_string));
        }

        let mut api_keys: Vec<ApiKey> = Vec::new();
        for raw in raw_keys.iter().filter(|k| !k.trim().is_empty()) {
            let key = ApiKey::new(raw.as_str())?;
            if !api_keys.contains(&key) {
                api_keys.push(key);
            }
        }
        if api_keys.is_empty() {
            return Err(AppError::MissingConfiguration(format!(
                "no flickr API key given; use --api-key or set {}",
                API_KEYS_ENV
            )));
        }

        let workers = cli.workers.unwrap_or_else(default_workers);
        if workers == 0 || workers > MAX_WORKERS {
            return Err(ValidationError::OutOfBounds {
                value: workers as u64,
                min: 1,
                max: MAX_WORKERS as u64,
            }
            .into());
        }

        if cli.requests_per_hour == 0 {
            return Err(ValidationError::OutOfBounds {
                value: 0,
                min: 1,
                max: u32::MAX as u64,
            }
            .into());
        }

        let coverage_file =
            resolve_coverage_file(cli.coverage_file, JsonCoverageFile::default_path())?;

        Ok(HarvestConfig {
            database: cli.database,
            coverage_file,
            api_keys,
            workers,
            requests_per_hour: cli.requests_per_hour,
            enricher_idle: Duration::from_secs(cli.enricher_idle_secs),
            verbose: cli.verbose,
            show_progress: !cli.quiet,
        })
    }

    /// Concurrent harvest workers: every slot but the enricher's, at least one.
    pub fn harvest_workers(&self) -> usize {
        self.workers.saturating_sub(1).max(1)
    }
}

/// The explicit coverage file, else the platform default.
fn resolve_coverage_file(
    explicit: Option<PathBuf>,
    default: Option<PathBuf>,
) -> Result<PathBuf, AppError> {
    explicit.or(default).ok_or_else(|| {
        AppError::MissingConfiguration(
            "no cache directory on this platform; use --coverage-file".to_string(),
        )
    })
}

/// Available parallelism plus one slot for the profile enricher.
pub fn default_workers() -> usize {
    (num_cpus::get() + 1).min(MAX_WORKERS)
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("flickr_history.sqlite"),
            coverage_file: JsonCoverageFile::default_path()
                .unwrap_or_else(|| PathBuf::from("coverage.json")),
            api_keys: Vec::new(),
            workers: default_workers(),
            requests_per_hour: DEFAULT_REQUESTS_PER_HOUR,
            enricher_idle: ENRICHER_IDLE,
            verbose: false,
            show_progress: false,
        }
    }
}
