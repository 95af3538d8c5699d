use std::path::{Path, PathBuf};

use clap::Subcommand;
use schemars::JsonSchema;
use serde::Deserialize;

/// Top-level configuration for nightly-status.
#[derive(Debug, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Issue tracker connection settings.
    pub tracker: TrackerConfig,

    /// Build download directory settings.
    pub downloads: DownloadsConfig,

    /// Rendered page settings.
    #[serde(default)]
    pub page: PageConfig,
}

/// Issue tracker connection settings.
#[derive(Debug, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Base URL of the tracker instance, e.g. "https://example.org/fogbugz/".
    pub base_url: String,

    /// Account email used to open the API session.
    pub email: String,

    /// Account password used to open the API session.
    pub password: String,

    /// Tracker project whose milestones are listed (default: 1).
    #[serde(default = "default_project_id")]
    #[schemars(default = "default_project_id")]
    pub project_id: u32,

    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    #[schemars(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Build download directory settings.
#[derive(Debug, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DownloadsConfig {
    /// Directory scanned for build artifacts.
    pub dir: PathBuf,

    /// URL prefix the artifact filenames are appended to for download links.
    pub url_prefix: String,
}

/// Rendered page settings.
#[derive(Debug, Deserialize, JsonSchema, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PageConfig {
    /// Page title (default: "Development Snapshots").
    #[serde(default = "default_title")]
    #[schemars(default = "default_title")]
    pub title: String,

    /// Issue titles longer than this many characters are truncated (default: 80).
    #[serde(default = "default_summary_length")]
    #[schemars(default = "default_summary_length")]
    pub summary_length: usize,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            summary_length: default_summary_length(),
        }
    }
}

fn default_project_id() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_title() -> String {
    "Development Snapshots".to_string()
}

fn default_summary_length() -> usize {
    80
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No config file found at any searched location.
    #[error("No config file found (searched {searched}); pass --config")]
    NotFound { searched: String },

    /// Failed to read config file (permission error, etc.)
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parse error
    #[error("Invalid config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },
}

const DEFAULT_CONFIG_FILES: [&str; 2] = ["nightly-status.yaml", "nightly-status.yml"];

/// Load configuration from an explicit path, or from
/// nightly-status.ya?ml in the current directory when no path is given.
/// Unlike most tools there is no defaults-only fallback: the tracker
/// credentials are required, so a missing file is an error.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        return parse_config(&content, path);
    }

    for filename in &DEFAULT_CONFIG_FILES {
        let path = Path::new(filename);
        match std::fs::read_to_string(path) {
            Ok(content) => return parse_config(&content, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }
                .into());
            }
        }
    }

    Err(ConfigError::NotFound {
        searched: DEFAULT_CONFIG_FILES.join(", "),
    }
    .into())
}

/// Parse YAML content into Config.
fn parse_config(content: &str, path: &Path) -> anyhow::Result<Config> {
    serde_yaml::from_str(content)
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
        .map_err(Into::into)
}

/// Generate JSON Schema for the Config struct.
pub fn generate_schema() -> schemars::Schema {
    schemars::schema_for!(Config)
}

/// Configuration management commands.
#[derive(Subcommand, Clone, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print JSON Schema for the configuration file
    Schema,
}

impl ConfigCommands {
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Self::Schema => {
                let schema = generate_schema();
                let json = serde_json::to_string_pretty(&schema)?;
                println!("{json}");
                Ok(())
            }
        }
    }
}
