//! rt2jira configuration file handling
//!
//! Loads and saves the YAML config file. The same file is the watermark store:
//! `rt.last_fetched_timestamp` is read at startup and rewritten after a
//! successful run.

use crate::{Result, Rt2JiraError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Operator review gate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanityConfig {
    /// Must be set to `true` by hand before the first run
    #[serde(default)]
    pub reviewed: bool,
}

/// Request Tracker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtConfig {
    /// REST root, e.g. `https://rt.example.com/REST/1.0/`
    pub api_url_prefix: String,

    pub username: String,

    pub password: String,

    /// Search path appended to the REST root; must request `format=l`
    pub api_search_suffix: String,

    /// Prefix of the human-facing ticket URL written into issue descriptions
    pub url_ticket_display_prefix: String,

    /// Persisted watermark in RT ticket time format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched_timestamp: Option<String>,
}

/// JIRA settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// JIRA base URL, e.g. `https://jira.example.com`
    pub api_url_prefix: String,

    /// Verify TLS certificates
    #[serde(default = "default_verify")]
    pub verify: bool,

    pub username: String,

    pub password: String,

    /// Project key issues are created in
    pub project: String,

    /// Component assigned to created issues and used to scope searches
    pub component: String,

    /// Issue type for created issues
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
}

fn default_verify() -> bool {
    true
}

fn default_issue_type() -> String {
    "Bug".to_string()
}

/// HTTP behaviour shared by both clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for idempotent reads; writes are never retried
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Sync engine options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Abort the whole run on the first malformed ticket or comment
    /// instead of skipping it
    #[serde(default)]
    pub abort_on_malformed: bool,
}

/// rt2jira configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rt2JiraConfig {
    #[serde(default)]
    pub sanity: SanityConfig,

    pub rt: RtConfig,

    pub jira: JiraConfig,

    #[serde(default)]
    pub http: HttpSettings,

    #[serde(default)]
    pub sync: SyncOptions,
}

impl Rt2JiraConfig {
    /// Load configuration from a specific path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Rt2JiraError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::debug!(path = %path.display(), "Loading rt2jira configuration");

        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        tracing::debug!(
            project = %config.jira.project,
            component = %config.jira.component,
            watermark = ?config.rt.last_fetched_timestamp,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Save configuration to a specific path
    ///
    /// Writes a sibling temp file first and renames it over the target so an
    /// interrupted write never leaves a truncated config behind.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)?;
        let tmp = tmp_path(path);
        fs::write(&tmp, yaml)?;
        fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), "Saved rt2jira configuration");
        Ok(())
    }

    /// Fail unless the operator has reviewed the file
    pub fn require_reviewed(&self, path: &Path) -> Result<()> {
        if self.sanity.reviewed {
            Ok(())
        } else {
            Err(Rt2JiraError::Config(format!(
                "Please review and change the {} settings before running (set sanity.reviewed: true)",
                path.display()
            )))
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
