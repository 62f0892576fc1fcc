//! Configuration system
//!
//! Loads the YAML config file (default `./config.yaml`) with:
//! - RT REST credentials, search path and the persisted watermark
//! - JIRA credentials, project, component and issue type
//! - HTTP timeout/retry settings and sync options
//! - The `sanity.reviewed` gate

mod rt2jira_config;
pub mod validation;

pub use rt2jira_config::{
    HttpSettings, JiraConfig, Rt2JiraConfig, RtConfig, SanityConfig, SyncOptions,
    DEFAULT_CONFIG_FILE,
};
pub use validation::{validate_config, validate_config_result, ValidationError};
