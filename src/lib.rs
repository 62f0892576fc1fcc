//! rt2jira - one-way sync of Request Tracker tickets into JIRA
//!
//! Each pass reads the RT tickets updated since the last pass, finds or
//! creates a matching JIRA issue for each, and appends every new human RT
//! comment to that issue exactly once.
//!
//! # Architecture
//!
//! - **config**: YAML configuration, validation, sanity gate
//! - **integrations**: RT and JIRA clients behind the `TrackerClient` and
//!   `BoardClient` traits
//! - **sync**: normalization, matching, comment reconciliation, watermark
//! - **logging**: tracing subscriber setup

pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod sync;

// Re-exports
pub use error::{Result, Rt2JiraError};
