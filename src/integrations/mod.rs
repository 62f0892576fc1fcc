//! External Integrations
//!
//! Collaborators on both ends of the sync and the traits the core talks to.
//!
//! # Overview
//!
//! - **RT** ([`rt::RtClient`]): the Tracker. Read only: the ticket feed and
//!   per-ticket history.
//! - **JIRA** ([`jira::JiraAdapter`]): the Board. Search, create, list and
//!   append comments.
//!
//! The sync engine only sees [`TrackerClient`] and [`BoardClient`], so tests
//! and alternative backends plug in without touching it.

pub mod jira;
pub mod retry;
pub mod rt;
pub mod rt_format;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use jira::{BoardError, JiraAdapter};
pub use retry::{RetryConfig, RetryDecision, RetryableError};
pub use rt::{RtClient, TrackerError};
pub use rt_format::RawRecord;

/// A Board issue as seen by the sync engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Opaque issue key (e.g. `SUP-42`)
    pub key: String,
    pub summary: String,
    /// Creation time as reported by the Board, if it was requested
    pub created: Option<String>,
}

/// A comment attached to a Board issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardComment {
    pub id: String,
    pub body: String,
}

/// Fields for a Board issue about to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub project: String,
    pub summary: String,
    pub description: String,
    pub issue_type: String,
    pub component: String,
}

/// Source ticketing system
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Run the configured search and return one raw record per ticket
    async fn fetch_feed(&self, query: &str) -> Result<Vec<RawRecord>, TrackerError>;

    /// Return the ticket's history entries in the order the Tracker lists them
    async fn fetch_history(&self, ticket_id: &str) -> Result<Vec<RawRecord>, TrackerError>;
}

/// Destination issue tracker
#[async_trait]
pub trait BoardClient: Send + Sync {
    /// Run a JQL query; results keep the order the query asked for
    async fn search_issues(&self, jql: &str) -> Result<Vec<Issue>, BoardError>;

    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue, BoardError>;

    /// All comments currently on the issue, including ones added by people
    async fn list_comments(&self, issue: &Issue) -> Result<Vec<BoardComment>, BoardError>;

    async fn add_comment(&self, issue: &Issue, body: &str) -> Result<BoardComment, BoardError>;
}
