//! Error types for rt2jira
//!
//! One crate-level enum covers the failure modes of a sync run. The two HTTP
//! collaborators carry their own closed error enums ([`TrackerError`] and
//! [`BoardError`]) which convert into it at the boundary.

use crate::integrations::jira::BoardError;
use crate::integrations::rt::TrackerError;
use thiserror::Error;

/// Result type alias for rt2jira operations
pub type Result<T> = std::result::Result<T, Rt2JiraError>;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Rt2JiraError {
    /// Missing or invalid configuration, or the sanity gate is not set
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collaborator could not be reached at startup
    #[error("Connection error: {0}")]
    Connection(String),

    /// A Tracker timestamp did not match the expected format
    #[error("Malformed timestamp {value:?} (expected format {format:?})")]
    MalformedTimestamp { value: String, format: &'static str },

    /// A Tracker record is missing a required field
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// Tracker (RT) operation failed
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    /// Board (JIRA) operation failed
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    /// Writing the new watermark failed
    #[error("Persist error: {0}")]
    Persist(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Rt2JiraError {
    /// True for failures scoped to a single Tracker record.
    ///
    /// The driver may skip the offending ticket or comment instead of
    /// aborting the run, depending on `sync.abort_on_malformed`.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            Rt2JiraError::MalformedTimestamp { .. } | Rt2JiraError::MalformedRecord(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_scoped_errors() {
        let ts = Rt2JiraError::MalformedTimestamp {
            value: "yesterday".to_string(),
            format: "%Y-%m-%d %H:%M:%S",
        };
        assert!(ts.is_record_scoped());
        assert!(Rt2JiraError::MalformedRecord("no id".to_string()).is_record_scoped());

        assert!(!Rt2JiraError::Config("missing".to_string()).is_record_scoped());
        assert!(!Rt2JiraError::Persist("disk full".to_string()).is_record_scoped());
        assert!(!Rt2JiraError::Board(BoardError::Auth("401".to_string())).is_record_scoped());
    }

    #[test]
    fn test_error_display() {
        let err = Rt2JiraError::MalformedTimestamp {
            value: "bogus".to_string(),
            format: "%a %b %d %H:%M:%S %Y",
        };
        let msg = err.to_string();
        assert!(msg.contains("bogus"));
        assert!(msg.contains("%a %b %d"));

        let err: Rt2JiraError = TrackerError::Auth("bad password".to_string()).into();
        assert!(err.to_string().starts_with("Tracker error"));
    }
}
