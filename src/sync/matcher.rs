//! Ticket to issue matching
//!
//! There is no stored mapping between RT ticket ids and JIRA keys. The
//! [`SummarySearchMatcher`] rediscovers the issue for a ticket by running a
//! fuzzy text search on the summary it would have been created with.
//!
//! This is a heuristic. Short or generic subjects can miss an existing issue
//! (a duplicate gets created) or hit an unrelated one (comments land on the
//! wrong issue).

use super::ticket::Ticket;
use crate::integrations::{BoardClient, Issue};
use crate::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

lazy_static! {
    static ref NON_SEARCH_CHARS: Regex = Regex::new(r"[^0-9A-Za-z.\- ]").expect("Failed to compile search sanitizer");
}

/// Decides which Board issue, if any, already represents a ticket
#[async_trait]
pub trait MatchStrategy: Send + Sync {
    async fn find_issue(&self, board: &dyn BoardClient, ticket: &Ticket) -> Result<Option<Issue>>;
}

/// Fuzzy search on the sanitized `"<Requester>: <subject>"` summary,
/// scoped to one project and component. The oldest hit wins.
#[derive(Debug, Clone)]
pub struct SummarySearchMatcher {
    project: String,
    component: String,
}

impl SummarySearchMatcher {
    pub fn new(project: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            component: component.into(),
        }
    }

    /// JQL for the given search terms, oldest issue first
    pub fn build_query(&self, terms: &str) -> String {
        format!(
            "project = {} AND component = \"{}\" AND summary ~ \"{}\" ORDER BY created ASC",
            self.project, self.component, terms
        )
    }
}

#[async_trait]
impl MatchStrategy for SummarySearchMatcher {
    async fn find_issue(&self, board: &dyn BoardClient, ticket: &Ticket) -> Result<Option<Issue>> {
        let terms = sanitize_summary(&ticket.summary());
        if terms.is_empty() {
            warn!(
                ticket = %ticket.id,
                summary = %ticket.summary(),
                "No usable search terms in summary; treating as unmatched"
            );
            return Ok(None);
        }
        debug!(ticket = %ticket.id, terms = %terms, "JQL search terms");

        let results = board.search_issues(&self.build_query(&terms)).await?;
        let found = results.into_iter().next();
        if let Some(ref issue) = found {
            info!(ticket = %ticket.id, issue = %issue.key, "Found existing JIRA issue");
        }
        Ok(found)
    }
}

/// Reduce a summary to safe, reasonably distinctive search terms
///
/// Characters outside `[0-9A-Za-z.- ]` become spaces, tokens of three
/// characters or fewer are dropped, and any `--` left after re-joining is
/// removed.
pub fn sanitize_summary(summary: &str) -> String {
    let replaced = NON_SEARCH_CHARS.replace_all(summary, " ");
    replaced
        .split(' ')
        .filter(|token| token.len() > 3)
        .collect::<Vec<_>>()
        .join(" ")
        .replace("--", "")
}
