//! Per-ticket synchronization
//!
//! Finds or creates the Board issue for one ticket, then reconciles the
//! ticket's RT history onto it.

use super::matcher::{MatchStrategy, SummarySearchMatcher};
use super::reconciler::{CommentReconciler, ReconcileOutcome};
use super::ticket::{Comment, Ticket};
use super::timestamp::format_ticket_time;
use crate::config::Rt2JiraConfig;
use crate::integrations::{BoardClient, Issue, NewIssue, TrackerClient};
use crate::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Everything the sync core needs from the configuration
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub project: String,
    pub component: String,
    pub issue_type: String,
    /// Prefix of the human-facing RT ticket URL
    pub display_prefix: String,
    /// Feed query appended to the RT REST root
    pub feed_query: String,
    pub abort_on_malformed: bool,
}

impl SyncSettings {
    pub fn from_config(config: &Rt2JiraConfig) -> Self {
        Self {
            project: config.jira.project.clone(),
            component: config.jira.component.clone(),
            issue_type: config.jira.issue_type.clone(),
            display_prefix: config.rt.url_ticket_display_prefix.clone(),
            feed_query: config.rt.api_search_suffix.clone(),
            abort_on_malformed: config.sync.abort_on_malformed,
        }
    }
}

/// Outcome of one ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TicketOutcome {
    /// Not updated since the watermark; nothing was called
    Skipped,
    Synced(TicketReport),
}

/// What a synchronized ticket produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketReport {
    pub issue_key: String,
    pub created: bool,
    pub comments: ReconcileOutcome,
    /// History entries dropped because they could not be normalized
    pub malformed_comments: u32,
}

/// Drives one ticket through matching, issue creation and reconciliation
pub struct IssueSynchronizer {
    settings: SyncSettings,
    matcher: Box<dyn MatchStrategy>,
}

impl IssueSynchronizer {
    /// Synchronizer using the summary search matcher
    pub fn new(settings: SyncSettings) -> Self {
        let matcher = SummarySearchMatcher::new(&settings.project, &settings.component);
        Self::with_matcher(settings, Box::new(matcher))
    }

    pub fn with_matcher(settings: SyncSettings, matcher: Box<dyn MatchStrategy>) -> Self {
        Self { settings, matcher }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Tickets untouched since the watermark are left alone
    pub fn should_skip(ticket: &Ticket, watermark: NaiveDateTime) -> bool {
        ticket.last_updated_at <= watermark
    }

    pub async fn synchronize(
        &self,
        tracker: &dyn TrackerClient,
        board: &dyn BoardClient,
        ticket: &Ticket,
        watermark: NaiveDateTime,
    ) -> Result<TicketOutcome> {
        if Self::should_skip(ticket, watermark) {
            debug!(
                ticket = %ticket.id,
                last_updated = %format_ticket_time(&ticket.last_updated_at),
                "RT ticket older than stored timestamp, skipping"
            );
            return Ok(TicketOutcome::Skipped);
        }

        info!(ticket = %ticket.id, summary = %ticket.summary(), "Processing RT ticket");

        let (issue, created) = match self.matcher.find_issue(board, ticket).await? {
            Some(issue) => (issue, false),
            None => (self.create_issue(board, ticket).await?, true),
        };

        let existing = board.list_comments(&issue).await?;
        debug!(issue = %issue.key, count = existing.len(), "Fetched existing JIRA comments");

        let (comments, malformed_comments) = self.load_history(tracker, &ticket.id).await?;

        let reconciler = CommentReconciler::new(watermark);
        let outcome = reconciler
            .reconcile(board, &issue, &existing, &comments)
            .await?;

        Ok(TicketOutcome::Synced(TicketReport {
            issue_key: issue.key,
            created,
            comments: outcome,
            malformed_comments,
        }))
    }

    async fn create_issue(&self, board: &dyn BoardClient, ticket: &Ticket) -> Result<Issue> {
        let new_issue = NewIssue {
            project: self.settings.project.clone(),
            summary: ticket.summary(),
            description: build_description(ticket, &self.settings.display_prefix),
            issue_type: self.settings.issue_type.clone(),
            component: self.settings.component.clone(),
        };
        let issue = board.create_issue(&new_issue).await?;
        info!(ticket = %ticket.id, issue = %issue.key, "Created new JIRA issue");
        Ok(issue)
    }

    /// Fetch and normalize history, honouring the malformed-record policy
    async fn load_history(
        &self,
        tracker: &dyn TrackerClient,
        ticket_id: &str,
    ) -> Result<(Vec<Comment>, u32)> {
        let records = tracker.fetch_history(ticket_id).await?;
        let mut comments = Vec::with_capacity(records.len());
        let mut malformed = 0;

        for record in &records {
            match Comment::from_record(ticket_id, record) {
                Ok(comment) => comments.push(comment),
                Err(e) if e.is_record_scoped() && !self.settings.abort_on_malformed => {
                    warn!(ticket = %ticket_id, error = %e, "Skipping malformed RT history entry");
                    malformed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((comments, malformed))
    }
}

/// Description of a newly created issue
pub fn build_description(ticket: &Ticket, display_prefix: &str) -> String {
    format!(
        "Ticket ID: {id}\n{prefix}{id}\nTitle: {title}\nRequester: {requester}\nCreated Date: {created}",
        id = ticket.id,
        prefix = display_prefix,
        title = ticket.scrubbed_subject,
        requester = ticket.requester_name,
        created = format_ticket_time(&ticket.created_at),
    )
}
