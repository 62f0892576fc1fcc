//! Comment reconciliation
//!
//! Replays RT history onto a JIRA issue exactly once. A history entry is
//! written only if it is a human comment, newer than the watermark, and its
//! [`ReplicationMarker`] is not already on the issue.

use super::marker::ReplicationMarker;
use super::ticket::Comment;
use super::timestamp::format_comment_time;
use crate::integrations::{BoardClient, BoardComment, Issue};
use crate::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

/// Longest comment body JIRA accepts, in characters
pub const MAX_COMMENT_LENGTH: usize = 32_000;

/// Appended to bodies cut down to [`MAX_COMMENT_LENGTH`]
pub const TRUNCATION_SUFFIX: &str = "...";

/// What happened to one history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CommentDisposition {
    SystemGenerated,
    AtOrBeforeWatermark,
    AlreadyPresent,
    Added,
}

/// Per-ticket reconciliation counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub added: u32,
    pub already_present: u32,
    pub skipped_system: u32,
    pub skipped_old: u32,
    /// Newest timestamp among candidate comments (added or already present)
    pub latest_activity: Option<NaiveDateTime>,
}

impl ReconcileOutcome {
    fn record(&mut self, disposition: CommentDisposition, comment: &Comment) {
        match disposition {
            CommentDisposition::SystemGenerated => self.skipped_system += 1,
            CommentDisposition::AtOrBeforeWatermark => self.skipped_old += 1,
            CommentDisposition::AlreadyPresent => self.already_present += 1,
            CommentDisposition::Added => self.added += 1,
        }
        if matches!(
            disposition,
            CommentDisposition::AlreadyPresent | CommentDisposition::Added
        ) {
            self.latest_activity = self.latest_activity.max(Some(comment.created_at));
        }
    }
}

/// Replicates comments newer than a fixed watermark
#[derive(Debug, Clone, Copy)]
pub struct CommentReconciler {
    watermark: NaiveDateTime,
}

impl CommentReconciler {
    pub fn new(watermark: NaiveDateTime) -> Self {
        Self { watermark }
    }

    /// Human comments strictly newer than the watermark
    pub fn is_candidate(&self, comment: &Comment) -> bool {
        !comment.is_system_generated && comment.created_at > self.watermark
    }

    /// Reconcile `comments` (in RT order) onto `issue`
    ///
    /// `existing` is the issue's comments as fetched before any write. It is
    /// not updated with comments added here: two entries by the same author
    /// in the same second share a marker and must both be written.
    pub async fn reconcile(
        &self,
        board: &dyn BoardClient,
        issue: &Issue,
        existing: &[BoardComment],
        comments: &[Comment],
    ) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();

        for comment in comments {
            let disposition = self.reconcile_one(board, issue, existing, comment).await?;
            outcome.record(disposition, comment);
        }

        Ok(outcome)
    }

    async fn reconcile_one(
        &self,
        board: &dyn BoardClient,
        issue: &Issue,
        existing: &[BoardComment],
        comment: &Comment,
    ) -> Result<CommentDisposition> {
        if comment.is_system_generated {
            return Ok(CommentDisposition::SystemGenerated);
        }
        if !self.is_candidate(comment) {
            debug!(ticket = %comment.ticket_id, "RT comment older than stored timestamp, skipping");
            return Ok(CommentDisposition::AtOrBeforeWatermark);
        }

        let marker = ReplicationMarker::for_comment(comment);
        if let Some(found) = marker.find_in(existing) {
            debug!(
                issue = %issue.key,
                comment = %found.id,
                "RT comment already exists, skipping"
            );
            return Ok(CommentDisposition::AlreadyPresent);
        }

        info!(
            issue = %issue.key,
            creator = %comment.creator_name,
            date = %format_comment_time(&comment.created_at),
            "Adding new comment"
        );
        let body = truncate_body(build_comment_body(comment));
        let added = board.add_comment(issue, &body).await?;
        debug!(issue = %issue.key, comment = %added.id, "Comment added");

        Ok(CommentDisposition::Added)
    }
}

/// Full Board comment body; always starts with the replication marker
pub fn build_comment_body(comment: &Comment) -> String {
    format!(
        "Date: {}\nFrom: {}\nTicket ID: {}\nAction: {}\n\n{}",
        format_comment_time(&comment.created_at),
        comment.creator_identity,
        comment.ticket_id,
        comment.action_description,
        comment.content
    )
}

/// Cut bodies over [`MAX_COMMENT_LENGTH`] characters down to exactly that
/// length, ending in [`TRUNCATION_SUFFIX`]
pub fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_COMMENT_LENGTH {
        return body;
    }
    let keep = MAX_COMMENT_LENGTH - TRUNCATION_SUFFIX.chars().count();
    let cut = body
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(body.len());

    let mut truncated = String::with_capacity(cut + TRUNCATION_SUFFIX.len());
    truncated.push_str(&body[..cut]);
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}
