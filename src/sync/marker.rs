//! Replication markers
//!
//! JIRA comments have no field to hold "this came from RT history entry X".
//! Instead every replicated comment starts with a deterministic header, and
//! the header doubles as the identity used to recognise the comment later.

use super::ticket::Comment;
use super::timestamp::format_comment_time;
use crate::integrations::BoardComment;
use std::fmt;

/// The `Date:`/`From:` header identifying one replicated RT comment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicationMarker(String);

impl ReplicationMarker {
    pub fn for_comment(comment: &Comment) -> Self {
        Self(format!(
            "Date: {}\nFrom: {}",
            format_comment_time(&comment.created_at),
            comment.creator_name
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `body` carries this marker anywhere
    pub fn is_in(&self, body: &str) -> bool {
        body.contains(&self.0)
    }

    /// The first Board comment carrying this marker
    pub fn find_in<'a>(&self, comments: &'a [BoardComment]) -> Option<&'a BoardComment> {
        comments.iter().find(|c| self.is_in(&c.body))
    }
}

impl fmt::Display for ReplicationMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
