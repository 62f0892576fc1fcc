//! Ticket normalization
//!
//! Turns raw RT records into the canonical [`Ticket`] and [`Comment`] values
//! the rest of the sync works with.

use super::timestamp::{parse_comment_time, parse_ticket_time};
use crate::integrations::RawRecord;
use crate::{Result, Rt2JiraError};
use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use titlecase::titlecase;

/// Creator name RT uses for its own automatic history entries
pub const RT_SYSTEM_ACTOR: &str = "RT_System";

lazy_static! {
    static ref REPLY_PREFIX: Regex = Regex::new(r"(?i)^(re|fw|fwd):( |)").expect("Failed to compile reply prefix pattern");
}

/// One RT ticket, as seen by a single sync pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: String,
    pub requester_name: String,
    pub subject: String,
    pub scrubbed_subject: String,
    pub created_at: NaiveDateTime,
    pub last_updated_at: NaiveDateTime,
}

impl Ticket {
    /// Build a ticket from a feed record
    pub fn from_record(record: &RawRecord) -> Result<Self> {
        let raw_id = required(record, "id")?;
        let id = raw_id.strip_prefix("ticket/").unwrap_or(raw_id).to_string();

        let subject = required(record, "Subject")?.to_string();
        let requester_name = requester_display_name(required(record, "Requestors")?);
        let created_at = parse_ticket_time(required(record, "Created")?)?;
        let last_updated_at = parse_ticket_time(required(record, "LastUpdated")?)?;

        Ok(Self {
            id,
            requester_name,
            scrubbed_subject: scrub_subject(&subject).to_string(),
            subject,
            created_at,
            last_updated_at,
        })
    }

    /// `"<Requester>: <scrubbed subject>"`, used as the Board issue summary
    pub fn summary(&self) -> String {
        format!("{}: {}", self.requester_name, self.scrubbed_subject)
    }
}

/// One RT history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub ticket_id: String,
    pub creator_identity: String,
    pub creator_name: String,
    pub created_at: NaiveDateTime,
    pub action_description: String,
    pub content: String,
    pub is_system_generated: bool,
}

impl Comment {
    /// Build a comment from a history record of `ticket_id`
    pub fn from_record(ticket_id: &str, record: &RawRecord) -> Result<Self> {
        let creator_identity = required(record, "Creator")?.to_string();
        let created_at = parse_comment_time(required(record, "Created")?)?;

        Ok(Self {
            ticket_id: ticket_id.to_string(),
            creator_name: strip_domain(&creator_identity).to_string(),
            is_system_generated: creator_identity == RT_SYSTEM_ACTOR,
            creator_identity,
            created_at,
            action_description: record.get("Description").unwrap_or_default().to_string(),
            content: record.get("Content").unwrap_or_default().to_string(),
        })
    }
}

fn required<'a>(record: &'a RawRecord, field: &str) -> Result<&'a str> {
    record.get(field).ok_or_else(|| {
        Rt2JiraError::MalformedRecord(format!(
            "missing field {:?} (record id {:?})",
            field,
            record.get("id").unwrap_or("?")
        ))
    })
}

/// Everything before the first `@`
pub fn strip_domain(identity: &str) -> &str {
    identity.split('@').next().unwrap_or(identity)
}

/// `john.smith2@example.com` becomes `John Smith`
pub fn requester_display_name(identity: &str) -> String {
    let local: String = strip_domain(identity)
        .replace('.', " ")
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect();
    titlecase(&local)
}

/// Remove one leading `re:`, `fw:` or `fwd:` (any case, optional space)
pub fn scrub_subject(subject: &str) -> &str {
    match REPLY_PREFIX.find(subject) {
        Some(m) => &subject[m.end()..],
        None => subject,
    }
}
