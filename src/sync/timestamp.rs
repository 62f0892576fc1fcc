//! RT timestamp formats
//!
//! RT prints ticket times and history times differently, and neither carries a
//! zone. Everything here is a [`NaiveDateTime`] in RT's wall-clock time.

use crate::{Result, Rt2JiraError};
use chrono::{DateTime, NaiveDateTime};

/// Ticket `Created` / `LastUpdated`, and the persisted watermark
pub const TICKET_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// History entry `Created`
pub const COMMENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Comment time as written into Board comment bodies
pub const COMMENT_DISPLAY_FORMAT: &str = "%a %b %d %H:%M:%S %Y UTC";

/// The watermark used when none has been stored yet
pub fn epoch() -> NaiveDateTime {
    DateTime::UNIX_EPOCH.naive_utc()
}

pub fn parse_ticket_time(value: &str) -> Result<NaiveDateTime> {
    parse(value, TICKET_TIME_FORMAT)
}

pub fn format_ticket_time(time: &NaiveDateTime) -> String {
    time.format(TICKET_TIME_FORMAT).to_string()
}

pub fn parse_comment_time(value: &str) -> Result<NaiveDateTime> {
    parse(value, COMMENT_TIME_FORMAT)
}

pub fn format_comment_time(time: &NaiveDateTime) -> String {
    time.format(COMMENT_DISPLAY_FORMAT).to_string()
}

fn parse(value: &str, format: &'static str) -> Result<NaiveDateTime> {
    // RT pads single-digit days with a space ("Jul  4")
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&collapsed, format).map_err(|_| {
        Rt2JiraError::MalformedTimestamp {
            value: value.to_string(),
            format,
        }
    })
}
