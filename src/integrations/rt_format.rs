//! RT REST 1.0 response parsing
//!
//! RT answers every REST 1.0 call with a plain-text document:
//!
//! ```text
//! RT/4.4.4 200 Ok
//!
//! # 2/2 (id/1071/total)
//!
//! id: 1071
//! Ticket: 77
//! Content: first line
//!          second line
//!
//! Creator: jane@example.com
//!
//! --
//!
//! id: 1072
//! ```
//!
//! Records are separated by a `--` line. Multi-line values continue on lines
//! indented by `len(key) + 2` spaces.

use super::rt::TrackerError;
use serde::Serialize;

/// One record of an RT response: ordered `key: value` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from pairs, mostly for fixtures
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// First value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Parsed status line of an RT response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtStatus {
    pub version: String,
    pub code: u16,
    pub message: String,
}

/// Parse the `RT/<version> <code> <message>` status line
pub fn parse_status_line(line: &str) -> Result<RtStatus, TrackerError> {
    let bad = || TrackerError::Parse(format!("unexpected RT status line: {:?}", line));

    let rest = line.trim().strip_prefix("RT/").ok_or_else(bad)?;
    let mut parts = rest.splitn(3, ' ');
    let version = parts.next().ok_or_else(bad)?.to_string();
    let code = parts
        .next()
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(bad)?;
    let message = parts.next().unwrap_or_default().trim().to_string();

    Ok(RtStatus {
        version,
        code,
        message,
    })
}

/// Parse a full RT REST 1.0 response body into records
///
/// Non-200 statuses become [`TrackerError::Auth`] (401) or
/// [`TrackerError::Api`]. Comment lines (`# ...`) and free-text lines such as
/// `No matching results.` are ignored.
pub fn parse_response(body: &str) -> Result<Vec<RawRecord>, TrackerError> {
    let mut lines = body.lines();
    let status_line = lines
        .by_ref()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| TrackerError::Parse("empty RT response".to_string()))?;

    let status = parse_status_line(status_line)?;
    match status.code {
        200 => {}
        401 => return Err(TrackerError::Auth(status.message)),
        code => {
            return Err(TrackerError::Api {
                status: code,
                message: status.message,
            })
        }
    }

    let mut records = Vec::new();
    let mut current = RawRecord::new();
    // Key of the field currently accepting continuation lines
    let mut open_key: Option<String> = None;

    for line in lines {
        if line == "--" {
            finish_record(&mut current, &mut records);
            open_key = None;
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(key) = open_key.as_deref() {
                let indent = key.len() + 2;
                let stripped = strip_indent(line, indent);
                if let Some((_, value)) = current.fields.last_mut() {
                    value.push('\n');
                    value.push_str(stripped);
                }
            }
            continue;
        }

        if line.trim().is_empty() || line.starts_with('#') {
            open_key = None;
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) if !key.is_empty() => {
                let value = value.strip_prefix(' ').unwrap_or(value);
                current.push(key, value);
                open_key = Some(key.to_string());
            }
            _ => {
                tracing::debug!(line = %line, "Ignoring non-field line in RT response");
                open_key = None;
            }
        }
    }
    finish_record(&mut current, &mut records);

    Ok(records)
}

fn finish_record(current: &mut RawRecord, records: &mut Vec<RawRecord>) {
    if current.is_empty() {
        return;
    }
    for (_, value) in current.fields.iter_mut() {
        let trimmed_len = value.trim_end().len();
        value.truncate(trimmed_len);
    }
    records.push(std::mem::take(current));
}

/// Remove up to `indent` leading whitespace characters
fn strip_indent(line: &str, indent: usize) -> &str {
    let leading = line
        .char_indices()
        .take(indent)
        .take_while(|(_, c)| *c == ' ' || *c == '\t')
        .count();
    &line[leading..]
}
