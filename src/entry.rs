//! Decoded login entries and timestamp handling.
//!
//! A [`LoginEntry`] is produced for every used slot of a lastlog file. Times
//! are kept in UTC and converted to the report time zone only when formatted.
use chrono::{DateTime, Local, LocalResult, TimeZone, Utc};

use crate::error::AuditError;
use crate::record::RawRecord;

/// Format used for the `Latest` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Time zone in which reports show login times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneChoice {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEntry {
    /// Record ordinal in the file, which is also the UID.
    pub index: u64,
    pub terminal: String,
    pub hostname: String,
    pub login_time: DateTime<Utc>,
    pub username: Option<String>,
}

impl LoginEntry {
    /// Build an entry from a used slot. Fails only when the time cannot be
    /// represented as a calendar date.
    pub fn from_raw(index: u64, raw: &RawRecord<'_>) -> Result<Self, AuditError> {
        Ok(Self {
            index,
            terminal: raw.terminal_text(),
            hostname: raw.hostname_text(),
            login_time: timestamp_to_datetime(index, raw.login_time)?,
            username: None,
        })
    }

    pub fn username_or_empty(&self) -> &str {
        self.username.as_deref().unwrap_or("")
    }

    pub fn formatted_time(&self, tz: TimeZoneChoice) -> String {
        format_timestamp(&self.login_time, tz)
    }

    /// Report fields in column order: `[Username,] Terminal, From, Latest`.
    pub fn fields(&self, include_username: bool, tz: TimeZoneChoice) -> Vec<String> {
        let mut out = Vec::with_capacity(4);
        if include_username {
            out.push(self.username_or_empty().to_string());
        }
        out.push(self.terminal.clone());
        out.push(self.hostname.clone());
        out.push(self.formatted_time(tz));
        out
    }
}

/// Column titles matching [`LoginEntry::fields`].
pub fn header(include_username: bool) -> &'static [&'static str] {
    if include_username {
        &["Username", "Terminal", "From", "Latest"]
    } else {
        &["Terminal", "From", "Latest"]
    }
}

pub fn timestamp_to_datetime(index: u64, secs: i64) -> Result<DateTime<Utc>, AuditError> {
    match Utc.timestamp_opt(secs, 0) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(dt, _) => Ok(dt),
        LocalResult::None => Err(AuditError::RecordMalformed {
            index,
            reason: format!("login time {secs} is out of range"),
        }),
    }
}

pub fn format_timestamp(dt: &DateTime<Utc>, tz: TimeZoneChoice) -> String {
    match tz {
        TimeZoneChoice::Utc => dt.format(TIMESTAMP_FORMAT).to_string(),
        TimeZoneChoice::Local => dt.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
    }
}
