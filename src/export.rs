//! Export helpers for writing login entries to CSV and plain text files.
//!
//! - `save_csv` writes a header row and one row per entry.
//! - `save_txt` writes exactly what the terminal would show for the chosen
//!   display mode.
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csv::WriterBuilder;
use serde::Serialize;

use crate::entry::{LoginEntry, TimeZoneChoice, header};
use crate::error::AuditError;
use crate::report::{DisplayMode, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Txt,
    Csv,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UserRow<'a> {
    username: &'a str,
    terminal: &'a str,
    from: &'a str,
    latest: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Row<'a> {
    terminal: &'a str,
    from: &'a str,
    latest: String,
}

fn unwritable(path: &Path, source: io::Error) -> AuditError {
    AuditError::ExportTargetUnwritable {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, e: csv::Error) -> AuditError {
    unwritable(path, io::Error::from(e))
}

pub fn save_csv<P: AsRef<Path>>(
    entries: &[LoginEntry],
    path: P,
    include_username: bool,
    tz: TimeZoneChoice,
) -> Result<(), AuditError> {
    let path = path.as_ref();
    // The header is written by hand so that it is present for empty reports.
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    wtr.write_record(header(include_username))
        .map_err(|e| csv_error(path, e))?;
    for e in entries {
        let latest = e.formatted_time(tz);
        let res = if include_username {
            wtr.serialize(UserRow {
                username: e.username_or_empty(),
                terminal: &e.terminal,
                from: &e.hostname,
                latest,
            })
        } else {
            wtr.serialize(Row {
                terminal: &e.terminal,
                from: &e.hostname,
                latest,
            })
        };
        res.map_err(|err| csv_error(path, err))?;
    }
    wtr.flush().map_err(|e| unwritable(path, e))?;
    Ok(())
}

pub fn save_txt<P: AsRef<Path>>(
    entries: &[LoginEntry],
    path: P,
    mode: DisplayMode,
    include_username: bool,
    tz: TimeZoneChoice,
) -> Result<(), AuditError> {
    let path = path.as_ref();
    let mut f = File::create(path).map_err(|e| unwritable(path, e))?;
    f.write_all(render(entries, mode, include_username, tz).as_bytes())
        .map_err(|e| unwritable(path, e))?;
    Ok(())
}

/// Write `entries` to `path` in the requested format.
pub fn export<P: AsRef<Path>>(
    entries: &[LoginEntry],
    path: P,
    format: ExportFormat,
    mode: DisplayMode,
    include_username: bool,
    tz: TimeZoneChoice,
) -> Result<(), AuditError> {
    match format {
        ExportFormat::Csv => save_csv(entries, path, include_username, tz),
        ExportFormat::Txt => save_txt(entries, path, mode, include_username, tz),
    }
}
