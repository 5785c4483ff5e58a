//! Text rendering of login entries for the terminal and TXT exports.
//!
//! Table mode pads every cell to [`COLUMN_WIDTH`] and separates the header
//! from the rows with a dashed rule. Line mode joins the fields with `", "`.
//! Rendering is a pure function of its inputs.
use crate::entry::{LoginEntry, TimeZoneChoice, header};

pub const COLUMN_WIDTH: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DisplayMode {
    #[default]
    Table,
    Line,
}

fn table_row<S: AsRef<str>>(cells: &[S]) -> String {
    cells
        .iter()
        .map(|c| format!("{:<width$}", c.as_ref(), width = COLUMN_WIDTH))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_table(entries: &[LoginEntry], include_username: bool, tz: TimeZoneChoice) -> String {
    let head = header(include_username);
    let mut out = String::new();
    out.push_str(&table_row(head));
    out.push('\n');
    out.push_str(&"-".repeat(COLUMN_WIDTH * head.len()));
    out.push('\n');
    for e in entries {
        out.push_str(&table_row(&e.fields(include_username, tz)));
        out.push('\n');
    }
    out
}

pub fn render_lines(entries: &[LoginEntry], include_username: bool, tz: TimeZoneChoice) -> String {
    let mut out = String::new();
    for e in entries {
        out.push_str(&e.fields(include_username, tz).join(", "));
        out.push('\n');
    }
    out
}

pub fn render(
    entries: &[LoginEntry],
    mode: DisplayMode,
    include_username: bool,
    tz: TimeZoneChoice,
) -> String {
    match mode {
        DisplayMode::Table => render_table(entries, include_username, tz),
        DisplayMode::Line => render_lines(entries, include_username, tz),
    }
}
