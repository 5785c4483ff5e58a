//! Fixed binary layout of a lastlog record.
//!
//! A lastlog file is an array of records indexed by UID, with no header or
//! trailer. Each record holds the time of the last login, the terminal line
//! and the remote host, in host byte order:
//!
//! ```text
//! lastlog32             sizeof 292
//! ll_time  @  0 sizeof   4   (u32)
//! ll_line  @  4 sizeof  32
//! ll_host  @ 36 sizeof 256
//!
//! lastlog64             sizeof 296
//! ll_time  @  0 sizeof   8   (i64)
//! ll_line  @  8 sizeof  32
//! ll_host  @ 40 sizeof 256
//! ```
use std::mem::size_of;

/// Width of the `ll_line` terminal field.
pub const TERMINAL_LEN: usize = 32;
/// Width of the `ll_host` hostname field.
pub const HOSTNAME_LEN: usize = 256;

/// Width of the time field, and so the size of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RecordLayout {
    /// 32-bit unsigned `ll_time`, as written by glibc on Linux.
    #[default]
    Lastlog32,
    /// 64-bit signed `ll_time`.
    Lastlog64,
}

impl RecordLayout {
    pub const fn time_len(self) -> usize {
        match self {
            RecordLayout::Lastlog32 => size_of::<u32>(),
            RecordLayout::Lastlog64 => size_of::<i64>(),
        }
    }

    pub const fn terminal_offset(self) -> usize {
        self.time_len()
    }

    pub const fn hostname_offset(self) -> usize {
        self.terminal_offset() + TERMINAL_LEN
    }

    pub const fn record_size(self) -> usize {
        self.hostname_offset() + HOSTNAME_LEN
    }
}

/// Record size of the canonical layout.
pub const RECORD_SIZE: usize = RecordLayout::Lastlog32.record_size();

const _: () = assert!(RECORD_SIZE == 292);
const _: () = assert!(RecordLayout::Lastlog64.record_size() == 296);

/// One record borrowed straight from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Seconds since the epoch; zero means the slot was never used.
    pub login_time: i64,
    pub terminal: &'a [u8],
    pub hostname: &'a [u8],
}

impl<'a> RawRecord<'a> {
    /// Split a chunk into its fields. Returns `None` unless `chunk` is exactly
    /// one record long.
    pub fn unpack(layout: RecordLayout, chunk: &'a [u8]) -> Option<Self> {
        if chunk.len() != layout.record_size() {
            return None;
        }
        let (time, rest) = chunk.split_at(layout.time_len());
        let login_time = match layout {
            RecordLayout::Lastlog32 => i64::from(u32::from_ne_bytes(time.try_into().ok()?)),
            RecordLayout::Lastlog64 => i64::from_ne_bytes(time.try_into().ok()?),
        };
        let (terminal, hostname) = rest.split_at(TERMINAL_LEN);
        Some(Self {
            login_time,
            terminal,
            hostname,
        })
    }

    pub fn is_empty_slot(&self) -> bool {
        self.login_time == 0
    }

    pub fn terminal_text(&self) -> String {
        decode_text(self.terminal)
    }

    pub fn hostname_text(&self) -> String {
        decode_text(self.hostname)
    }
}

/// Drop the trailing run of NUL padding. NULs before that run are kept.
pub fn trim_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    &bytes[..end]
}

/// Decode a padded text field. Invalid UTF-8 is replaced, never rejected.
pub fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(trim_nul(bytes)).into_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build one record in host byte order.
    pub(crate) fn make_record(layout: RecordLayout, time: i64, line: &str, host: &str) -> Vec<u8> {
        let mut buf = vec![0u8; layout.record_size()];
        match layout {
            RecordLayout::Lastlog32 => buf[..4].copy_from_slice(&(time as u32).to_ne_bytes()),
            RecordLayout::Lastlog64 => buf[..8].copy_from_slice(&time.to_ne_bytes()),
        }
        let t = layout.terminal_offset();
        buf[t..t + line.len()].copy_from_slice(line.as_bytes());
        let h = layout.hostname_offset();
        buf[h..h + host.len()].copy_from_slice(host.as_bytes());
        buf
    }

    #[test]
    fn layout_offsets() {
        assert_eq!(RecordLayout::Lastlog32.hostname_offset(), 36);
        assert_eq!(RecordLayout::Lastlog64.terminal_offset(), 8);
        assert_eq!(RecordLayout::Lastlog64.hostname_offset(), 40);
    }

    #[test]
    fn unpacks_fields() {
        let buf = make_record(RecordLayout::Lastlog32, 1_700_000_000, "pts/0", "10.0.0.1");
        let rec = RawRecord::unpack(RecordLayout::Lastlog32, &buf).unwrap();
        assert_eq!(rec.login_time, 1_700_000_000);
        assert_eq!(rec.terminal.len(), TERMINAL_LEN);
        assert_eq!(rec.hostname.len(), HOSTNAME_LEN);
        assert_eq!(rec.terminal_text(), "pts/0");
        assert_eq!(rec.hostname_text(), "10.0.0.1");
        assert!(!rec.is_empty_slot());
    }

    #[test]
    fn time32_is_unsigned() {
        let buf = make_record(RecordLayout::Lastlog32, u32::MAX as i64, "tty1", "");
        let rec = RawRecord::unpack(RecordLayout::Lastlog32, &buf).unwrap();
        assert_eq!(rec.login_time, u32::MAX as i64);
    }

    #[test]
    fn rejects_wrong_length() {
        let buf = vec![0u8; RECORD_SIZE - 1];
        assert!(RawRecord::unpack(RecordLayout::Lastlog32, &buf).is_none());
        let buf = vec![0u8; RECORD_SIZE];
        assert!(RawRecord::unpack(RecordLayout::Lastlog64, &buf).is_none());
    }

    #[test]
    fn trims_only_trailing_nuls() {
        assert_eq!(trim_nul(b"pts\0/0\0\0\0"), b"pts\0/0");
        assert_eq!(trim_nul(b"\0\0\0"), b"");
        assert_eq!(trim_nul(b""), b"");
        assert_eq!(decode_text(b"a\0b\0"), "a\0b");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        assert_eq!(decode_text(b"ho\xffst\0\0"), "ho\u{fffd}st");
    }
}
