//! Record decoder: turns a lastlog byte stream into [`LoginEntry`] values.
//!
//! The decoder reads one record-sized chunk at a time and yields entries
//! lazily, so a consumer can start rendering before the file is finished.
//!
//! - Slots with a zero login time are skipped silently.
//! - A trailing partial record ends the scan; its bytes are counted in
//!   [`ScanStats::truncated_tail_bytes`] and otherwise ignored.
//! - A record whose time cannot be represented is skipped and counted in
//!   [`ScanStats::malformed`]. One bad record never stops the audit.
//! - A read error is fatal: it is yielded once as
//!   [`AuditError::SourceUnavailable`] and the iterator then ends.
//!
//! ```
//! use lastlog_audit::decoder::Decoder;
//! use lastlog_audit::record::{RecordLayout, RECORD_SIZE};
//!
//! let mut bytes = vec![0u8; RECORD_SIZE * 2];
//! bytes[RECORD_SIZE..RECORD_SIZE + 4].copy_from_slice(&1_700_000_000u32.to_ne_bytes());
//! let entries: Vec<_> = Decoder::new(&bytes[..], RecordLayout::Lastlog32)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].index, 1);
//! ```
use std::io::{self, Read};
use std::iter::FusedIterator;

use crate::entry::LoginEntry;
use crate::error::AuditError;
use crate::identity::IdentityResolver;
use crate::record::{RawRecord, RecordLayout};
use crate::stats::ScanStats;

pub struct Decoder<'r, R> {
    reader: R,
    layout: RecordLayout,
    resolver: Option<&'r dyn IdentityResolver>,
    source_name: String,
    buf: Vec<u8>,
    index: u64,
    stats: ScanStats,
    done: bool,
}

impl<'r, R: Read> Decoder<'r, R> {
    pub fn new(reader: R, layout: RecordLayout) -> Self {
        Self {
            reader,
            layout,
            resolver: None,
            source_name: String::from("<input>"),
            buf: vec![0u8; layout.record_size()],
            index: 0,
            stats: ScanStats::default(),
            done: false,
        }
    }

    /// Look up a username for every emitted entry. Without a resolver the
    /// `username` of each entry stays `None`.
    pub fn with_resolver(mut self, resolver: &'r dyn IdentityResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Name used for the source in error messages.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }
}

impl<R: Read> Iterator for Decoder<'_, R> {
    type Item = Result<LoginEntry, AuditError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let filled = match read_chunk(&mut self.reader, &mut self.buf) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(AuditError::SourceUnavailable {
                        source_name: self.source_name.clone(),
                        source: e,
                    }));
                }
            };
            if filled < self.buf.len() {
                self.done = true;
                if filled > 0 {
                    log::debug!(
                        "{}: ignoring {} trailing bytes after record {}",
                        self.source_name,
                        filled,
                        self.index
                    );
                    self.stats.truncated_tail_bytes = filled as u64;
                }
                break;
            }

            let index = self.index;
            self.index += 1;
            self.stats.records_read += 1;

            let Some(raw) = RawRecord::unpack(self.layout, &self.buf) else {
                self.stats.malformed += 1;
                continue;
            };
            if raw.is_empty_slot() {
                self.stats.empty_slots += 1;
                continue;
            }
            match LoginEntry::from_raw(index, &raw) {
                Ok(mut entry) => {
                    if let Some(resolver) = self.resolver {
                        entry.username = resolver.resolve(index);
                    }
                    return Some(Ok(entry));
                }
                Err(e) => {
                    log::debug!("{}: skipping {}", self.source_name, e);
                    self.stats.malformed += 1;
                }
            }
        }
        None
    }
}

impl<R: Read> FusedIterator for Decoder<'_, R> {}

/// Fill `buf` as far as the reader allows. Returns fewer bytes than
/// `buf.len()` only at end of input.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entry::TimeZoneChoice;
    use crate::record::RECORD_SIZE;
    use crate::record::tests::make_record;
    use std::cell::Cell;

    const L32: RecordLayout = RecordLayout::Lastlog32;

    fn file_of(records: &[(i64, &str, &str)]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|(t, line, host)| make_record(L32, *t, line, host))
            .collect()
    }

    fn decode(bytes: &[u8]) -> (Vec<LoginEntry>, ScanStats) {
        let mut d = Decoder::new(bytes, L32);
        let entries = d.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
        (entries, d.stats())
    }

    /// Hands out at most one byte per read and is interrupted every other call.
    struct Trickle<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            if self.data.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[0];
            self.data = &self.data[1..];
            Ok(1)
        }
    }

    /// Serves `data` until `fail_at` bytes have been read, then errors.
    pub(crate) struct FailAfter<'a> {
        data: &'a [u8],
        pos: usize,
        fail_at: usize,
    }

    impl<'a> FailAfter<'a> {
        pub(crate) fn new(data: &'a [u8], fail_at: usize) -> Self {
            Self {
                data,
                pos: 0,
                fail_at,
            }
        }
    }

    impl Read for FailAfter<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.fail_at {
                return Err(io::Error::other("device went away"));
            }
            let end = (self.pos + buf.len()).min(self.fail_at).min(self.data.len());
            let n = end - self.pos;
            buf[..n].copy_from_slice(&self.data[self.pos..end]);
            self.pos = end;
            Ok(n)
        }
    }

    #[test]
    fn two_record_file_yields_single_entry() {
        let bytes = file_of(&[(1_700_000_000, "pts/0", ""), (0, "", "")]);
        assert_eq!(bytes.len(), 584);
        let (entries, stats) = decode(&bytes);
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.index, 0);
        assert_eq!(e.terminal, "pts/0");
        assert_eq!(e.hostname, "");
        assert_eq!(e.formatted_time(TimeZoneChoice::Utc), "2023-11-14 22:13:20");
        assert_eq!(e.username, None);
        assert_eq!(stats.records_read, 2);
        assert_eq!(stats.empty_slots, 1);
    }

    #[test]
    fn indexes_are_record_ordinals() {
        let bytes = file_of(&[
            (0, "", ""),
            (100, "tty1", ""),
            (0, "", ""),
            (0, "", ""),
            (200, "pts/3", "10.1.2.3"),
            (300, "pts/4", "example.org"),
        ]);
        let (entries, stats) = decode(&bytes);
        let idx: Vec<u64> = entries.iter().map(|e| e.index).collect();
        assert_eq!(idx, vec![1, 4, 5]);
        assert_eq!(stats.emitted(), 3);
        assert_eq!(entries[2].hostname, "example.org");
    }

    #[test]
    fn trailing_partial_record_is_ignored() {
        let mut bytes = file_of(&[(100, "tty1", ""), (200, "tty2", "")]);
        bytes.extend_from_slice(&make_record(L32, 300, "tty3", "")[..100]);
        let (entries, stats) = decode(&bytes);
        assert_eq!(entries.len(), 2);
        assert_eq!(stats.truncated_tail_bytes, 100);
    }

    #[test]
    fn short_file_yields_nothing() {
        let bytes = make_record(L32, 100, "tty1", "");
        let (entries, stats) = decode(&bytes[..RECORD_SIZE - 1]);
        assert!(entries.is_empty());
        assert_eq!(stats.records_read, 0);
        assert_eq!(stats.truncated_tail_bytes, (RECORD_SIZE - 1) as u64);
    }

    #[test]
    fn all_zero_file_yields_nothing() {
        let bytes = vec![0u8; RECORD_SIZE * 50];
        let (entries, stats) = decode(&bytes);
        assert!(entries.is_empty());
        assert_eq!(stats.empty_slots, 50);
        let (entries, _) = decode(&[]);
        assert!(entries.is_empty());
    }

    #[test]
    fn undecodable_text_is_substituted() {
        let mut bytes = make_record(L32, 100, "tty1", "host");
        bytes[L32.hostname_offset() + 1] = 0xff;
        let (entries, stats) = decode(&bytes);
        assert_eq!(entries[0].hostname, "h\u{fffd}st");
        assert_eq!(stats.malformed, 0);
    }

    #[test]
    fn out_of_range_time_skips_only_that_record() {
        let l64 = RecordLayout::Lastlog64;
        let mut bytes = make_record(l64, 100, "tty1", "");
        bytes.extend(make_record(l64, i64::MAX, "tty2", ""));
        bytes.extend(make_record(l64, -86_400, "tty3", ""));
        let mut d = Decoder::new(&bytes[..], l64);
        let entries = d.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(entries.iter().map(|e| e.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            entries[1].formatted_time(TimeZoneChoice::Utc),
            "1969-12-31 00:00:00"
        );
        assert_eq!(d.stats().malformed, 1);
    }

    #[test]
    fn resolver_fills_usernames_by_index() {
        let bytes = file_of(&[(100, "tty1", ""), (0, "", ""), (200, "pts/1", "")]);
        let calls = Cell::new(0);
        let resolver = |i: u64| {
            calls.set(calls.get() + 1);
            (i == 0).then(|| "root".to_string())
        };
        let entries = Decoder::new(&bytes[..], L32)
            .with_resolver(&resolver)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(entries[0].username.as_deref(), Some("root"));
        assert_eq!(entries[1].username, None);
        // empty slots are never looked up
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn partial_reads_and_interrupts_are_retried() {
        let bytes = file_of(&[(100, "tty1", ""), (200, "tty2", "h")]);
        let reader = Trickle {
            data: &bytes,
            interrupt: false,
        };
        let entries = Decoder::new(reader, L32)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].hostname, "h");
    }

    #[test]
    fn read_failure_is_fatal_after_earlier_entries() {
        let bytes = file_of(&[(100, "tty1", ""), (200, "tty2", ""), (300, "tty3", "")]);
        let reader = FailAfter::new(&bytes, RECORD_SIZE + 10);
        let mut d = Decoder::new(reader, L32).with_source_name("lastlog");
        assert_eq!(d.next().unwrap().unwrap().index, 0);
        let err = d.next().unwrap().unwrap_err();
        assert!(matches!(err, AuditError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("lastlog"));
        assert!(d.next().is_none());
    }
}
