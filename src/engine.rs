//! Engine: runs one scan of a lastlog source and keeps the decoded entries
//! together with the scan counters.
//!
//! Typical usage:
//!
//! ```no_run
//! use lastlog_audit::engine::{Engine, ScanOptions};
//! use lastlog_audit::identity::SystemResolver;
//! # fn main() -> anyhow::Result<()> {
//! let mut engine = Engine::new();
//! engine.load_from_path("/var/log/lastlog", &ScanOptions::default(), &SystemResolver)?;
//! for entry in &engine.entries {
//!     println!("{} {}", entry.index, entry.terminal);
//! }
//! # Ok(())
//! # }
//! ```
use std::io::Read;
use std::path::Path;

use crate::decoder::Decoder;
use crate::entry::LoginEntry;
use crate::error::AuditError;
use crate::identity::IdentityResolver;
use crate::io::{DEFAULT_MMAP_THRESHOLD_BYTES, open_auto};
use crate::record::RecordLayout;
use crate::stats::ScanStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub layout: RecordLayout,
    /// Ask the resolver for a username for every entry.
    pub include_username: bool,
    /// Files at least this large are memory mapped. `u64::MAX` disables mmap.
    pub mmap_threshold_bytes: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            layout: RecordLayout::default(),
            include_username: false,
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }
}

/// Entries of the last scan, in file order.
#[derive(Debug, Default)]
pub struct Engine {
    pub entries: Vec<LoginEntry>,
    pub stats: ScanStats,
}

impl Engine {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            stats: ScanStats::default(),
        }
    }

    /// Decode every record of `reader`, replacing any earlier results.
    ///
    /// On a read failure the entries decoded so far stay in `self.entries`
    /// and the error is returned; the caller decides whether they are usable.
    pub fn load_from_reader<R: Read>(
        &mut self,
        reader: R,
        source_name: &str,
        opts: &ScanOptions,
        resolver: &dyn IdentityResolver,
    ) -> Result<(), AuditError> {
        self.entries.clear();
        self.stats = ScanStats::default();
        let mut decoder = Decoder::new(reader, opts.layout).with_source_name(source_name);
        if opts.include_username {
            decoder = decoder.with_resolver(resolver);
        }
        let mut result = Ok(());
        for item in decoder.by_ref() {
            match item {
                Ok(entry) => self.entries.push(entry),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.stats = decoder.stats();
        log::info!(
            "{}: {} records, {} entries, {} empty slots, {} malformed",
            source_name,
            self.stats.records_read,
            self.entries.len(),
            self.stats.empty_slots,
            self.stats.malformed
        );
        result
    }

    /// Open `path` (mmap or buffered, by size) and decode it.
    pub fn load_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        opts: &ScanOptions,
        resolver: &dyn IdentityResolver,
    ) -> Result<(), AuditError> {
        let path = path.as_ref();
        self.entries.clear();
        self.stats = ScanStats::default();
        let source = open_auto(path, opts.mmap_threshold_bytes)?;
        self.load_from_reader(source, &path.display().to_string(), opts, resolver)
    }

    /// Decode an in-memory image of a lastlog file. Intended for tests and
    /// small programmatic integrations.
    pub fn load_from_bytes(
        &mut self,
        bytes: &[u8],
        opts: &ScanOptions,
        resolver: &dyn IdentityResolver,
    ) {
        // reading from a slice cannot fail
        let _ = self.load_from_reader(bytes, "<memory>", opts, resolver);
    }
}
