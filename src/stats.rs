//! Counters collected while scanning a lastlog file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Full records read, used or not.
    pub records_read: u64,
    /// Records with a zero login time.
    pub empty_slots: u64,
    /// Records skipped because they could not be decoded.
    pub malformed: u64,
    /// Bytes of a trailing partial record that were ignored.
    pub truncated_tail_bytes: u64,
}

impl ScanStats {
    /// Records that became entries.
    pub fn emitted(&self) -> u64 {
        self.records_read - self.empty_slots - self.malformed
    }
}
