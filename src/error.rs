//! Error taxonomy for a lastlog scan.
//!
//! Only source-level and export-level failures reach callers. Per-record
//! problems are reported as [`AuditError::RecordMalformed`] inside the decoder,
//! which counts and skips the record so that one damaged slot never stops an
//! audit. A missing username is not an error at all.
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("cannot read {source_name}: {source}")]
    SourceUnavailable {
        source_name: String,
        #[source]
        source: io::Error,
    },

    #[error("record {index} malformed: {reason}")]
    RecordMalformed { index: u64, reason: String },

    #[error("cannot write export {}: {source}", path.display())]
    ExportTargetUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AuditError {
    /// True for errors that end a whole scan, as opposed to one record.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AuditError::RecordMalformed { .. })
    }
}
