use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use memmap2::Mmap;

use crate::error::AuditError;

/// Threshold in bytes above which we attempt to use mmap for reading.
/// Callers can override via API; this is a reasonable default.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

/// Canonical location of the login history on Linux.
pub const DEFAULT_LASTLOG_PATH: &str = "/var/log/lastlog";

/// An open byte source. Dropping it closes the file or unmaps it.
pub type RecordSource = Box<dyn Read + Send + 'static>;

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes > 0 && file_size_bytes >= threshold_bytes
}

fn unavailable(path: &Path, source: io::Error) -> AuditError {
    AuditError::SourceUnavailable {
        source_name: path.display().to_string(),
        source,
    }
}

/// Open a file for sequential buffered reads.
pub fn open_bufread<P: AsRef<Path>>(path: P) -> Result<RecordSource, AuditError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| unavailable(path, e))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Map a whole file into memory and read records out of the map.
pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<RecordSource, AuditError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| unavailable(path, e))?;
    // The map stays valid only while nobody truncates the file; lastlog is
    // only ever rewritten in place.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| unavailable(path, e))?;
    Ok(Box::new(Cursor::new(mmap)))
}

/// Choose mmap or bufread by file size.
pub fn open_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<RecordSource, AuditError> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|e| unavailable(path, e))?;
    if meta.is_file() && should_use_mmap(meta.len(), threshold_bytes) {
        log::debug!("mapping {} ({} bytes)", path.display(), meta.len());
        open_mmap(path)
    } else {
        open_bufread(path)
    }
}
