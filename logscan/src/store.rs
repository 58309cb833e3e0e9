use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::errors::{ScanError, ScanResult};
use crate::partition::Partition;

// Constants for file ingest
const BUFFER_CAPACITY: usize = 65536;
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
pub(crate) const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// The in-memory line collection of the scanned file.
///
/// Only the coordinating process materializes a store; workers receive
/// their share of lines over the wire instead. Lines are owned, ordered as
/// in the file, and carry no trailing terminator.
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    path: PathBuf,
    lines: Vec<String>,
}

/// Decodes file bytes as UTF-8 and splits them into owned lines.
///
/// `\n` and `\r\n` both terminate a line; a final line without a terminator
/// still counts. Invalid UTF-8 fails the whole ingest.
fn decode_lines(bytes: &[u8], path: &Path) -> ScanResult<Vec<String>> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.lines().map(str::to_owned).collect()),
        Err(_) => {
            // Rebuild the owned error only on this cold path
            let source = match String::from_utf8(bytes.to_vec()) {
                Ok(_) => unreachable!("bytes were just rejected as UTF-8"),
                Err(e) => e,
            };
            Err(ScanError::encoding_error(path, source))
        }
    }
}

fn open_error(e: std::io::Error, path: &Path) -> ScanError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::file_not_found(path),
        std::io::ErrorKind::PermissionDenied => ScanError::permission_denied(path),
        _ => ScanError::IoError(e),
    }
}

impl LineStore {
    /// Reads the whole file into owned lines, choosing an ingest strategy
    /// by file size.
    pub fn read_from(path: impl Into<PathBuf>) -> ScanResult<Self> {
        let path = path.into();
        trace!("Ingesting file: {}", path.display());

        let lines = match path.metadata() {
            Ok(metadata) => {
                let size = metadata.len();
                if size < SMALL_FILE_THRESHOLD {
                    Self::read_small(&path)?
                } else if size >= LARGE_FILE_THRESHOLD {
                    Self::read_mmap(&path)?
                } else {
                    Self::read_buffered(&path)?
                }
            }
            Err(e) => {
                warn!("Failed to get metadata for {}: {}", path.display(), e);
                Self::read_buffered(&path)?
            }
        };

        debug!("Ingested {} lines from {}", lines.len(), path.display());
        Ok(Self { path, lines })
    }

    fn read_small(path: &Path) -> ScanResult<Vec<String>> {
        let bytes = std::fs::read(path).map_err(|e| open_error(e, path))?;
        decode_lines(&bytes, path)
    }

    fn read_buffered(path: &Path) -> ScanResult<Vec<String>> {
        let file = File::open(path).map_err(|e| open_error(e, path))?;
        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(ScanError::IoError)?;
        decode_lines(&bytes, path)
    }

    fn read_mmap(path: &Path) -> ScanResult<Vec<String>> {
        let file = File::open(path).map_err(|e| open_error(e, path))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(ScanError::IoError)?;
        decode_lines(&mmap, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines in the store, the authoritative `nlines` of a run
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines in file order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The lines covered by a partition, borrowed without copying
    pub fn slice(&self, partition: Partition) -> &[String] {
        &self.lines[partition.range()]
    }
}
