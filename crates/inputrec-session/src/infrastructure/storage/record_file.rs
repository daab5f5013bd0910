//! File-backed [`RecordRepository`].
//!
//! The format written is chosen by extension: `.irec` and `.bin` files get
//! the binary encoding, everything else JSON. Loading ignores the extension
//! and sniffs the binary magic instead, so a renamed file still loads.

use std::path::Path;

use inputrec_core::record::{decode_records, encode_records, RecordFile, RecordFormat};
use tracing::debug;

use crate::application::session::{RecordFileError, RecordRepository};

/// Extensions that select [`RecordFormat::Binary`] on save.
const BINARY_EXTENSIONS: [&str; 2] = ["irec", "bin"];

/// Reads and writes record files on the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileRecordRepository;

impl FileRecordRepository {
    pub fn new() -> Self {
        Self
    }

    /// Encoding used when saving to `path`.
    pub fn format_for_path(path: &Path) -> RecordFormat {
        let binary = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                BINARY_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
            });
        if binary {
            RecordFormat::Binary
        } else {
            RecordFormat::Json
        }
    }
}

impl RecordRepository for FileRecordRepository {
    /// Writes `file` to `path`, creating parent directories as needed.
    fn save(&self, path: &Path, file: &RecordFile) -> Result<(), RecordFileError> {
        let format = Self::format_for_path(path);
        let bytes = encode_records(file, format).map_err(|source| RecordFileError::Encoding {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| RecordFileError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, &bytes).map_err(|source| RecordFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("wrote {} bytes ({format:?}) to {}", bytes.len(), path.display());
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<RecordFile, RecordFileError> {
        let bytes = std::fs::read(path).map_err(|source| RecordFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = RecordFormat::detect(&bytes);
        debug!("read {} bytes ({format:?}) from {}", bytes.len(), path.display());
        decode_records(&bytes, format).map_err(|source| RecordFileError::Encoding {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
