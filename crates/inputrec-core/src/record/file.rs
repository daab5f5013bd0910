//! Byte-level encoding of a persisted record session.
//!
//! Two encodings are supported:
//!
//! - [`RecordFormat::Json`] – self-describing, human-readable rows. This is
//!   the default for files meant to be inspected or edited.
//! - [`RecordFormat::Binary`] – compact `bincode` payload behind a fixed
//!   header:
//!
//! ```text
//! [magic:4 = "IREC"][version:1][reserved:3][payload:N]
//! ```
//!
//! Either way, decoding rebuilds every `value` from `encoded_value`. The
//! numeric `value` found in the file is never trusted.
//!
//! File I/O lives in the session crate; this module only turns a
//! [`RecordFile`] into bytes and back.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::model::{DeviceId, Record, GATE_CONTROL};
use super::store::RecordStore;

/// Current record file version.
pub const RECORD_FILE_VERSION: u8 = 1;

/// Magic bytes opening a binary record file.
pub const BINARY_MAGIC: [u8; 4] = *b"IREC";

/// Size of the binary header in bytes.
pub const BINARY_HEADER_SIZE: usize = 8;

/// UTF-8 byte-order mark, tolerated in front of JSON files.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Errors raised while encoding or decoding a record file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// JSON encoding or decoding failed.
    #[error("JSON record file error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding or decoding failed.
    #[error("binary record file error: {0}")]
    Binary(#[from] bincode::Error),

    /// The binary header is missing or does not start with the magic bytes.
    #[error("not a binary record file: bad header")]
    BadHeader,

    /// The file was written by an incompatible version.
    #[error("unsupported record file version: {0}")]
    UnsupportedVersion(u8),
}

/// Encoding used for a record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormat {
    #[default]
    Json,
    Binary,
}

impl RecordFormat {
    /// Guesses the format of `bytes` from the binary magic.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&BINARY_MAGIC) {
            RecordFormat::Binary
        } else {
            RecordFormat::Json
        }
    }
}

/// A persisted capture session: header fields plus validated, time-sorted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFile {
    pub version: u8,
    pub session_id: Uuid,
    pub target_device: DeviceId,
    records: Vec<Record>,
}

impl RecordFile {
    /// Builds a file from `store`, dropping invalid records and sorting by time.
    pub fn from_store(session_id: Uuid, target_device: DeviceId, store: &RecordStore) -> Self {
        Self {
            version: RECORD_FILE_VERSION,
            session_id,
            target_device,
            records: store.snapshot().into_records(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_store(self) -> RecordStore {
        RecordStore::from_records(self.records)
    }

    /// Re-establishes the persisted invariants after reading untrusted bytes.
    fn normalize(&mut self) {
        for record in &mut self.records {
            record.decode();
            // The gate is never a replay target.
            if record.valid && record.control_index == GATE_CONTROL {
                record.invalidate();
            }
        }
        let mut store = RecordStore::from_records(std::mem::take(&mut self.records));
        let before = store.len();
        store.validate();
        if !store.is_time_sorted() {
            debug!("record file was not time-sorted; sorting on load");
            store.sort_by_time();
        }
        if store.len() != before {
            debug!("dropped {} invalid records on load", before - store.len());
        }
        self.records = store.into_records();
    }
}

/// Encodes `file` in the requested format.
///
/// # Errors
///
/// Returns [`PersistenceError`] if the serializer fails.
pub fn encode_records(file: &RecordFile, format: RecordFormat) -> Result<Vec<u8>, PersistenceError> {
    match format {
        RecordFormat::Json => Ok(serde_json::to_vec_pretty(file)?),
        RecordFormat::Binary => {
            let payload = bincode::serialize(file)?;
            let mut buf = Vec::with_capacity(BINARY_HEADER_SIZE + payload.len());
            buf.extend_from_slice(&BINARY_MAGIC);
            buf.push(RECORD_FILE_VERSION);
            buf.extend_from_slice(&[0x00; 3]); // reserved
            buf.extend_from_slice(&payload);
            Ok(buf)
        }
    }
}

/// Decodes a record file and rebuilds every `value` from `encoded_value`.
///
/// Invalid rows are dropped and rows are sorted by time if needed, so the
/// result always satisfies the persisted-store invariants.
///
/// # Errors
///
/// Returns [`PersistenceError`] for malformed bytes or an unsupported version.
///
/// # Examples
///
/// ```rust
/// use inputrec_core::record::{
///     decode_records, encode_records, Record, RecordFile, RecordFormat, RecordStore,
/// };
/// use uuid::Uuid;
///
/// let store: RecordStore = vec![Record::captured(1, 1, 0.0, 1, 0.5)].into_iter().collect();
/// let file = RecordFile::from_store(Uuid::nil(), 1, &store);
/// let bytes = encode_records(&file, RecordFormat::Binary).unwrap();
/// let loaded = decode_records(&bytes, RecordFormat::Binary).unwrap();
/// assert_eq!(loaded.records()[0].value, 0.5);
/// ```
pub fn decode_records(bytes: &[u8], format: RecordFormat) -> Result<RecordFile, PersistenceError> {
    let mut file: RecordFile = match format {
        RecordFormat::Json => {
            let body = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
            serde_json::from_slice(body)?
        }
        RecordFormat::Binary => {
            if bytes.len() < BINARY_HEADER_SIZE || bytes[..4] != BINARY_MAGIC {
                return Err(PersistenceError::BadHeader);
            }
            let version = bytes[4];
            if version != RECORD_FILE_VERSION {
                return Err(PersistenceError::UnsupportedVersion(version));
            }
            // bytes[5..8] are reserved – ignored on decode
            bincode::deserialize(&bytes[BINARY_HEADER_SIZE..])?
        }
    };
    if file.version != RECORD_FILE_VERSION {
        return Err(PersistenceError::UnsupportedVersion(file.version));
    }
    file.normalize();
    Ok(file)
}
