//! Records, their value codec, the record store and the record file encoding.

pub mod codec;
pub mod file;
pub mod model;
pub mod store;

pub use codec::{decode_value, encode_value, EncodedValue};
pub use file::{decode_records, encode_records, PersistenceError, RecordFile, RecordFormat};
pub use model::{DeviceId, Record, GATE_CONTROL};
pub use store::RecordStore;
