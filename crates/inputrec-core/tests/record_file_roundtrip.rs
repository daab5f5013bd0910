//! Integration tests for record persistence through the public API.
//!
//! These exercise the value codec, the record store and the record file
//! encodings together, the way the session crate uses them.

use inputrec_core::{
    decode_records, decode_value, encode_records, encode_value, Record, RecordFile, RecordFormat,
    RecordStore,
};
use uuid::Uuid;

/// Records as capture would produce them: arrival order, some invalid.
fn captured_store() -> RecordStore {
    let mut store = RecordStore::new();
    store.push(Record::captured(10, 4, 0.50, 1, -0.25));
    store.push(Record::invalid(11, 4, 0.55));
    store.push(Record::captured(12, 4, 0.25, 2, 1.0));
    store.push(Record::captured(13, 4, 0.75, 1, 0.0));
    store.push(Record::invalid(14, 4, 0.10));
    store
}

fn roundtrip(file: &RecordFile, format: RecordFormat) -> RecordFile {
    let bytes = encode_records(file, format).expect("encode must succeed");
    assert_eq!(RecordFormat::detect(&bytes), format);
    decode_records(&bytes, format).expect("decode must succeed")
}

#[test]
fn test_value_codec_is_bit_exact_for_special_values() {
    let specials = [
        0.0_f32,
        -0.0,
        f32::INFINITY,
        f32::NEG_INFINITY,
        f32::MIN_POSITIVE,
        f32::MAX,
        f32::from_bits(0x0000_0001), // smallest subnormal
        f32::NAN,
        f32::from_bits(0x7FC0_1234), // NaN with payload
        f32::from_bits(0xFF80_0001), // signalling NaN, sign bit set
    ];
    for value in specials {
        assert_eq!(decode_value(encode_value(value)).to_bits(), value.to_bits());
    }
}

#[test]
fn test_json_roundtrip_keeps_only_valid_sorted_records() {
    // Arrange
    let file = RecordFile::from_store(Uuid::new_v4(), 4, &captured_store());

    // Act
    let loaded = roundtrip(&file, RecordFormat::Json);

    // Assert
    assert_eq!(loaded, file);
    let ids: Vec<u32> = loaded.records().iter().map(|r| r.event_id).collect();
    assert_eq!(ids, vec![12, 10, 13]);
    assert!(loaded.records().iter().all(|r| r.valid));
}

#[test]
fn test_binary_roundtrip_preserves_header_fields() {
    // Arrange
    let session_id = Uuid::new_v4();
    let file = RecordFile::from_store(session_id, 4, &captured_store());

    // Act
    let loaded = roundtrip(&file, RecordFormat::Binary);

    // Assert
    assert_eq!(loaded.session_id, session_id);
    assert_eq!(loaded.target_device, 4);
    assert_eq!(loaded.records(), file.records());
}

#[test]
fn test_non_finite_values_survive_json_via_encoded_bytes() {
    // Arrange – JSON has no NaN literal; the value column is written as null
    let store: RecordStore = vec![
        Record::captured(1, 1, 0.0, 1, f32::NAN),
        Record::captured(2, 1, 1.0, 1, f32::NEG_INFINITY),
    ]
    .into_iter()
    .collect();
    let file = RecordFile::from_store(Uuid::nil(), 1, &store);

    // Act
    let bytes = encode_records(&file, RecordFormat::Json).unwrap();
    let loaded = decode_records(&bytes, RecordFormat::Json).unwrap();

    // Assert
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("null"));
    assert!(loaded.records()[0].value.is_nan());
    assert_eq!(loaded.records()[1].value, f32::NEG_INFINITY);
}

#[test]
fn test_loaded_store_is_ready_for_replay() {
    let file = RecordFile::from_store(Uuid::nil(), 4, &captured_store());

    let store = roundtrip(&file, RecordFormat::Binary).into_store();

    assert!(store.is_time_sorted());
    assert_eq!(store.valid_records().len(), store.len());
    assert_eq!(store.snapshot(), store);
}
