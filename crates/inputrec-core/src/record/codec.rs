//! Bit-exact codec for recorded control values.
//!
//! Wire format:
//! ```text
//! [ieee754_f32:4]
//! ```
//! The four bytes are the IEEE-754 single-precision layout of the value in
//! little-endian byte order. Every bit pattern survives a round trip,
//! including `NaN` payloads, `±Infinity` and `±0`.
//!
//! # Why keep the bytes at all? (for beginners)
//!
//! A record file also stores the value as a plain number, but text formats
//! such as JSON cannot represent `NaN` or `Infinity`, and some serializers
//! print floats with fewer digits than needed to restore the exact bits.
//! The 4-byte form is the ground truth; the numeric form is only a
//! convenience for humans reading the file.

/// Size of an encoded control value in bytes.
pub const ENCODED_VALUE_LEN: usize = 4;

/// An encoded control value.
pub type EncodedValue = [u8; ENCODED_VALUE_LEN];

/// Encodes `value` into its 4-byte little-endian IEEE-754 form.
///
/// # Examples
///
/// ```rust
/// use inputrec_core::record::codec::{decode_value, encode_value};
///
/// let bytes = encode_value(0.25);
/// assert_eq!(decode_value(bytes), 0.25);
/// ```
pub fn encode_value(value: f32) -> EncodedValue {
    value.to_le_bytes()
}

/// Decodes a 4-byte little-endian IEEE-754 value.
///
/// This is the exact inverse of [`encode_value`]: `decode_value(encode_value(v))`
/// has the same bit pattern as `v` for every `f32`.
pub fn decode_value(bytes: EncodedValue) -> f32 {
    f32::from_le_bytes(bytes)
}
