//! The [`Record`] type: one observed control activation.

use serde::{Deserialize, Serialize};

use super::codec::{decode_value, encode_value, EncodedValue};

/// Identifier of an input device, stable for the lifetime of a session.
pub type DeviceId = u32;

/// Index of the gate control within a device's addressable-control sequence.
///
/// Capture only proceeds when this control is actuated.
pub const GATE_CONTROL: usize = 0;

/// One observed control activation.
///
/// Invariants:
/// - a valid record always has `control_index >= 1`;
/// - `device_id` never changes after construction (the field is private).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of the originating raw event. Diagnostic only; not unique.
    pub event_id: u32,
    device_id: DeviceId,
    /// Seconds since the capture session started.
    pub time: f64,
    /// Index of the single control that changed.
    pub control_index: usize,
    /// `false` when the event carried no usable control change.
    pub valid: bool,
    /// Convenience copy of the value. Never trusted on load; see [`Record::decode`].
    #[serde(with = "lossy_value", default)]
    pub value: f32,
    /// Ground-truth IEEE-754 encoding of `value`.
    pub encoded_value: EncodedValue,
}

impl Record {
    /// Creates a record for an event that produced no usable control change.
    pub fn invalid(event_id: u32, device_id: DeviceId, time: f64) -> Self {
        Self {
            event_id,
            device_id,
            time,
            control_index: 0,
            valid: false,
            value: 0.0,
            encoded_value: [0; 4],
        }
    }

    /// Creates a valid record carrying `value` for the control at `control_index`.
    ///
    /// `encoded_value` is derived from `value`, so the two always agree.
    pub fn captured(
        event_id: u32,
        device_id: DeviceId,
        time: f64,
        control_index: usize,
        value: f32,
    ) -> Self {
        Self {
            event_id,
            device_id,
            time,
            control_index,
            valid: true,
            value,
            encoded_value: encode_value(value),
        }
    }

    /// Identifier of the device that produced the event.
    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Overwrites `value` with the decoded `encoded_value`.
    pub fn decode(&mut self) {
        self.value = decode_value(self.encoded_value);
    }

    /// Marks the record as unusable.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

/// Serializes `value` as a number when finite and as `null` otherwise.
///
/// Self-describing formats such as JSON have no spelling for `NaN` or
/// `Infinity`; the exact bits live in `encoded_value` anyway.
mod lossy_value {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or_default())
    }
}
