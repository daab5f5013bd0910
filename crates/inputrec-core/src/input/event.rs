//! Raw events polled from the host and synthetic state events sent back to it.

use crate::record::DeviceId;

use super::{InjectError, InputDevice};

/// Kind of a raw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventKind {
    /// A full device state snapshot. Carries no value payload of its own.
    State,
    /// A partial state change carrying control values.
    Delta,
}

/// A raw event polled from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Host-assigned event identifier.
    pub id: u32,
    pub device_id: DeviceId,
    /// Host monotonic time, in seconds.
    pub time: f64,
    pub kind: RawEventKind,
}

/// A synthesized full-state event for one device.
///
/// Built from the device's current control values so that injecting it
/// only changes the controls explicitly written.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    device_id: DeviceId,
    values: Vec<f32>,
}

impl StateEvent {
    /// Captures the current scalar value of every control of `device`.
    ///
    /// Controls without a scalar reading start at `0.0`.
    pub fn from_device(device: &dyn InputDevice) -> Self {
        let values = device
            .all_controls()
            .iter()
            .map(|c| c.read_value().and_then(|v| v.as_scalar()).unwrap_or(0.0))
            .collect();
        Self {
            device_id: device.id(),
            values,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Per-control values in index order.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn value(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Writes `value` into the control at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`InjectError::ControlOutOfRange`] when `index` is not addressable.
    pub fn write_value(&mut self, index: usize, value: f32) -> Result<(), InjectError> {
        let count = self.values.len();
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(InjectError::ControlOutOfRange {
                device_id: self.device_id,
                index,
                count,
            }),
        }
    }
}
