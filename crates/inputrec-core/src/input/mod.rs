//! The host input interface consumed by capture and replay.
//!
//! The core never talks to real hardware. It needs exactly four things from
//! the host input subsystem:
//!
//! - **subscribe** to the raw event stream ([`InputHost::subscribe`]);
//! - **query** a device's addressable controls ([`InputDevice::all_controls`]);
//! - **look up** a device by identifier ([`InputHost::device_by_id`]);
//! - **inject** a synthetic event ([`InputHost::inject_event`]).
//!
//! Production hosts wrap an engine's input system; tests and the demo binary
//! use the in-memory host in `inputrec-session`.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::record::DeviceId;

pub mod event;

pub use event::{RawEvent, RawEventKind, StateEvent};

/// A control reading.
///
/// Closed on purpose: only the shapes the host can actually report are
/// listed. Richer control types need a new variant, not a dynamic value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlValue {
    /// A continuous axis (sticks, triggers, sliders).
    Axis(f32),
    /// A discrete integer reading (e.g. a hat switch position).
    Integer(i32),
    /// A digital button.
    Button(bool),
    /// A two-dimensional reading (e.g. a pointer delta).
    Vector2(f32, f32),
}

impl ControlValue {
    /// Interprets the reading as a single `f32`.
    ///
    /// Returns `None` for readings with no scalar interpretation.
    pub fn as_scalar(self) -> Option<f32> {
        match self {
            ControlValue::Axis(v) => Some(v),
            ControlValue::Integer(v) => Some(v as f32),
            ControlValue::Button(pressed) => Some(if pressed { 1.0 } else { 0.0 }),
            ControlValue::Vector2(..) => None,
        }
    }
}

/// One addressable control of a device.
pub trait Control: Send + Sync {
    /// Human-readable control path, for diagnostics.
    fn name(&self) -> &str;

    /// Whether the control is currently actuated.
    fn is_actuated(&self) -> bool;

    /// The control's current reading, or `None` if it has none.
    fn read_value(&self) -> Option<ControlValue>;
}

/// An input device as seen by the core.
pub trait InputDevice: Send + Sync {
    fn id(&self) -> DeviceId;

    /// The device's addressable controls in index order. Index 0 is the gate control.
    fn all_controls(&self) -> Vec<&dyn Control>;
}

/// Receives raw events from the host's polling step.
///
/// Called synchronously, once per polled event, before game logic runs for
/// the tick. Implementations must not block.
pub trait RawEventListener: Send {
    fn on_raw_event(&mut self, event: &RawEvent, device: &dyn InputDevice);
}

/// A listener shared between its owner and the host's subscriber list.
pub type SharedListener = Arc<Mutex<dyn RawEventListener>>;

/// Identifies a subscription made with [`InputHost::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Errors raised while building or injecting a synthetic event.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InjectError {
    /// The control index is not addressable on the target device.
    #[error("control index {index} out of range for device {device_id} ({count} controls)")]
    ControlOutOfRange {
        device_id: DeviceId,
        index: usize,
        count: usize,
    },

    /// The host refused the event.
    #[error("host rejected event: {0}")]
    Rejected(String),
}

/// The host input subsystem.
pub trait InputHost: Send + Sync {
    /// Adds `listener` to the raw event stream.
    fn subscribe(&self, listener: SharedListener) -> SubscriptionId;

    /// Removes a subscription. Returns `false` if `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Looks up a device present in the current session.
    fn device_by_id(&self, id: DeviceId) -> Option<Arc<dyn InputDevice>>;

    /// Hands a synthesized event to the host for processing on the next poll.
    fn inject_event(&self, event: StateEvent) -> Result<(), InjectError>;

    /// Host monotonic clock, in seconds.
    fn now(&self) -> f64;
}
