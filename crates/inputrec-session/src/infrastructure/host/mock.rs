//! In-memory input host for tests and the headless demo.
//!
//! Allows callers to script raw device events without a real input backend.
//!
//! # Behaviour
//!
//! - [`MockInputHost::queue_state`] schedules a device state change. On the
//!   next [`MockInputHost::poll`] the device takes that state and every
//!   subscriber receives a raw event for it.
//! - [`InputHost::inject_event`] records the event in `injected` and also
//!   schedules it, so injected events reach subscribers on the next poll,
//!   exactly like a real host that feeds synthetic events back through its
//!   pipeline.
//! - Set `reject_injection` to simulate a host refusing events.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inputrec_core::{
    input::{
        Control, ControlValue, InjectError, InputDevice, InputHost, RawEvent, RawEventKind,
        SharedListener, StateEvent, SubscriptionId,
    },
    record::DeviceId,
};
use tracing::debug;

/// A control with a fixed reading.
#[derive(Debug, Clone, PartialEq)]
pub struct MockControl {
    name: String,
    actuated: bool,
    value: Option<ControlValue>,
}

impl MockControl {
    pub fn new(name: impl Into<String>, actuated: bool, value: Option<ControlValue>) -> Self {
        Self {
            name: name.into(),
            actuated,
            value,
        }
    }

    /// A digital button.
    pub fn button(name: impl Into<String>, pressed: bool) -> Self {
        Self::new(name, pressed, Some(ControlValue::Button(pressed)))
    }

    /// An axis; actuated whenever the value is non-zero.
    pub fn axis(name: impl Into<String>, value: f32) -> Self {
        Self::new(name, value != 0.0, Some(ControlValue::Axis(value)))
    }

    /// A two-dimensional control; actuated whenever either component is non-zero.
    pub fn vector(name: impl Into<String>, x: f32, y: f32) -> Self {
        Self::new(name, x != 0.0 || y != 0.0, Some(ControlValue::Vector2(x, y)))
    }
}

impl Control for MockControl {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_actuated(&self) -> bool {
        self.actuated
    }

    fn read_value(&self) -> Option<ControlValue> {
        self.value
    }
}

/// An immutable device state. The host swaps in a new one on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct MockDevice {
    id: DeviceId,
    controls: Vec<MockControl>,
}

impl MockDevice {
    pub fn new(id: DeviceId, controls: Vec<MockControl>) -> Self {
        Self { id, controls }
    }

    /// A gate button plus one axis, both at rest.
    pub fn single_axis(id: DeviceId) -> Self {
        Self::new(
            id,
            vec![MockControl::button("gate", false), MockControl::axis("axis", 0.0)],
        )
    }

    pub fn controls(&self) -> &[MockControl] {
        &self.controls
    }

    /// Applies an injected state event: each control takes the event's value.
    fn with_state(&self, event: &StateEvent) -> Self {
        let controls = self
            .controls
            .iter()
            .zip(event.values())
            .map(|(control, &value)| match control.value {
                Some(ControlValue::Button(_)) => MockControl::button(control.name.clone(), value != 0.0),
                Some(ControlValue::Integer(_)) => MockControl::new(
                    control.name.clone(),
                    value != 0.0,
                    Some(ControlValue::Integer(value as i32)),
                ),
                Some(ControlValue::Vector2(..)) | None => control.clone(),
                Some(ControlValue::Axis(_)) => MockControl::axis(control.name.clone(), value),
            })
            .collect();
        Self::new(self.id, controls)
    }
}

impl InputDevice for MockDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn all_controls(&self) -> Vec<&dyn Control> {
        self.controls.iter().map(|c| c as &dyn Control).collect()
    }
}

#[derive(Debug)]
enum Pending {
    Scripted {
        device: MockDevice,
        kind: RawEventKind,
    },
    Injected(StateEvent),
}

#[derive(Default)]
struct HostState {
    devices: BTreeMap<DeviceId, Arc<MockDevice>>,
    listeners: Vec<(SubscriptionId, SharedListener)>,
    pending: VecDeque<Pending>,
    clock: f64,
    next_event_id: u32,
    next_subscription: u64,
}

/// A mock implementation of [`InputHost`] that lets tests script device input.
#[derive(Default)]
pub struct MockInputHost {
    state: Mutex<HostState>,
    /// Every event passed to `inject_event`, in order.
    pub injected: Mutex<Vec<StateEvent>>,
    /// When `true`, `inject_event` fails with [`InjectError::Rejected`].
    pub reject_injection: bool,
}

impl MockInputHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose `inject_event` always fails.
    pub fn rejecting() -> Self {
        Self {
            reject_injection: true,
            ..Self::default()
        }
    }

    /// Adds (or replaces) a device.
    pub fn add_device(&self, device: MockDevice) {
        self.lock_state().devices.insert(device.id, Arc::new(device));
    }

    /// Removes a device, as if it were unplugged.
    pub fn remove_device(&self, id: DeviceId) {
        self.lock_state().devices.remove(&id);
    }

    /// Schedules `device` as the new state of its device, delivered on the next poll.
    pub fn queue_state(&self, device: MockDevice, kind: RawEventKind) {
        self.lock_state()
            .pending
            .push_back(Pending::Scripted { device, kind });
    }

    /// Advances the host clock.
    pub fn advance(&self, seconds: f64) {
        self.lock_state().clock += seconds;
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock_state().listeners.len()
    }

    /// Snapshot of every injected event so far.
    pub fn injected_events(&self) -> Vec<StateEvent> {
        self.injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies every pending state change and dispatches one raw event per change.
    ///
    /// Returns the number of events dispatched.
    pub fn poll(&self) -> usize {
        let (batch, listeners) = {
            let mut state = self.lock_state();
            let mut batch = Vec::new();
            while let Some(pending) = state.pending.pop_front() {
                let (device, kind) = match pending {
                    Pending::Scripted { device, kind } => (Arc::new(device), kind),
                    Pending::Injected(event) => {
                        let Some(current) = state.devices.get(&event.device_id()) else {
                            debug!("dropping injected event for missing device {}", event.device_id());
                            continue;
                        };
                        (Arc::new(current.with_state(&event)), RawEventKind::State)
                    }
                };
                state.devices.insert(device.id, Arc::clone(&device));
                let raw = RawEvent {
                    id: state.next_event_id,
                    device_id: device.id,
                    time: state.clock,
                    kind,
                };
                state.next_event_id = state.next_event_id.wrapping_add(1);
                batch.push((raw, device));
            }
            (batch, state.listeners.clone())
        };

        // Listeners run without the host lock held.
        for (raw, device) in &batch {
            for (_, listener) in &listeners {
                listener
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .on_raw_event(raw, device.as_ref());
            }
        }
        batch.len()
    }

    fn lock_state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputHost for MockInputHost {
    fn subscribe(&self, listener: SharedListener) -> SubscriptionId {
        let mut state = self.lock_state();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock_state();
        let before = state.listeners.len();
        state.listeners.retain(|(sid, _)| *sid != id);
        state.listeners.len() != before
    }

    fn device_by_id(&self, id: DeviceId) -> Option<Arc<dyn InputDevice>> {
        self.lock_state()
            .devices
            .get(&id)
            .map(|d| Arc::clone(d) as Arc<dyn InputDevice>)
    }

    fn inject_event(&self, event: StateEvent) -> Result<(), InjectError> {
        if self.reject_injection {
            return Err(InjectError::Rejected("mock failure".into()));
        }
        self.injected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        self.lock_state().pending.push_back(Pending::Injected(event));
        Ok(())
    }

    fn now(&self) -> f64 {
        self.lock_state().clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inputrec_core::input::RawEventListener;

    #[derive(Default)]
    struct CollectingListener {
        events: Vec<(RawEvent, Vec<bool>)>,
    }

    impl RawEventListener for CollectingListener {
        fn on_raw_event(&mut self, event: &RawEvent, device: &dyn InputDevice) {
            let actuation = device.all_controls().iter().map(|c| c.is_actuated()).collect();
            self.events.push((event.clone(), actuation));
        }
    }

    fn subscribed_host() -> (MockInputHost, Arc<Mutex<CollectingListener>>, SubscriptionId) {
        let host = MockInputHost::new();
        host.add_device(MockDevice::single_axis(1));
        let listener = Arc::new(Mutex::new(CollectingListener::default()));
        let id = host.subscribe(Arc::clone(&listener) as SharedListener);
        (host, listener, id)
    }

    #[test]
    fn test_poll_dispatches_queued_state_with_device_snapshot() {
        // Arrange
        let (host, listener, _) = subscribed_host();
        host.advance(1.5);
        host.queue_state(
            MockDevice::new(1, vec![MockControl::button("gate", true), MockControl::axis("x", 0.2)]),
            RawEventKind::Delta,
        );

        // Act
        let dispatched = host.poll();

        // Assert
        assert_eq!(dispatched, 1);
        let guard = listener.lock().unwrap();
        let events = &guard.events;
        assert_eq!(events[0].0.time, 1.5);
        assert_eq!(events[0].0.kind, RawEventKind::Delta);
        assert_eq!(events[0].1, vec![true, true]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (host, listener, id) = subscribed_host();

        assert!(host.unsubscribe(id));
        assert!(!host.unsubscribe(id), "second unsubscribe must report false");
        host.queue_state(MockDevice::single_axis(1), RawEventKind::State);
        host.poll();

        assert!(listener.lock().unwrap().events.is_empty());
    }

    #[test]
    fn test_injected_event_is_logged_and_fed_back_on_next_poll() {
        // Arrange
        let (host, listener, _) = subscribed_host();
        let device = host.device_by_id(1).expect("device present");
        let mut event = StateEvent::from_device(device.as_ref());
        event.write_value(1, 0.7).unwrap();

        // Act
        host.inject_event(event).expect("accepted");
        assert!(listener.lock().unwrap().events.is_empty(), "not dispatched before poll");
        host.poll();

        // Assert
        assert_eq!(host.injected_events().len(), 1);
        assert_eq!(listener.lock().unwrap().events.len(), 1);
        let device = host.device_by_id(1).unwrap();
        let reading = device.all_controls()[1].read_value();
        assert_eq!(reading, Some(ControlValue::Axis(0.7)));
    }

    #[test]
    fn test_reject_injection_returns_error() {
        let host = MockInputHost::rejecting();
        host.add_device(MockDevice::single_axis(1));
        let device = host.device_by_id(1).unwrap();

        let result = host.inject_event(StateEvent::from_device(device.as_ref()));

        assert!(matches!(result, Err(InjectError::Rejected(_))));
        assert!(host.injected_events().is_empty());
    }

    #[test]
    fn test_removed_device_is_not_found() {
        let host = MockInputHost::new();
        host.add_device(MockDevice::single_axis(3));
        host.remove_device(3);
        assert!(host.device_by_id(3).is_none());
    }
}
