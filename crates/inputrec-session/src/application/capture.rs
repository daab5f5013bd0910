//! CaptureEngine: turns polled raw device events into [`Record`]s.
//!
//! The engine listens to the host's raw event stream (it implements
//! [`RawEventListener`]) and, while a session is active, appends exactly one
//! record per event from the target device.
//!
//! # Capture algorithm
//!
//! ```text
//! gate control (index 0) actuated?
//!   no  ──► Record { valid: false }
//!   yes ──► first actuated control from index 1 onward
//!             none found      ──► Record { valid: false, control_index: past-the-end }
//!             State event     ──► value = 0
//!             Delta event     ──► value = scalar reading
//!                                   no scalar ──► Record { valid: false }
//! ```
//!
//! Only one device is recorded per session and only one changed control per
//! event. A bad event never aborts the session; it is kept as an invalid
//! record and dropped before persistence.
//!
//! # Router gating
//!
//! The engine listens only while its [`CaptureGate`] is open. The gate is
//! shared with a [`CaptureConsumer`] registered in the router, so every
//! enable/disable pass (a menu pushed on top, replay starting) opens or
//! closes capture immediately, even mid-session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use inputrec_core::{
    input::{ControlValue, InputDevice, RawEvent, RawEventKind, RawEventListener},
    record::{DeviceId, Record, RecordStore, GATE_CONTROL},
    router::{ActionSet, InputConsumer},
};
use tracing::{debug, info};

/// Listening flag shared between a [`CaptureEngine`] and its [`CaptureConsumer`].
#[derive(Debug, Clone)]
pub struct CaptureGate(Arc<AtomicBool>);

impl CaptureGate {
    fn new(open: bool) -> Self {
        Self(Arc::new(AtomicBool::new(open)))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, open: bool) {
        self.0.store(open, Ordering::Release);
    }
}

/// The router's view of live capture.
///
/// Enabling or disabling it opens or closes the engine's [`CaptureGate`].
#[derive(Debug)]
pub struct CaptureConsumer {
    actions: ActionSet,
    gate: CaptureGate,
}

impl CaptureConsumer {
    /// Creates a disabled consumer and closes `gate` to match.
    pub fn new(gate: CaptureGate) -> Self {
        gate.set(false);
        Self {
            actions: ActionSet::new("capture", ["record"]),
            gate,
        }
    }
}

impl InputConsumer for CaptureConsumer {
    fn name(&self) -> &str {
        self.actions.name()
    }

    fn enable(&mut self) {
        self.actions.enable();
        self.gate.set(true);
    }

    fn disable(&mut self) {
        self.actions.disable();
        self.gate.set(false);
    }

    fn is_enabled(&self) -> bool {
        self.actions.is_enabled()
    }

    fn accepts(&self, action: &str) -> bool {
        self.actions.accepts(action)
    }
}

/// The capture engine. Exclusively owns the [`RecordStore`] while recording.
#[derive(Debug)]
pub struct CaptureEngine {
    target_device: DeviceId,
    recording: bool,
    gate: CaptureGate,
    /// Host time at which the current session started.
    origin: f64,
    store: RecordStore,
}

impl CaptureEngine {
    /// Creates an idle engine that records `target_device` once started.
    ///
    /// The gate starts open; it only closes once handed to a [`CaptureConsumer`].
    pub fn new(target_device: DeviceId) -> Self {
        Self {
            target_device,
            recording: false,
            gate: CaptureGate::new(true),
            origin: 0.0,
            store: RecordStore::new(),
        }
    }

    pub fn target_device(&self) -> DeviceId {
        self.target_device
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// The gate controlling whether raw events are accepted at all.
    pub fn gate(&self) -> CaptureGate {
        self.gate.clone()
    }

    /// `true` while a session is active and the router lets capture listen.
    pub fn is_listening(&self) -> bool {
        self.recording && self.gate.is_open()
    }

    /// Clears the store and starts accepting events.
    ///
    /// `now` is the host clock; record times are relative to it. Calling this
    /// while already recording is a no-op and keeps the existing records.
    pub fn start_session(&mut self, now: f64) {
        if self.recording {
            debug!("capture session already active; ignoring start");
            return;
        }
        self.store.clear();
        self.origin = now;
        self.recording = true;
        info!("capture session started for device {}", self.target_device);
    }

    /// Stops accepting events. The store is kept.
    pub fn stop_session(&mut self) {
        if self.recording {
            self.recording = false;
            info!("capture session stopped with {} records", self.store.len());
        }
    }

    /// Stops listening without ending the session bookkeeping.
    ///
    /// Returns whether capture was listening, to be passed back to [`CaptureEngine::resume`].
    pub fn suppress(&mut self) -> bool {
        std::mem::replace(&mut self.recording, false)
    }

    /// Restores the listening state returned by [`CaptureEngine::suppress`].
    ///
    /// Unlike [`CaptureEngine::start_session`], this never clears the store.
    pub fn resume(&mut self, was_recording: bool) {
        self.recording = was_recording;
    }

    /// Every record in arrival order, including invalid ones.
    pub fn records(&self) -> &RecordStore {
        &self.store
    }

    /// The valid records in arrival order.
    pub fn valid_records(&self) -> Vec<Record> {
        self.store.valid_records()
    }

    /// Validated, time-sorted copy of the store.
    pub fn snapshot(&self) -> RecordStore {
        self.store.snapshot()
    }

    /// Replaces the store wholesale, e.g. after loading a record file.
    pub fn replace_store(&mut self, store: RecordStore) {
        self.store = store;
    }

    /// Moves the store out, leaving an empty one behind.
    pub fn take_store(&mut self) -> RecordStore {
        std::mem::take(&mut self.store)
    }

    /// Builds the record for one raw event.
    fn capture(&self, event: &RawEvent, device: &dyn InputDevice) -> Record {
        let time = (event.time - self.origin).max(0.0);
        let controls = device.all_controls();

        let gate_actuated = controls
            .get(GATE_CONTROL)
            .is_some_and(|gate| gate.is_actuated());
        if !gate_actuated {
            return Record::invalid(event.id, event.device_id, time);
        }

        let Some(index) = controls
            .iter()
            .enumerate()
            .skip(GATE_CONTROL + 1)
            .find(|(_, control)| control.is_actuated())
            .map(|(index, _)| index)
        else {
            debug!("event {}: gate actuated but no other control is", event.id);
            let mut record = Record::invalid(event.id, event.device_id, time);
            record.control_index = controls.len();
            return record;
        };

        let value = match event.kind {
            RawEventKind::State => 0.0,
            RawEventKind::Delta => {
                match controls[index].read_value().and_then(ControlValue::as_scalar) {
                    Some(value) => value,
                    None => {
                        debug!(
                            "event {}: control {} ({}) has no scalar reading",
                            event.id,
                            index,
                            controls[index].name()
                        );
                        let mut record = Record::invalid(event.id, event.device_id, time);
                        record.control_index = index;
                        return record;
                    }
                }
            }
        };

        Record::captured(event.id, event.device_id, time, index, value)
    }
}

impl RawEventListener for CaptureEngine {
    fn on_raw_event(&mut self, event: &RawEvent, device: &dyn InputDevice) {
        if !self.is_listening() || event.device_id != self.target_device {
            return;
        }
        let record = self.capture(event, device);
        debug!(
            "captured event {} t={:.3} control={} valid={} value={}",
            record.event_id, record.time, record.control_index, record.valid, record.value
        );
        self.store.push(record);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
