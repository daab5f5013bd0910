//! ReplayEngine: re-injects recorded input on a virtual clock.
//!
//! # State machine
//!
//! ```text
//!            start()                 last record consumed
//!   Idle ───────────────► Playing ─────────────────────────► Finished
//!    ▲                      │                                   │
//!    └──── abort() ─────────┘            start() ◄──────────────┘
//! ```
//!
//! The engine never blocks. The host calls [`ReplayEngine::tick`] once per
//! frame with the elapsed wall time; each call injects the records that have
//! come due and returns.
//!
//! Only [`ReplayEngine::start`] and [`ReplayEngine::abort`] touch the capture
//! engine. `tick` injects without it, so a host may deliver injected events to
//! its subscribers synchronously from `inject_event`. Once playback finishes
//! the caller restores capture from [`ReplayEngine::capture_to_restore`].
//!
//! # Pacing
//!
//! Each tick advances the virtual clock by `delta` and fires every pending
//! record whose time is at or before that deadline. After a successful
//! injection the clock is set to the record's own time, so playback follows
//! the recorded timeline rather than accumulated frame jitter.
//!
//! # Failures
//!
//! A record whose device is gone, whose control is not addressable, or that
//! the host rejects is logged and skipped. Under the default
//! [`DeviceMissingPolicy::DeferRemainder`] the rest of that tick's due records
//! wait for the next tick, limiting error bursts to one skip per tick.

use inputrec_core::{
    input::{InjectError, InputHost, StateEvent},
    record::{DeviceId, Record, RecordStore},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::capture::CaptureEngine;

/// What to do with the remaining due records after a failed injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMissingPolicy {
    /// Skip the failing record and defer the rest of this tick's records.
    #[default]
    DeferRemainder,
    /// Skip the failing record and keep processing due records.
    SkipRecord,
}

/// Replay lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    Idle,
    Playing,
    Finished,
}

/// Why a single record could not be replayed.
#[derive(Debug, Error, PartialEq)]
pub enum ReplayFailure {
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),
    #[error(transparent)]
    Inject(#[from] InjectError),
}

/// Per-tick outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub injected: usize,
    pub skipped_invalid: usize,
    pub failed: usize,
    /// `true` on the tick that consumed the last record.
    pub finished: bool,
}

/// Totals for a whole replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaySummary {
    pub injected: usize,
    pub skipped_invalid: usize,
    pub failed: usize,
}

/// The replay engine.
#[derive(Debug, Default)]
pub struct ReplayEngine {
    state: ReplayState,
    policy: DeviceMissingPolicy,
    clock: f64,
    cursor: usize,
    snapshot: Vec<Record>,
    /// Capture state to restore when playback ends.
    resume_capture: bool,
    summary: ReplaySummary,
}

impl ReplayEngine {
    pub fn new(policy: DeviceMissingPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ReplayState::Playing
    }

    /// Virtual clock, in seconds since playback started.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Records not yet consumed.
    pub fn remaining(&self) -> usize {
        self.snapshot.len().saturating_sub(self.cursor)
    }

    pub fn summary(&self) -> ReplaySummary {
        self.summary
    }

    /// Capture state to restore once playback has finished.
    pub fn capture_to_restore(&self) -> bool {
        self.resume_capture
    }

    /// Overrides the capture state restored when playback ends.
    ///
    /// Returns the state that would have been restored.
    pub fn restore_capture_to(&mut self, recording: bool) -> bool {
        std::mem::replace(&mut self.resume_capture, recording)
    }

    /// Starts playing `snapshot` from virtual time 0 and suppresses live capture.
    ///
    /// `snapshot` should be the validated, time-sorted store. Returns `false`
    /// (and changes nothing) if playback is already running.
    pub fn start(&mut self, snapshot: RecordStore, capture: &mut CaptureEngine) -> bool {
        if self.is_playing() {
            debug!("replay already playing; ignoring start");
            return false;
        }
        self.snapshot = snapshot.into_records();
        self.cursor = 0;
        self.clock = 0.0;
        self.summary = ReplaySummary::default();
        self.resume_capture = capture.suppress();
        self.state = ReplayState::Playing;
        info!("replay started with {} records", self.snapshot.len());
        true
    }

    /// Advances playback by `delta` seconds of wall time.
    ///
    /// Does nothing unless playing. Capture stays suppressed after the final
    /// tick; see [`ReplayEngine::capture_to_restore`].
    pub fn tick(&mut self, delta: f64, host: &dyn InputHost) -> TickReport {
        let mut report = TickReport::default();
        if !self.is_playing() {
            return report;
        }

        self.clock += delta;
        let deadline = self.clock;

        while let Some(record) = self.snapshot.get(self.cursor) {
            if record.time > deadline {
                break;
            }
            if !record.valid {
                self.cursor += 1;
                report.skipped_invalid += 1;
                continue;
            }
            match Self::inject(record, host) {
                Ok(()) => {
                    debug!(
                        "replayed event {} t={:.3} control={} value={}",
                        record.event_id, record.time, record.control_index, record.value
                    );
                    self.clock = record.time;
                    self.cursor += 1;
                    report.injected += 1;
                }
                Err(failure) => {
                    warn!(
                        "skipping record {} at t={:.3}: {failure}",
                        record.event_id, record.time
                    );
                    self.cursor += 1;
                    report.failed += 1;
                    if self.policy == DeviceMissingPolicy::DeferRemainder {
                        break;
                    }
                }
            }
        }

        self.summary.injected += report.injected;
        self.summary.skipped_invalid += report.skipped_invalid;
        self.summary.failed += report.failed;

        if self.cursor >= self.snapshot.len() {
            self.finish();
            report.finished = true;
        }
        report
    }

    /// Forces `Playing → Idle`, discarding the snapshot and restoring capture.
    ///
    /// Returns `false` if nothing was playing.
    pub fn abort(&mut self, capture: &mut CaptureEngine) -> bool {
        if !self.is_playing() {
            return false;
        }
        info!("replay aborted with {} records remaining", self.remaining());
        self.snapshot.clear();
        self.cursor = 0;
        capture.resume(self.resume_capture);
        self.state = ReplayState::Idle;
        true
    }

    fn finish(&mut self) {
        self.state = ReplayState::Finished;
        info!(
            "replay finished: {} injected, {} failed, {} invalid skipped",
            self.summary.injected, self.summary.failed, self.summary.skipped_invalid
        );
    }

    fn inject(record: &Record, host: &dyn InputHost) -> Result<(), ReplayFailure> {
        let device = host
            .device_by_id(record.device_id())
            .ok_or(ReplayFailure::DeviceNotFound(record.device_id()))?;
        let mut event = StateEvent::from_device(device.as_ref());
        event.write_value(record.control_index, record.value)?;
        host.inject_event(event)?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::host::mock::{MockDevice, MockInputHost};
    use inputrec_core::input::{InputDevice, SharedListener, SubscriptionId};
    use mockall::mock;
    use std::sync::Arc;

    mock! {
        pub Host {}

        impl InputHost for Host {
            fn subscribe(&self, listener: SharedListener) -> SubscriptionId;
            fn unsubscribe(&self, id: SubscriptionId) -> bool;
            fn device_by_id(&self, id: DeviceId) -> Option<Arc<dyn InputDevice>>;
            fn inject_event(&self, event: StateEvent) -> Result<(), InjectError>;
            fn now(&self) -> f64;
        }
    }

    fn record(event_id: u32, device_id: DeviceId, time: f64, value: f32) -> Record {
        Record::captured(event_id, device_id, time, 1, value)
    }

    fn store(records: Vec<Record>) -> RecordStore {
        RecordStore::from_records(records)
    }

    fn host_with_device() -> MockInputHost {
        let host = MockInputHost::new();
        host.add_device(MockDevice::single_axis(1));
        host
    }

    fn injected_values(host: &MockInputHost) -> Vec<f32> {
        host.injected_events()
            .iter()
            .map(|e| e.value(1).expect("axis control"))
            .collect()
    }

    #[test]
    fn test_pacing_resyncs_clock_to_last_injected_record() {
        // Arrange
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::new(DeviceMissingPolicy::DeferRemainder);
        engine.start(
            store(vec![record(1, 1, 0.0, 0.1), record(2, 1, 0.5, 0.2), record(3, 1, 1.2, 0.3)]),
            &mut capture,
        );

        // Act / Assert – tick 1: clock 0.6, records at 0.0 and 0.5 fire
        let first = engine.tick(0.6, &host);
        assert_eq!(first.injected, 2);
        assert_eq!(engine.clock(), 0.5);
        assert!(!first.finished);

        // tick 2: clock 1.1, nothing due
        let second = engine.tick(0.6, &host);
        assert_eq!(second.injected, 0);
        assert!((engine.clock() - 1.1).abs() < 1e-9);

        // tick 3: clock 1.7, the 1.2 record fires and playback finishes
        let third = engine.tick(0.6, &host);
        assert_eq!(third.injected, 1);
        assert!(third.finished);
        assert_eq!(engine.state(), ReplayState::Finished);
        assert_eq!(injected_values(&host), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_record_exactly_at_deadline_fires() {
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(store(vec![record(1, 1, 0.5, 0.4)]), &mut capture);

        let report = engine.tick(0.5, &host);

        assert_eq!(report.injected, 1);
    }

    #[test]
    fn test_invalid_records_are_skipped_without_injection() {
        // Arrange
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(
            store(vec![Record::invalid(1, 1, 0.0), record(2, 1, 0.1, 0.9)]),
            &mut capture,
        );

        // Act
        let report = engine.tick(1.0, &host);

        // Assert
        assert_eq!(report.skipped_invalid, 1);
        assert_eq!(report.injected, 1);
        assert_eq!(injected_values(&host), vec![0.9]);
    }

    #[test]
    fn test_missing_device_defers_remainder_to_next_tick() {
        // Arrange – first due record targets an absent device
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::new(DeviceMissingPolicy::DeferRemainder);
        engine.start(
            store(vec![record(1, 9, 0.0, 0.1), record(2, 1, 0.1, 0.2), record(3, 1, 0.2, 0.3)]),
            &mut capture,
        );

        // Act
        let first = engine.tick(1.0, &host);

        // Assert – one skip, nothing else this tick
        assert_eq!(first.failed, 1);
        assert_eq!(first.injected, 0);
        assert_eq!(engine.remaining(), 2);

        let second = engine.tick(0.0, &host);
        assert_eq!(second.injected, 2);
        assert!(second.finished);
        assert_eq!(engine.summary().failed, 1);
    }

    #[test]
    fn test_skip_record_policy_keeps_processing() {
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::new(DeviceMissingPolicy::SkipRecord);
        engine.start(
            store(vec![record(1, 9, 0.0, 0.1), record(2, 1, 0.1, 0.2)]),
            &mut capture,
        );

        let report = engine.tick(1.0, &host);

        assert_eq!(report.failed, 1);
        assert_eq!(report.injected, 1);
        assert!(report.finished);
    }

    #[test]
    fn test_missing_device_never_reaches_injection() {
        // Arrange
        let mut host = MockHost::new();
        host.expect_device_by_id().returning(|_| None);
        host.expect_inject_event().never();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(store(vec![record(1, 5, 0.0, 0.1)]), &mut capture);

        // Act
        let report = engine.tick(0.1, &host);

        // Assert
        assert_eq!(report.failed, 1);
        assert!(report.finished);
    }

    #[test]
    fn test_rejected_injection_does_not_resync_clock() {
        // Arrange
        let host = MockInputHost::rejecting();
        host.add_device(MockDevice::single_axis(1));
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(store(vec![record(1, 1, 0.2, 0.1), record(2, 1, 5.0, 0.2)]), &mut capture);

        // Act
        let report = engine.tick(1.0, &host);

        // Assert
        assert_eq!(report.failed, 1);
        assert_eq!(engine.clock(), 1.0);
    }

    #[test]
    fn test_out_of_range_control_is_a_failure() {
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(store(vec![Record::captured(1, 1, 0.0, 7, 0.5)]), &mut capture);

        let report = engine.tick(0.1, &host);

        assert_eq!(report.failed, 1);
        assert!(host.injected_events().is_empty());
    }

    #[test]
    fn test_start_suppresses_capture_and_finish_reports_it() {
        // Arrange
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        capture.start_session(0.0);
        let mut engine = ReplayEngine::default();

        // Act
        engine.start(store(vec![record(1, 1, 0.0, 0.1)]), &mut capture);
        assert!(!capture.is_recording(), "capture must be suppressed while playing");
        let report = engine.tick(0.1, &host);

        // Assert – the caller owns the restore
        assert!(report.finished);
        assert!(!capture.is_recording());
        assert!(engine.capture_to_restore());
    }

    #[test]
    fn test_finish_does_not_report_capture_that_was_off() {
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();

        engine.start(store(vec![record(1, 1, 0.0, 0.1)]), &mut capture);
        engine.tick(0.1, &host);

        assert!(!engine.capture_to_restore());
    }

    #[test]
    fn test_start_while_playing_is_a_no_op() {
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        assert!(engine.start(store(vec![record(1, 1, 1.0, 0.1)]), &mut capture));

        let restarted = engine.start(store(vec![]), &mut capture);

        assert!(!restarted);
        assert_eq!(engine.remaining(), 1);
    }

    #[test]
    fn test_empty_snapshot_finishes_on_first_tick() {
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(RecordStore::new(), &mut capture);

        let report = engine.tick(0.016, &host);

        assert!(report.finished);
        assert_eq!(engine.state(), ReplayState::Finished);
    }

    #[test]
    fn test_tick_when_idle_does_nothing() {
        let host = host_with_device();
        let mut engine = ReplayEngine::default();

        let report = engine.tick(1.0, &host);

        assert_eq!(report, TickReport::default());
        assert_eq!(engine.clock(), 0.0);
    }

    #[test]
    fn test_abort_returns_to_idle_and_restores_capture() {
        // Arrange
        let mut capture = CaptureEngine::new(1);
        capture.start_session(0.0);
        let mut engine = ReplayEngine::default();
        engine.start(store(vec![record(1, 1, 3.0, 0.1)]), &mut capture);

        // Act
        let aborted = engine.abort(&mut capture);

        // Assert
        assert!(aborted);
        assert_eq!(engine.state(), ReplayState::Idle);
        assert_eq!(engine.remaining(), 0);
        assert!(capture.is_recording());
        assert!(!engine.abort(&mut capture), "second abort has nothing to stop");
    }

    #[test]
    fn test_replay_can_restart_after_finishing() {
        let host = host_with_device();
        let mut capture = CaptureEngine::new(1);
        let mut engine = ReplayEngine::default();
        engine.start(store(vec![record(1, 1, 0.0, 0.1)]), &mut capture);
        engine.tick(0.1, &host);

        assert!(engine.start(store(vec![record(2, 1, 0.0, 0.2)]), &mut capture));
        assert!(engine.is_playing());
        assert_eq!(engine.clock(), 0.0);
    }
}
