//! InputSession: the explicitly owned context that composes capture, routing
//! and replay.
//!
//! One session owns one [`PriorityRouter`], one [`CaptureEngine`] subscribed to
//! the host's raw event stream and one [`ReplayEngine`]. There is no global
//! state: create a session per host and drop it (or call
//! [`InputSession::shutdown`]) to unsubscribe.
//!
//! # Router layout
//!
//! ```text
//! AlwaysOn   debug bindings     PlayRecord, StartRecord, StopRecord, ...
//! Tier(n)    capture consumer   live while nothing is registered above it
//! Tier(n+1)  replay consumer    registered for the duration of playback
//! ```
//!
//! Registering the replay consumer at a new top priority disables the capture
//! consumer. The router is therefore the one place that decides whether live
//! capture listens. The capture consumer shares a
//! [`CaptureGate`](super::capture::CaptureGate) with the engine, so a menu
//! registered through [`InputSession::router_mut`] silences an active
//! recording until it is unregistered.
//!
//! The capture mutex is never held while replay injects events, so a host may
//! deliver injected events to its subscribers from inside `inject_event`.
//!
//! # Session events
//!
//! Transitions are published on an unbounded channel returned by
//! [`InputSession::new`], so a host loop can `await` the end of a replay
//! without polling [`InputSession::replay_state`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use inputrec_core::{
    input::{InputHost, SharedListener, SubscriptionId},
    record::{DeviceId, PersistenceError, Record, RecordFile},
    router::{ActionSet, ConsumerHandle, ConsumerKind, PriorityRouter, RouterError},
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::capture::{CaptureConsumer, CaptureEngine};
use super::replay::{DeviceMissingPolicy, ReplayEngine, ReplayState, ReplaySummary, TickReport};

// ── Persistence port ──────────────────────────────────────────────────────────

/// Error raised by a [`RecordRepository`].
#[derive(Debug, Error)]
pub enum RecordFileError {
    /// Reading or writing the file failed.
    #[error("I/O error accessing records at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be encoded or decoded.
    #[error("failed to encode or decode records at {path}: {source}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: PersistenceError,
    },
}

/// Saves and loads record files.
///
/// Persistence may block, so it is only invoked from explicit save/load
/// calls, never from [`InputSession::tick`].
pub trait RecordRepository: Send {
    fn save(&self, path: &Path, file: &RecordFile) -> Result<(), RecordFileError>;
    fn load(&self, path: &Path) -> Result<RecordFile, RecordFileError>;
}

// ── Session types ─────────────────────────────────────────────────────────────

/// Errors returned by [`InputSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Records(#[from] RecordFileError),

    /// A debug action arrived while the debug bindings were not live.
    #[error("debug bindings are disabled")]
    DebugBindingsDisabled,

    /// A higher-priority consumer (replay, a menu) has disabled live capture.
    #[error("live capture is suppressed by a higher-priority consumer")]
    CaptureSuppressed,

    #[error("cannot load records while recording")]
    RecordingActive,

    #[error("cannot load records while replaying")]
    ReplayActive,
}

/// Actions bound to the always-on debug consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugAction {
    PlayRecord,
    StartRecord,
    StopRecord,
    SaveRecords,
    LoadRecords,
}

impl DebugAction {
    pub const ALL: [DebugAction; 5] = [
        DebugAction::PlayRecord,
        DebugAction::StartRecord,
        DebugAction::StopRecord,
        DebugAction::SaveRecords,
        DebugAction::LoadRecords,
    ];

    /// Binding name used in the debug action set.
    pub fn name(self) -> &'static str {
        match self {
            DebugAction::PlayRecord => "play_record",
            DebugAction::StartRecord => "start_record",
            DebugAction::StopRecord => "stop_record",
            DebugAction::SaveRecords => "save_records",
            DebugAction::LoadRecords => "load_records",
        }
    }
}

/// Notifications published by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    RecordingStarted,
    RecordingStopped { records: usize },
    ReplayStarted { records: usize },
    ReplayFinished(ReplaySummary),
    ReplayAborted,
    RecordsSaved { path: PathBuf, records: usize },
    RecordsLoaded { path: PathBuf, records: usize },
}

/// Construction-time settings for an [`InputSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// The single device recorded by capture.
    pub target_device: DeviceId,
    pub device_missing: DeviceMissingPolicy,
    /// Default path for save/load when none is given.
    pub record_path: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            target_device: 1,
            device_missing: DeviceMissingPolicy::default(),
            record_path: PathBuf::from("input_records/session.json"),
        }
    }
}

// ── InputSession ──────────────────────────────────────────────────────────────

/// The session context.
pub struct InputSession {
    host: Arc<dyn InputHost>,
    capture: Arc<Mutex<CaptureEngine>>,
    subscription: Option<SubscriptionId>,
    router: PriorityRouter,
    debug_handle: Option<ConsumerHandle>,
    capture_handle: ConsumerHandle,
    replay_handle: Option<ConsumerHandle>,
    replay: ReplayEngine,
    /// Capture state to restore on the next tick, once the host has polled
    /// the events injected by the final replay tick.
    pending_resume: Option<bool>,
    repository: Box<dyn RecordRepository>,
    settings: SessionSettings,
    session_id: Uuid,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl InputSession {
    /// Creates a session, subscribes capture to `host` and registers the
    /// debug and capture consumers.
    pub fn new(
        host: Arc<dyn InputHost>,
        repository: Box<dyn RecordRepository>,
        settings: SessionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();

        let engine = CaptureEngine::new(settings.target_device);
        let gate = engine.gate();
        let capture = Arc::new(Mutex::new(engine));
        let listener: SharedListener = Arc::clone(&capture) as SharedListener;
        let subscription = host.subscribe(listener);

        let mut router = PriorityRouter::new();
        let debug_handle =
            router.register_at_current_priority(ConsumerKind::Debug, Box::new(debug_bindings()));
        let capture_handle = router.register_at_current_priority(
            ConsumerKind::Gameplay,
            Box::new(CaptureConsumer::new(gate)),
        );

        let session_id = Uuid::new_v4();
        info!(
            "input session {session_id} created for device {}",
            settings.target_device
        );

        let session = Self {
            host,
            capture,
            subscription: Some(subscription),
            router,
            debug_handle: Some(debug_handle),
            capture_handle,
            replay_handle: None,
            replay: ReplayEngine::new(settings.device_missing),
            pending_resume: None,
            repository,
            settings,
            session_id,
            events,
        };
        (session, rx)
    }

    /// Identifier written into saved record files. Adopted from a loaded file.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn router(&self) -> &PriorityRouter {
        &self.router
    }

    /// Lets application code register its own consumers (menus, gameplay maps).
    pub fn router_mut(&mut self) -> &mut PriorityRouter {
        &mut self.router
    }

    /// Whether capture is recording, or will resume recording on the next tick.
    pub fn is_recording(&self) -> bool {
        self.pending_resume
            .unwrap_or_else(|| lock_capture(&self.capture).is_recording())
    }

    /// Valid captured records in arrival order.
    pub fn valid_records(&self) -> Vec<Record> {
        lock_capture(&self.capture).valid_records()
    }

    /// Every captured record, including invalid ones.
    pub fn record_count(&self) -> usize {
        lock_capture(&self.capture).records().len()
    }

    pub fn replay_state(&self) -> ReplayState {
        self.replay.state()
    }

    // ── Capture ───────────────────────────────────────────────────────────────

    /// Starts a capture session anchored at the host's current time.
    ///
    /// A no-op while already recording.
    ///
    /// # Errors
    ///
    /// [`SessionError::CaptureSuppressed`] when a higher-priority consumer has
    /// disabled the capture consumer.
    pub fn start_recording(&mut self) -> Result<(), SessionError> {
        if !self.router.is_enabled(self.capture_handle)? {
            return Err(SessionError::CaptureSuppressed);
        }
        self.pending_resume = None;
        let mut capture = lock_capture(&self.capture);
        if capture.is_recording() {
            return Ok(());
        }
        capture.start_session(self.host.now());
        drop(capture);
        self.emit(SessionEvent::RecordingStarted);
        Ok(())
    }

    /// Stops capture. Also cancels a resume scheduled by replay.
    pub fn stop_recording(&mut self) {
        let mut active = self.pending_resume.take().unwrap_or(false);
        if self.replay.is_playing() {
            active |= self.replay.restore_capture_to(false);
        }
        let mut capture = lock_capture(&self.capture);
        active |= capture.is_recording();
        if !active {
            return;
        }
        capture.stop_session();
        let records = capture.records().len();
        drop(capture);
        self.emit(SessionEvent::RecordingStopped { records });
    }

    // ── Replay ────────────────────────────────────────────────────────────────

    /// Starts replaying the validated, time-sorted captured records.
    ///
    /// Returns `Ok(false)` if a replay is already playing.
    pub fn start_replay(&mut self) -> Result<bool, SessionError> {
        if self.replay.is_playing() {
            debug!("replay already playing; ignoring start");
            return Ok(false);
        }
        let handle = self.router.register_at_new_top_priority(
            ConsumerKind::Gameplay,
            Box::new(ActionSet::new("replay", ["replay"])),
        );
        self.replay_handle = Some(handle);

        let mut capture = lock_capture(&self.capture);
        if let Some(was_recording) = self.pending_resume.take() {
            capture.resume(was_recording);
        }
        let snapshot = capture.snapshot();
        let records = snapshot.len();
        self.replay.start(snapshot, &mut capture);
        drop(capture);

        self.emit(SessionEvent::ReplayStarted { records });
        Ok(true)
    }

    /// Advances replay by `delta` seconds. Call once per host frame, after the
    /// host has polled raw input.
    pub fn tick(&mut self, delta: f64) -> Result<TickReport, SessionError> {
        if let Some(was_recording) = self.pending_resume.take() {
            lock_capture(&self.capture).resume(was_recording);
        }
        if !self.replay.is_playing() {
            return Ok(TickReport::default());
        }

        let report = self.replay.tick(delta, self.host.as_ref());
        if report.finished {
            self.pending_resume = Some(self.replay.capture_to_restore());
            self.release_replay_consumer()?;
            self.emit(SessionEvent::ReplayFinished(self.replay.summary()));
        }
        Ok(report)
    }

    /// Stops a running replay, discarding the remaining records.
    ///
    /// Returns `Ok(false)` if nothing was playing.
    pub fn abort_replay(&mut self) -> Result<bool, SessionError> {
        let mut capture = lock_capture(&self.capture);
        if !self.replay.abort(&mut capture) {
            return Ok(false);
        }
        self.pending_resume = Some(capture.suppress());
        drop(capture);
        self.release_replay_consumer()?;
        self.emit(SessionEvent::ReplayAborted);
        Ok(true)
    }

    fn release_replay_consumer(&mut self) -> Result<(), SessionError> {
        if let Some(handle) = self.replay_handle.take() {
            self.router.unregister(handle)?;
        }
        Ok(())
    }

    // ── Debug bindings ────────────────────────────────────────────────────────

    pub fn debug_bindings_enabled(&self) -> bool {
        self.debug_handle
            .is_some_and(|handle| self.router.is_enabled(handle).unwrap_or(false))
    }

    /// Registers or removes the always-on debug consumer.
    pub fn set_debug_bindings(&mut self, enabled: bool) -> Result<(), SessionError> {
        match (enabled, self.debug_handle) {
            (true, None) => {
                let handle = self
                    .router
                    .register_at_current_priority(ConsumerKind::Debug, Box::new(debug_bindings()));
                self.debug_handle = Some(handle);
            }
            (false, Some(handle)) => {
                self.router.unregister(handle)?;
                self.debug_handle = None;
            }
            _ => {}
        }
        Ok(())
    }

    /// Dispatches a debug action.
    ///
    /// # Errors
    ///
    /// [`SessionError::DebugBindingsDisabled`] if the debug consumer is not
    /// live or does not bind `action`, otherwise whatever the dispatched operation returns.
    pub fn trigger(&mut self, action: DebugAction) -> Result<(), SessionError> {
        let live = self
            .debug_handle
            .and_then(|handle| self.router.consumer(handle))
            .is_some_and(|consumer| consumer.accepts(action.name()));
        if !live {
            return Err(SessionError::DebugBindingsDisabled);
        }

        debug!("debug action {}", action.name());
        match action {
            DebugAction::PlayRecord => {
                self.start_replay()?;
            }
            DebugAction::StartRecord => self.start_recording()?,
            DebugAction::StopRecord => self.stop_recording(),
            DebugAction::SaveRecords => {
                self.save_records(None)?;
            }
            DebugAction::LoadRecords => {
                self.load_records(None)?;
            }
        }
        Ok(())
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Saves the validated, time-sorted records to `path` (or the configured
    /// record path). The live store is left untouched.
    ///
    /// Returns the number of records written.
    pub fn save_records(&self, path: Option<&Path>) -> Result<usize, SessionError> {
        let path = path.unwrap_or(self.settings.record_path.as_path()).to_path_buf();
        let file = {
            let capture = lock_capture(&self.capture);
            RecordFile::from_store(self.session_id, capture.target_device(), capture.records())
        };
        self.repository.save(&path, &file)?;

        let records = file.records().len();
        info!("saved {records} records to {}", path.display());
        self.emit(SessionEvent::RecordsSaved { path, records });
        Ok(records)
    }

    /// Replaces the captured records with those loaded from `path` (or the
    /// configured record path).
    ///
    /// Returns the number of records loaded.
    pub fn load_records(&mut self, path: Option<&Path>) -> Result<usize, SessionError> {
        if self.replay.is_playing() {
            return Err(SessionError::ReplayActive);
        }
        if self.is_recording() {
            return Err(SessionError::RecordingActive);
        }
        let path = path.unwrap_or(self.settings.record_path.as_path()).to_path_buf();
        let file = self.repository.load(&path)?;

        let mut capture = lock_capture(&self.capture);
        if file.target_device != capture.target_device() {
            warn!(
                "record file targets device {} but this session captures device {}",
                file.target_device,
                capture.target_device()
            );
        }
        self.session_id = file.session_id;
        let records = file.records().len();
        capture.replace_store(file.into_store());
        drop(capture);

        info!("loaded {records} records from {}", path.display());
        self.emit(SessionEvent::RecordsLoaded { path, records });
        Ok(records)
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    /// Aborts replay, stops capture and unsubscribes from the host.
    ///
    /// Idempotent; also run on drop.
    pub fn shutdown(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        if let Err(e) = self.abort_replay() {
            warn!("failed to release replay consumer: {e}");
        }
        self.stop_recording();
        self.host.unsubscribe(subscription);
        info!("input session {} shut down", self.session_id);
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("session event receiver dropped");
        }
    }
}

impl Drop for InputSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn debug_bindings() -> ActionSet {
    ActionSet::new("debug", DebugAction::ALL.iter().map(|action| action.name()))
}

fn lock_capture(capture: &Mutex<CaptureEngine>) -> MutexGuard<'_, CaptureEngine> {
    capture.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
