//! # inputrec-core
//!
//! Shared library for input record/replay containing the record model, the
//! bit-exact value codec, the record file encoding, the host input interface
//! and the priority input router.
//!
//! It performs no I/O and has no dependency on a concrete input backend.
//!
//! # Architecture overview (for beginners)
//!
//! A live session produces a stream of raw device events. Capture turns each
//! event into a compact [`Record`]; persistence writes the records out; replay
//! later feeds them back into the same input pipeline on a virtual clock.
//! Meanwhile the router decides which bound action sets receive live input.
//!
//! - **`record`** – [`Record`], [`RecordStore`], the 4-byte value codec and
//!   the JSON / binary record file encoding.
//! - **`input`** – the traits the core needs from the host input subsystem:
//!   subscribe to raw events, query controls, look up devices, inject events.
//! - **`router`** – [`PriorityRouter`], which enables exactly the always-on
//!   consumers plus the consumers at the current priority tier.

pub mod input;
pub mod record;
pub mod router;

pub use input::{
    Control, ControlValue, InjectError, InputDevice, InputHost, RawEvent, RawEventKind,
    RawEventListener, SharedListener, StateEvent, SubscriptionId,
};
pub use record::{
    decode_records, decode_value, encode_records, encode_value, DeviceId, PersistenceError,
    Record, RecordFile, RecordFormat, RecordStore, GATE_CONTROL,
};
pub use router::{
    ActionSet, ConsumerHandle, ConsumerKind, InputConsumer, Priority, PriorityRouter, RouterError,
};
