//! Application layer of the recorder.
//!
//! Use cases here orchestrate the pure types from `inputrec_core` and talk to
//! the outside world only through traits (`InputHost`, `RecordRepository`),
//! so the infrastructure can be swapped without touching this code. Nothing
//! in this layer blocks or touches the file system directly.
//!
//! # Sub-modules
//!
//! - **`capture`** – Turns raw device events into records while a capture
//!   session is active.
//!
//! - **`replay`** – Tick-driven state machine that re-injects a record
//!   snapshot through the host on a virtual clock.
//!
//! - **`session`** – `InputSession`, the context object that owns the router,
//!   capture and replay engines and dispatches the debug bindings.

pub mod capture;
pub mod replay;
pub mod session;
