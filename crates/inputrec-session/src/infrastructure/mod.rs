//! Infrastructure layer of the recorder.
//!
//! Contains the adapters behind the application's traits: the in-memory input
//! host used by the demo binary and tests, and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `inputrec_core`, but non-test application code MUST NOT import it.

pub mod host;
pub mod storage;
