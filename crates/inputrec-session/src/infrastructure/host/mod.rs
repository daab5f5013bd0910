//! Host input subsystem adapters.
//!
//! The core only sees the [`inputrec_core::input::InputHost`] trait. An
//! engine integration implements it over the engine's input system; this
//! crate ships the in-memory [`mock::MockInputHost`] used by tests and the
//! demo binary.

pub mod mock;
