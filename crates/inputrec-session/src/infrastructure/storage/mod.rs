//! Storage infrastructure: configuration and record file persistence.
//!
//! - `config` reads and writes the TOML configuration, falling back to
//!   defaults when no file exists yet.
//! - `record_file` implements the application's `RecordRepository` port on
//!   the local file system.
//!
//! Both may block and are only called outside the tick loop.

pub mod config;
pub mod record_file;
