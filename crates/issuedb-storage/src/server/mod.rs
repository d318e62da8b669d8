//! Server-mode connection management (spec §4.9/§4.10).
//!
//! Embedded mode talks to SQLite directly through [`crate::sqlite::SqliteStore`].
//! Server mode instead talks to a remote MySQL-protocol server through a
//! pooled connection ([`pool::ServerPool`]), with an optional per-query
//! watchdog ([`watchdog::run_with_deadline`]) and a background health
//! supervisor ([`supervisor::Supervisor`]). Building the full CRUD surface
//! against that remote connection is a separate concern from this plumbing
//! and is not attempted here; see `DESIGN.md`.

pub mod pool;
pub mod supervisor;
pub mod watchdog;

pub use pool::{ServerParams, ServerPool};
pub use supervisor::{Supervisor, SupervisorHandle};
pub use watchdog::run_with_deadline;
