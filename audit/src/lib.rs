//! Field-level change auditing for stored records.
//!
//! A record is snapshotted when it is loaded, diffed against that snapshot
//! right before it is written, and the changed fields are appended to an
//! audit log together with the acting user. [`AuditedRepository`] wraps a
//! [`SubjectStore`] and an [`AuditLogStore`] and runs those steps on every
//! save.

pub mod config;
pub mod context;
pub mod db;
pub mod diff;
pub mod error;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod repositories;
pub mod services;
pub mod types;

pub use context::AuditContext;
pub use error::AuditError;
pub use models::{Auditable, EventCode, Field, FieldKind, FieldValue, LogEntry, LogLevel, Tracked};
pub use policy::AuditPolicy;
pub use repositories::{AuditedRepository, SaveOutcome, SubjectStore};
pub use services::{AuditLogStore, InMemoryAuditLog, PgAuditLogStore};
