//! Audit records and the subject-side types they are built from.

pub mod field;
pub mod log_entry;
pub mod subject;

pub use field::{Field, FieldKind, FieldValue};
pub use log_entry::{EventCode, FieldChange, LogEntry, LogLevel, NewFieldChange, NewLogEntry};
pub use subject::{Auditable, Snapshot, Tracked};
