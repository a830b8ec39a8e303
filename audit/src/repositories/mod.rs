pub mod audited;
pub mod common;
pub mod log_entry;
pub mod subject;
pub mod transaction;

pub use audited::{AuditedRepository, SaveOutcome};
pub use log_entry::LogEntryFilters;
pub use subject::SubjectStore;
