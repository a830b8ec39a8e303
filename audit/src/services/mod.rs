pub mod audit_log;
pub mod memory;

pub use audit_log::{AuditLogStore, PgAuditLogStore};
pub use memory::InMemoryAuditLog;
