use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::AuditError;
use crate::models::log_entry::{LogEntry, NewLogEntry};
use crate::repositories::{log_entry as log_entry_repo, transaction};
use crate::types::LogEntryId;

/// Append-only destination for audit entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Stores the entry with its field changes and returns it as stored.
    async fn record(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError>;

    /// Entries for one subject, newest first.
    async fn history(&self, subject_type: &str, subject_id: &str)
        -> Result<Vec<LogEntry>, AuditError>;

    /// Deletes entries logged before `cutoff`, together with their changes.
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError>;
}

#[async_trait]
impl<T: AuditLogStore + ?Sized> AuditLogStore for Arc<T> {
    async fn record(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        (**self).record(entry).await
    }

    async fn history(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<LogEntry>, AuditError> {
        (**self).history(subject_type, subject_id).await
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        (**self).purge_before(cutoff).await
    }
}

#[derive(Debug, Clone)]
pub struct PgAuditLogStore {
    pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn record(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        entry.validate()?;
        // Postgres keeps microseconds; trim so the returned entry equals the stored one.
        let entry = entry.into_entry(LogEntryId::new(), Utc::now().trunc_subsecs(6));

        let mut tx = transaction::begin_transaction(&self.pool).await?;
        log_entry_repo::insert_log_entry(&mut tx, &entry).await?;
        transaction::commit_transaction(tx).await?;

        tracing::debug!(
            entry_id = %entry.id,
            subject_type = %entry.subject_type,
            code = entry.code.code(),
            changes = entry.changes.len(),
            "Stored audit log entry"
        );
        Ok(entry)
    }

    async fn history(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<LogEntry>, AuditError> {
        log_entry_repo::history_for_subject(&self.pool, subject_type, subject_id).await
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        log_entry_repo::delete_log_entries_before(&self.pool, cutoff).await
    }
}
