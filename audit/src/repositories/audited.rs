//! Auditing interceptor wrapped around a subject store.

use std::sync::Arc;

use crate::context::AuditContext;
use crate::diff::{self, ChangeSet};
use crate::error::AuditError;
use crate::models::log_entry::{EventCode, LogEntry, NewLogEntry};
use crate::models::subject::{Auditable, Snapshot, Tracked};
use crate::policy::AuditPolicy;
use crate::repositories::subject::SubjectStore;
use crate::services::audit_log::AuditLogStore;

/// Result of an audited save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub created: bool,
    /// The entry written for this save, if any.
    pub entry: Option<LogEntry>,
}

/// Writes subjects through `S` and appends the resulting changes to `L`.
///
/// The subject write and the log write are separate operations: if the log
/// write fails the subject change stays committed and the error is returned
/// to the caller. Hosts that need both in one transaction can call
/// [`crate::repositories::log_entry::insert_log_entry`] on their own
/// transaction instead.
pub struct AuditedRepository<S, L> {
    store: S,
    log: L,
    policy: Arc<AuditPolicy>,
}

impl<S, L> AuditedRepository<S, L> {
    pub fn new(store: S, log: L, policy: Arc<AuditPolicy>) -> Self {
        Self { store, log, policy }
    }

    pub fn policy(&self) -> &AuditPolicy {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn log(&self) -> &L {
        &self.log
    }
}

impl<S, L> AuditedRepository<S, L>
where
    L: AuditLogStore,
{
    /// Starts tracking a record that has not been stored yet.
    pub fn track_new<T: Auditable>(&self, record: T) -> Tracked<T> {
        Tracked::new(record, &self.policy)
    }

    /// Reads a record and captures its snapshot.
    pub async fn load<T>(&self, id: &str) -> Result<Option<Tracked<T>>, AuditError>
    where
        T: Auditable,
        S: SubjectStore<T>,
    {
        let record = self.store.fetch(id).await?;
        Ok(record.map(|record| Tracked::loaded(record, &self.policy)))
    }

    /// Writes the record and logs what changed.
    ///
    /// Inserts when the record has not been persisted, updates otherwise.
    /// A created record yields a `Created` entry without field changes; an
    /// update yields a `Modified` entry only when some audited field differs.
    pub async fn save<T>(
        &self,
        ctx: &AuditContext,
        tracked: &mut Tracked<T>,
    ) -> Result<SaveOutcome, AuditError>
    where
        T: Auditable,
        S: SubjectStore<T>,
    {
        let created = !tracked.is_persisted();

        if self.is_ignored(tracked) {
            let saved = self.write(tracked, created).await?;
            tracked.mark_saved(saved, None);
            return Ok(SaveOutcome {
                created,
                entry: None,
            });
        }

        let changes = self.changes_for(tracked).await?;
        let saved = self.write(tracked, created).await?;
        let snapshot = Snapshot::capture(&self.policy, &saved);
        let subject_id = saved.subject_id();
        tracked.mark_saved(saved, Some(snapshot));

        let entry = if created {
            let entry = NewLogEntry::new(EventCode::Created, T::SUBJECT_TYPE, subject_id)
                .with_context(ctx);
            Some(self.record(entry).await?)
        } else if !changes.is_empty() {
            let entry = NewLogEntry::new(EventCode::Modified, T::SUBJECT_TYPE, subject_id)
                .with_context(ctx)
                .with_changes(&changes);
            Some(self.record(entry).await?)
        } else {
            tracing::debug!(subject_type = T::SUBJECT_TYPE, "No audited changes to record");
            None
        };

        if let Some(entry) = entry.as_ref() {
            tracing::info!(
                entry_id = %entry.id,
                subject_type = %entry.subject_type,
                subject_id = ?entry.subject_id,
                actor_id = ?entry.actor,
                code = entry.code.code(),
                changes = entry.changes.len(),
                "Recorded audit entry"
            );
        }

        Ok(SaveOutcome { created, entry })
    }

    /// Deletes the record and logs a `Deleted` entry.
    pub async fn delete<T>(
        &self,
        ctx: &AuditContext,
        tracked: Tracked<T>,
    ) -> Result<Option<LogEntry>, AuditError>
    where
        T: Auditable,
        S: SubjectStore<T>,
    {
        let subject_id = match tracked.subject_id() {
            Some(id) if tracked.is_persisted() => id,
            _ => {
                return Err(AuditError::Validation(format!(
                    "cannot delete {} that was never stored",
                    T::SUBJECT_TYPE
                )))
            }
        };

        self.store.delete(&subject_id).await?;
        if self.is_ignored(&tracked) {
            return Ok(None);
        }

        let entry = NewLogEntry::new(EventCode::Deleted, T::SUBJECT_TYPE, Some(subject_id))
            .with_context(ctx);
        let entry = self.record(entry).await?;
        tracing::info!(
            entry_id = %entry.id,
            subject_type = %entry.subject_type,
            subject_id = ?entry.subject_id,
            "Recorded audit deletion"
        );
        Ok(Some(entry))
    }

    /// Batch insert that skips auditing entirely.
    pub async fn bulk_insert<T>(&self, records: &[T]) -> Result<u64, AuditError>
    where
        T: Auditable,
        S: SubjectStore<T>,
    {
        let written = self.store.insert_many(records).await?;
        tracing::debug!(
            subject_type = T::SUBJECT_TYPE,
            written,
            "Bulk insert bypassed auditing"
        );
        Ok(written)
    }

    /// Entries recorded for one subject, newest first.
    pub async fn history<T: Auditable>(&self, subject_id: &str) -> Result<Vec<LogEntry>, AuditError> {
        self.log.history(T::SUBJECT_TYPE, subject_id).await
    }

    /// The subject write has already happened when this fails.
    async fn record(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        let subject_type = entry.subject_type.clone();
        self.log.record(entry).await.map_err(|err| {
            tracing::warn!(
                subject_type = %subject_type,
                error = %err,
                "Audit log write failed after subject write"
            );
            err
        })
    }

    fn is_ignored<T: Auditable>(&self, tracked: &Tracked<T>) -> bool {
        tracked.is_audit_skipped() || self.policy.ignores_subject(T::SUBJECT_TYPE)
    }

    async fn changes_for<T>(&self, tracked: &Tracked<T>) -> Result<ChangeSet, AuditError>
    where
        T: Auditable,
        S: SubjectStore<T>,
    {
        if let Some(snapshot) = tracked.previous() {
            return Ok(diff::against_snapshot(&self.policy, snapshot, tracked.record()));
        }

        match tracked.subject_id() {
            Some(id) if tracked.is_persisted() => {
                let persisted = self
                    .store
                    .fetch(&id)
                    .await?
                    .ok_or_else(|| AuditError::not_found(T::SUBJECT_TYPE, id.clone()))?;
                Ok(diff::between(&self.policy, &persisted, tracked.record()))
            }
            _ => Ok(ChangeSet::default()),
        }
    }

    async fn write<T>(&self, tracked: &Tracked<T>, created: bool) -> Result<T, AuditError>
    where
        T: Auditable,
        S: SubjectStore<T>,
    {
        if created {
            self.store.insert(tracked.record()).await
        } else {
            self.store.update(tracked.record()).await
        }
    }
}
