//! Storage seam for audited subjects.

use async_trait::async_trait;

use crate::error::AuditError;
use crate::models::subject::Auditable;

/// Storage for one subject type. Implemented by the host application.
#[async_trait]
pub trait SubjectStore<T: Auditable>: Send + Sync {
    /// Re-reads a persisted row by primary key.
    async fn fetch(&self, id: &str) -> Result<Option<T>, AuditError>;

    /// Inserts a new row and returns it with its assigned identity.
    async fn insert(&self, record: &T) -> Result<T, AuditError>;

    /// Updates an existing row and returns it as stored.
    async fn update(&self, record: &T) -> Result<T, AuditError>;

    async fn delete(&self, id: &str) -> Result<(), AuditError>;

    /// Batch insert; returns the number of rows written.
    async fn insert_many(&self, records: &[T]) -> Result<u64, AuditError>;
}
