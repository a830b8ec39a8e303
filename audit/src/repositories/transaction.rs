//! Transaction management utilities for the audit repositories.

use sqlx::postgres::PgTransaction;
use sqlx::PgPool;

use crate::error::AuditError;

/// Begin a new database transaction.
pub async fn begin_transaction(db: &PgPool) -> Result<PgTransaction<'static>, AuditError> {
    Ok(db.begin().await?)
}

/// Commit a transaction.
pub async fn commit_transaction(tx: PgTransaction<'_>) -> Result<(), AuditError> {
    Ok(tx.commit().await?)
}
