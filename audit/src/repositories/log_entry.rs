//! PostgreSQL access for audit log entries and their field changes.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::AuditError;
use crate::models::log_entry::{EventCode, FieldChange, LogEntry, LogEntryRow};
use crate::repositories::common::Conditions;
use crate::types::{ActorId, LogEntryId};

const ENTRY_COLUMNS: &str =
    "id, subject_type, subject_id, logged_at, actor_id, code, level, context";
const CHANGE_COLUMNS: &str = "id, log_entry_id, field, old_value, new_value";

#[derive(Debug, Clone, Default)]
pub struct LogEntryFilters {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub actor_id: Option<ActorId>,
    pub code: Option<EventCode>,
}

/// Inserts the entry and its changes on the given connection. Callers that
/// need the audit write to commit with their own subject write pass their
/// transaction here. A `Modified` entry without changes is rejected before
/// anything is written.
pub async fn insert_log_entry(conn: &mut PgConnection, entry: &LogEntry) -> Result<(), AuditError> {
    entry.validate()?;

    sqlx::query(
        "INSERT INTO audit_log_entries \
         (id, subject_type, subject_id, logged_at, actor_id, code, level, context) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(entry.id)
    .bind(&entry.subject_type)
    .bind(&entry.subject_id)
    .bind(entry.logged_at)
    .bind(entry.actor)
    .bind(entry.code.code())
    .bind(entry.level.value())
    .bind(&entry.context)
    .execute(&mut *conn)
    .await?;

    for change in &entry.changes {
        sqlx::query(
            "INSERT INTO audit_field_changes (id, log_entry_id, field, old_value, new_value) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(change.id)
        .bind(change.log_entry_id)
        .bind(&change.field)
        .bind(&change.old_value)
        .bind(&change.new_value)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn fetch_log_entry(pool: &PgPool, id: LogEntryId) -> Result<Option<LogEntry>, AuditError> {
    let query = format!("SELECT {} FROM audit_log_entries WHERE id = $1", ENTRY_COLUMNS);
    let row = sqlx::query_as::<_, LogEntryRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(attach_changes(pool, vec![row]).await?.into_iter().next()),
        None => Ok(None),
    }
}

/// Every entry recorded for one subject, newest first.
pub async fn history_for_subject(
    pool: &PgPool,
    subject_type: &str,
    subject_id: &str,
) -> Result<Vec<LogEntry>, AuditError> {
    let filters = LogEntryFilters {
        subject_type: Some(subject_type.to_string()),
        subject_id: Some(subject_id.to_string()),
        ..LogEntryFilters::default()
    };
    let rows = query_log_entries(pool, &filters, None).await?;
    attach_changes(pool, rows).await
}

pub async fn list_log_entries(
    pool: &PgPool,
    filters: &LogEntryFilters,
    per_page: i64,
    offset: i64,
) -> Result<(Vec<LogEntry>, i64), AuditError> {
    let rows = query_log_entries(pool, filters, Some((per_page, offset))).await?;
    let items = attach_changes(pool, rows).await?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM audit_log_entries");
    apply_log_entry_filters(&mut count_builder, filters);
    let total = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    Ok((items, total))
}

/// Field changes go with their entries through the cascading foreign key.
pub async fn delete_log_entries_before(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, AuditError> {
    let result = sqlx::query("DELETE FROM audit_log_entries WHERE logged_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

async fn query_log_entries(
    pool: &PgPool,
    filters: &LogEntryFilters,
    pagination: Option<(i64, i64)>,
) -> Result<Vec<LogEntryRow>, AuditError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM audit_log_entries", ENTRY_COLUMNS));
    apply_log_entry_filters(&mut builder, filters);
    builder.push(" ORDER BY logged_at DESC, id DESC");

    if let Some((per_page, offset)) = pagination {
        builder
            .push(" LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
    }

    Ok(builder.build_query_as::<LogEntryRow>().fetch_all(pool).await?)
}

async fn attach_changes(pool: &PgPool, rows: Vec<LogEntryRow>) -> Result<Vec<LogEntry>, AuditError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = rows.iter().map(|row| Uuid::from(row.id)).collect();
    let query = format!(
        "SELECT {} FROM audit_field_changes WHERE log_entry_id = ANY($1) ORDER BY field ASC",
        CHANGE_COLUMNS
    );
    let changes = sqlx::query_as::<_, FieldChange>(&query)
        .bind(ids)
        .fetch_all(pool)
        .await?;

    let mut by_entry: HashMap<LogEntryId, Vec<FieldChange>> = HashMap::new();
    for change in changes {
        by_entry.entry(change.log_entry_id).or_default().push(change);
    }

    rows.into_iter()
        .map(|row| {
            let changes = by_entry.remove(&row.id).unwrap_or_default();
            row.into_entry(changes)
        })
        .collect()
}

/// Returns whether any filter was applied.
fn apply_log_entry_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &LogEntryFilters) -> bool {
    let mut conditions = Conditions::new(builder);
    if let Some(from) = filters.from {
        conditions.push_condition().push("logged_at >= ").push_bind(from);
    }
    if let Some(to) = filters.to {
        conditions.push_condition().push("logged_at <= ").push_bind(to);
    }
    if let Some(subject_type) = filters.subject_type.as_ref() {
        conditions
            .push_condition()
            .push("subject_type = ")
            .push_bind(subject_type.clone());
    }
    if let Some(subject_id) = filters.subject_id.as_ref() {
        conditions
            .push_condition()
            .push("subject_id = ")
            .push_bind(subject_id.clone());
    }
    if let Some(actor_id) = filters.actor_id {
        conditions.push_condition().push("actor_id = ").push_bind(actor_id);
    }
    if let Some(code) = filters.code {
        conditions.push_condition().push("code = ").push_bind(code.code());
    }
    !conditions.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_filters_default_all_none() {
        let filters = LogEntryFilters::default();
        assert!(filters.from.is_none());
        assert!(filters.to.is_none());
        assert!(filters.subject_type.is_none());
        assert!(filters.subject_id.is_none());
        assert!(filters.actor_id.is_none());
        assert!(filters.code.is_none());
    }

    #[test]
    fn filters_render_where_and_chain() {
        let filters = LogEntryFilters {
            subject_type: Some("shop.Order".into()),
            code: Some(EventCode::Modified),
            ..LogEntryFilters::default()
        };
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_log_entries");
        assert!(apply_log_entry_filters(&mut builder, &filters));
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM audit_log_entries WHERE subject_type = $1 AND code = $2"
        );
    }

    #[test]
    fn select_columns_cover_row_shape() {
        for column in ["subject_type", "subject_id", "actor_id", "code", "level", "context"] {
            assert!(ENTRY_COLUMNS.contains(column));
        }
        assert!(CHANGE_COLUMNS.contains("log_entry_id"));
    }
}
