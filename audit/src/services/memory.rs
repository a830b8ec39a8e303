//! Process-local audit log, for embedding without a database and for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::AuditError;
use crate::models::log_entry::{LogEntry, NewLogEntry};
use crate::services::audit_log::AuditLogStore;
use crate::types::LogEntryId;

#[derive(Debug, Clone, Default)]
pub struct InMemoryAuditLog {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored entry in insertion order.
    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditLogStore for InMemoryAuditLog {
    async fn record(&self, entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        entry.validate()?;
        let entry = entry.into_entry(LogEntryId::new(), Utc::now());
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn history(
        &self,
        subject_type: &str,
        subject_id: &str,
    ) -> Result<Vec<LogEntry>, AuditError> {
        let entries = self.entries.read().await;
        let mut matching: Vec<LogEntry> = entries
            .iter()
            .rev()
            .filter(|entry| {
                entry.subject_type == subject_type
                    && entry.subject_id.as_deref() == Some(subject_id)
            })
            .cloned()
            .collect();
        // Insertion order breaks timestamp ties, newest first.
        matching.sort_by(|a, b| b.logged_at.cmp(&a.logged_at));
        Ok(matching)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AuditError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.logged_at >= cutoff);
        Ok((before - entries.len()) as u64)
    }
}
