use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::context::AuditContext;
use crate::diff::ChangeSet;
use crate::error::AuditError;
use crate::types::{ActorId, FieldChangeId, LogEntryId};

/// Longest text kept for an old or new value; longer values are cut.
pub const MAX_VALUE_CHARS: usize = 255;

/// What happened to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCode {
    Created,
    Modified,
    Deleted,
}

impl EventCode {
    pub fn code(&self) -> i32 {
        match self {
            EventCode::Created => 10001,
            EventCode::Modified => 10002,
            EventCode::Deleted => 10003,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            10001 => Some(EventCode::Created),
            10002 => Some(EventCode::Modified),
            10003 => Some(EventCode::Deleted),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            EventCode::Created => "Object created.",
            EventCode::Modified => "Object modified.",
            EventCode::Deleted => "Object deleted.",
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message())
    }
}

/// Severity attached to a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn value(&self) -> i16 {
        match self {
            LogLevel::Debug => 10,
            LogLevel::Info => 20,
            LogLevel::Success => 25,
            LogLevel::Warning => 30,
            LogLevel::Error => 40,
            LogLevel::Critical => 50,
        }
    }

    pub fn from_value(value: i16) -> Option<Self> {
        match value {
            10 => Some(LogLevel::Debug),
            20 => Some(LogLevel::Info),
            25 => Some(LogLevel::Success),
            30 => Some(LogLevel::Warning),
            40 => Some(LogLevel::Error),
            50 => Some(LogLevel::Critical),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Success => "Success",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
        }
    }
}

/// One recorded field difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FieldChange {
    pub id: FieldChangeId,
    pub log_entry_id: LogEntryId,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {})",
            self.field,
            self.old_value.as_deref().unwrap_or(""),
            self.new_value.as_deref().unwrap_or("")
        )
    }
}

/// One audit event on a subject, with the field changes it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub subject_type: String,
    pub subject_id: Option<String>,
    pub logged_at: DateTime<Utc>,
    pub actor: Option<ActorId>,
    pub code: EventCode,
    pub level: LogLevel,
    pub context: String,
    pub changes: Vec<FieldChange>,
}

impl LogEntry {
    pub fn message(&self) -> &'static str {
        self.code.message()
    }

    pub fn change_for(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|change| change.field == field)
    }

    /// Same rule as [`NewLogEntry::validate`], for entries built elsewhere.
    pub fn validate(&self) -> Result<(), AuditError> {
        ensure_recorded_change(self.code, &self.subject_type, self.changes.is_empty())
    }
}

/// Row shape of `audit_log_entries`.
#[derive(Debug, Clone, FromRow)]
pub struct LogEntryRow {
    pub id: LogEntryId,
    pub subject_type: String,
    pub subject_id: Option<String>,
    pub logged_at: DateTime<Utc>,
    pub actor_id: Option<ActorId>,
    pub code: i32,
    pub level: i16,
    pub context: String,
}

impl LogEntryRow {
    pub fn into_entry(self, changes: Vec<FieldChange>) -> Result<LogEntry, AuditError> {
        let code = EventCode::from_code(self.code).ok_or_else(|| {
            AuditError::InvalidRecord(format!("log entry {} has unknown code {}", self.id, self.code))
        })?;
        let level = LogLevel::from_value(self.level).ok_or_else(|| {
            AuditError::InvalidRecord(format!(
                "log entry {} has unknown level {}",
                self.id, self.level
            ))
        })?;
        Ok(LogEntry {
            id: self.id,
            subject_type: self.subject_type,
            subject_id: self.subject_id,
            logged_at: self.logged_at,
            actor: self.actor_id,
            code,
            level,
            context: self.context,
            changes,
        })
    }
}

/// A field change that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl NewFieldChange {
    pub fn new(field: impl Into<String>, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            field: field.into(),
            old_value: old_value.map(truncate_value),
            new_value: new_value.map(truncate_value),
        }
    }
}

/// A log entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub subject_type: String,
    pub subject_id: Option<String>,
    pub actor: Option<ActorId>,
    pub code: EventCode,
    pub level: LogLevel,
    pub context: String,
    pub changes: Vec<NewFieldChange>,
}

impl NewLogEntry {
    pub fn new(code: EventCode, subject_type: impl Into<String>, subject_id: Option<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id,
            actor: None,
            code,
            level: LogLevel::default(),
            context: String::new(),
            changes: Vec::new(),
        }
    }

    /// Copies actor, level and context text from the write context.
    pub fn with_context(mut self, ctx: &AuditContext) -> Self {
        self.actor = ctx.actor;
        self.level = ctx.level;
        self.context = ctx.context.clone();
        self
    }

    pub fn with_changes(mut self, changes: &ChangeSet) -> Self {
        self.changes = changes
            .iter()
            .map(|(field, change)| {
                NewFieldChange::new(field, change.old.to_stored(), change.new.to_stored())
            })
            .collect();
        self
    }

    /// A modified entry without changes would record a no-op write.
    pub fn validate(&self) -> Result<(), AuditError> {
        ensure_recorded_change(self.code, &self.subject_type, self.changes.is_empty())
    }

    /// Assigns identifiers and the timestamp; field changes come back sorted by field.
    pub fn into_entry(self, id: LogEntryId, logged_at: DateTime<Utc>) -> LogEntry {
        let mut changes: Vec<FieldChange> = self
            .changes
            .into_iter()
            .map(|change| FieldChange {
                id: FieldChangeId::new(),
                log_entry_id: id,
                field: change.field,
                old_value: change.old_value,
                new_value: change.new_value,
            })
            .collect();
        changes.sort_by(|a, b| a.field.cmp(&b.field));

        LogEntry {
            id,
            subject_type: self.subject_type,
            subject_id: self.subject_id,
            logged_at,
            actor: self.actor,
            code: self.code,
            level: self.level,
            context: self.context,
            changes,
        }
    }
}

fn ensure_recorded_change(
    code: EventCode,
    subject_type: &str,
    no_changes: bool,
) -> Result<(), AuditError> {
    if code == EventCode::Modified && no_changes {
        return Err(AuditError::Validation(format!(
            "modified entry for {} has no field changes",
            subject_type
        )));
    }
    Ok(())
}

fn truncate_value(value: String) -> String {
    if value.chars().count() <= MAX_VALUE_CHARS {
        value
    } else {
        value.chars().take(MAX_VALUE_CHARS).collect()
    }
}
