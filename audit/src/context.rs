//! Who is writing, threaded explicitly into every audited write.

use crate::models::log_entry::LogLevel;
use crate::types::ActorId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditContext {
    pub actor: Option<ActorId>,
    pub level: LogLevel,
    /// Free text stored on the entry, e.g. the request id.
    pub context: String,
}

impl AuditContext {
    /// No authenticated identity.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_actor(actor: ActorId) -> Self {
        Self {
            actor: Some(actor),
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.actor.is_none()
    }
}
