//! Which subjects and fields are audited.

use std::collections::HashSet;

use crate::models::field::{Field, FieldKind};
use crate::models::subject::Auditable;

/// Subject types never audited unless an include-list says otherwise.
pub const DEFAULT_EXCLUDED_SUBJECTS: &[&str] = &[
    "audit.LogEntry",
    "audit.FieldChange",
    "auth.Session",
    "auth.Permission",
    "auth.ContentType",
    "admin.LogEntry",
];

/// Field kinds excluded when no explicit list is configured.
pub const DEFAULT_EXCLUDED_FIELD_KINDS: &[FieldKind] = &[FieldKind::AutoId];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectFilter {
    /// Only the listed subject types are audited.
    Include(HashSet<String>),
    /// Every subject type except the listed ones is audited.
    Exclude(HashSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPolicy {
    subjects: SubjectFilter,
    excluded_field_kinds: HashSet<FieldKind>,
    excluded_field_names: HashSet<String>,
}

impl Default for AuditPolicy {
    fn default() -> Self {
        Self {
            subjects: SubjectFilter::Exclude(
                DEFAULT_EXCLUDED_SUBJECTS.iter().map(|s| s.to_string()).collect(),
            ),
            excluded_field_kinds: DEFAULT_EXCLUDED_FIELD_KINDS.iter().copied().collect(),
            excluded_field_names: HashSet::new(),
        }
    }
}

impl AuditPolicy {
    pub fn new(
        subjects: SubjectFilter,
        excluded_field_kinds: impl IntoIterator<Item = FieldKind>,
        excluded_field_names: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            subjects,
            excluded_field_kinds: excluded_field_kinds.into_iter().collect(),
            excluded_field_names: excluded_field_names.into_iter().collect(),
        }
    }

    pub fn subjects(&self) -> &SubjectFilter {
        &self.subjects
    }

    pub fn ignores_subject(&self, subject_type: &str) -> bool {
        match &self.subjects {
            SubjectFilter::Include(included) => !included.contains(subject_type),
            SubjectFilter::Exclude(excluded) => excluded.contains(subject_type),
        }
    }

    /// Field names are matched qualified as `<subject_type>.<field>`.
    pub fn ignores_field(&self, subject_type: &str, field: &Field) -> bool {
        if self.excluded_field_kinds.contains(&field.kind) {
            return true;
        }
        let qualified = format!("{}.{}", subject_type, field.name);
        self.excluded_field_names.contains(&qualified)
    }

    /// The subject's fields minus every excluded one.
    pub fn audited_fields<T: Auditable>(&self, record: &T) -> Vec<Field> {
        record
            .fields()
            .into_iter()
            .filter(|field| !self.ignores_field(T::SUBJECT_TYPE, field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::FieldValue;

    fn field(name: &'static str, kind: FieldKind) -> Field {
        Field::new(name, kind, FieldValue::Null)
    }

    #[test]
    fn default_policy_excludes_audit_entities_and_auto_ids() {
        let policy = AuditPolicy::default();
        assert!(policy.ignores_subject("audit.LogEntry"));
        assert!(policy.ignores_subject("audit.FieldChange"));
        assert!(policy.ignores_subject("auth.Session"));
        assert!(!policy.ignores_subject("shop.Order"));
        assert!(policy.ignores_field("shop.Order", &field("id", FieldKind::AutoId)));
        assert!(!policy.ignores_field("shop.Order", &field("status", FieldKind::Text)));
    }

    #[test]
    fn include_list_audits_only_listed_subjects() {
        let policy = AuditPolicy::new(
            SubjectFilter::Include(["shop.Order".to_string()].into_iter().collect()),
            [],
            [],
        );
        assert!(!policy.ignores_subject("shop.Order"));
        assert!(policy.ignores_subject("shop.Customer"));
    }

    #[test]
    fn field_names_match_only_when_qualified_by_subject() {
        let policy = AuditPolicy::new(
            SubjectFilter::Exclude(HashSet::new()),
            [],
            ["shop.Order.notes".to_string()],
        );
        let notes = field("notes", FieldKind::Text);
        assert!(policy.ignores_field("shop.Order", &notes));
        assert!(!policy.ignores_field("shop.Customer", &notes));
    }
}
