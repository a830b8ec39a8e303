//! Field-by-field comparison of a subject against its previous state.

use std::collections::BTreeMap;

use crate::models::field::FieldValue;
use crate::models::subject::{Auditable, Snapshot};
use crate::policy::AuditPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// Changed fields keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet(BTreeMap<String, ValueChange>);

impl ChangeSet {
    pub fn insert(&mut self, field: impl Into<String>, old: FieldValue, new: FieldValue) {
        self.0.insert(field.into(), ValueChange { old, new });
    }

    pub fn get(&self, field: &str) -> Option<&ValueChange> {
        self.0.get(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValueChange)> {
        self.0.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Compares the record with a captured snapshot. Fields missing from the
/// snapshot are skipped.
pub fn against_snapshot<T: Auditable>(
    policy: &AuditPolicy,
    snapshot: &Snapshot,
    current: &T,
) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for field in policy.audited_fields(current) {
        let Some(old) = snapshot.get(field.name) else {
            continue;
        };
        if *old != field.value {
            changes.insert(field.name, old.clone(), field.value);
        }
    }
    changes
}

/// Compares the record with the row currently stored for it.
pub fn between<T: Auditable>(policy: &AuditPolicy, persisted: &T, current: &T) -> ChangeSet {
    let stored = Snapshot::capture(policy, persisted);
    let mut changes = ChangeSet::default();
    for field in policy.audited_fields(current) {
        let old = stored.get(field.name).cloned().unwrap_or(FieldValue::Null);
        if old != field.value {
            changes.insert(field.name, old, field.value);
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::{Field, FieldKind};
    use crate::policy::SubjectFilter;
    use std::collections::HashSet;

    #[derive(Clone)]
    struct Order {
        id: Option<i64>,
        status: String,
        total: i64,
        notes: Option<String>,
    }

    impl Auditable for Order {
        const SUBJECT_TYPE: &'static str = "shop.Order";

        fn subject_id(&self) -> Option<String> {
            self.id.map(|id| id.to_string())
        }

        fn fields(&self) -> Vec<Field> {
            vec![
                Field::new("id", FieldKind::AutoId, self.id),
                Field::new("status", FieldKind::Text, &self.status),
                Field::new("total", FieldKind::Integer, self.total),
                Field::new("notes", FieldKind::Text, self.notes.clone()),
            ]
        }
    }

    fn order() -> Order {
        Order {
            id: Some(1),
            status: "new".into(),
            total: 100,
            notes: None,
        }
    }

    #[test]
    fn unchanged_record_has_empty_change_set() {
        let policy = AuditPolicy::default();
        let original = order();
        let snapshot = Snapshot::capture(&policy, &original);
        assert!(against_snapshot(&policy, &snapshot, &original).is_empty());
    }

    #[test]
    fn only_changed_fields_are_reported() {
        let policy = AuditPolicy::default();
        let original = order();
        let snapshot = Snapshot::capture(&policy, &original);
        let mut edited = original.clone();
        edited.status = "shipped".into();

        let changes = against_snapshot(&policy, &snapshot, &edited);
        assert_eq!(changes.len(), 1);
        let status = changes.get("status").expect("status changed");
        assert_eq!(status.old, FieldValue::from("new"));
        assert_eq!(status.new, FieldValue::from("shipped"));
    }

    #[test]
    fn excluded_names_and_kinds_never_appear() {
        let policy = AuditPolicy::new(
            SubjectFilter::Exclude(HashSet::new()),
            [FieldKind::AutoId],
            ["shop.Order.notes".to_string()],
        );
        let original = order();
        let snapshot = Snapshot::capture(&AuditPolicy::default(), &original);
        let mut edited = original.clone();
        edited.id = Some(2);
        edited.notes = Some("fragile".into());

        assert!(against_snapshot(&policy, &snapshot, &edited).is_empty());
        assert!(between(&policy, &original, &edited).is_empty());
    }

    #[test]
    fn between_compares_against_persisted_row() {
        let policy = AuditPolicy::default();
        let stored = order();
        let mut edited = stored.clone();
        edited.total = 120;
        edited.notes = Some("gift".into());

        let changes = between(&policy, &stored, &edited);
        let fields: Vec<&str> = changes.fields().collect();
        assert_eq!(fields, vec!["notes", "total"]);
        assert_eq!(
            changes.get("notes").map(|c| c.old.clone()),
            Some(FieldValue::Null)
        );
    }

    #[test]
    fn fields_absent_from_snapshot_are_skipped() {
        let policy = AuditPolicy::default();
        let snapshot = Snapshot::default();
        let mut edited = order();
        edited.status = "cancelled".into();
        assert!(against_snapshot(&policy, &snapshot, &edited).is_empty());
    }

    struct Gauge {
        id: i64,
        reading: f64,
    }

    impl Auditable for Gauge {
        const SUBJECT_TYPE: &'static str = "plant.Gauge";

        fn subject_id(&self) -> Option<String> {
            Some(self.id.to_string())
        }

        fn fields(&self) -> Vec<Field> {
            vec![
                Field::new("id", FieldKind::AutoId, self.id),
                Field::new("reading", FieldKind::Decimal, self.reading),
            ]
        }
    }

    #[test]
    fn unchanged_nan_reading_is_not_a_change() {
        let policy = AuditPolicy::default();
        let mut gauge = Gauge {
            id: 7,
            reading: f64::NAN,
        };
        let snapshot = Snapshot::capture(&policy, &gauge);
        assert!(against_snapshot(&policy, &snapshot, &gauge).is_empty());

        let stored = Gauge {
            id: 7,
            reading: f64::NAN,
        };
        assert!(between(&policy, &stored, &gauge).is_empty());

        gauge.reading = 3.5;
        let changes = against_snapshot(&policy, &snapshot, &gauge);
        assert_eq!(changes.fields().collect::<Vec<_>>(), vec!["reading"]);
    }
}
