//! Subject introspection and the per-record snapshot side table.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use crate::models::field::{Field, FieldValue};
use crate::policy::AuditPolicy;

/// A record whose writes are audited.
pub trait Auditable: Send + Sync {
    /// Stable name of the record type, e.g. `shop.Order`.
    const SUBJECT_TYPE: &'static str;

    /// Persisted identity, or `None` before the first insert.
    fn subject_id(&self) -> Option<String>;

    fn fields(&self) -> Vec<Field>;
}

/// Field values captured when a record was loaded or last saved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot(BTreeMap<String, FieldValue>);

impl Snapshot {
    pub fn capture<T: Auditable>(policy: &AuditPolicy, record: &T) -> Self {
        Self(
            policy
                .audited_fields(record)
                .into_iter()
                .map(|field| (field.name.to_string(), field.value))
                .collect(),
        )
    }

    /// Every audited field mapped to null, for records not yet persisted.
    pub fn empty<T: Auditable>(policy: &AuditPolicy, record: &T) -> Self {
        Self(
            policy
                .audited_fields(record)
                .into_iter()
                .map(|field| (field.name.to_string(), FieldValue::Null))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

/// A record plus the state needed to audit its next write.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    record: T,
    previous: Option<Snapshot>,
    persisted: bool,
    skip_audit: bool,
}

impl<T: Auditable> Tracked<T> {
    /// A record that has never been stored.
    pub fn new(record: T, policy: &AuditPolicy) -> Self {
        let previous = (!policy.ignores_subject(T::SUBJECT_TYPE))
            .then(|| Snapshot::empty(policy, &record));
        Self {
            record,
            previous,
            persisted: false,
            skip_audit: false,
        }
    }

    /// A record just read from its store.
    pub fn loaded(record: T, policy: &AuditPolicy) -> Self {
        let previous = (!policy.ignores_subject(T::SUBJECT_TYPE))
            .then(|| Snapshot::capture(policy, &record));
        Self {
            record,
            previous,
            persisted: true,
            skip_audit: false,
        }
    }

    /// A persisted record built in memory without a load; its next save
    /// diffs against the stored row.
    pub fn detached(record: T) -> Self {
        Self {
            record,
            previous: None,
            persisted: true,
            skip_audit: false,
        }
    }

    /// Writes of this instance bypass auditing.
    pub fn skip_audit(mut self) -> Self {
        self.skip_audit = true;
        self
    }

    pub fn is_audit_skipped(&self) -> bool {
        self.skip_audit
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    pub fn record(&self) -> &T {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut T {
        &mut self.record
    }

    pub fn into_inner(self) -> T {
        self.record
    }

    pub(crate) fn mark_saved(&mut self, record: T, previous: Option<Snapshot>) {
        self.record = record;
        self.previous = previous;
        self.persisted = true;
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T> DerefMut for Tracked<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.record
    }
}
