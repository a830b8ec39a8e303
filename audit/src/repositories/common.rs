//! WHERE clause assembly shared by filtered queries.

use sqlx::{Postgres, QueryBuilder};

/// Prefixes the first condition with `WHERE` and every later one with `AND`.
pub struct Conditions<'q, 'args> {
    builder: &'q mut QueryBuilder<'args, Postgres>,
    any: bool,
}

impl<'q, 'args> Conditions<'q, 'args> {
    pub fn new(builder: &'q mut QueryBuilder<'args, Postgres>) -> Self {
        Self {
            builder,
            any: false,
        }
    }

    /// Opens the next condition; the caller writes its text and binds.
    pub fn push_condition(&mut self) -> &mut QueryBuilder<'args, Postgres> {
        self.builder.push(if self.any { " AND " } else { " WHERE " });
        self.any = true;
        &mut *self.builder
    }

    pub fn is_empty(&self) -> bool {
        !self.any
    }
}
