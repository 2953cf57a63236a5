//! Relationship metadata and lazy resolution.
//!
//! Relations are declared as static metadata on each [`Entity`](crate::Entity)
//! and resolved on first access through a freshly constructed record of the
//! target entity. Results are cached on the owning record until it is
//! hydrated again.

use crate::record::{Record, Shared};
use sqlrecord_core::{Error, Result, SharedSource};
use sqlrecord_query::OrderDirection;
use std::rc::{Rc, Weak};
use std::sync::Arc;

/// Constructor for records of a relation's target entity.
///
/// Normally `Record::new::<Target>`.
pub type RecordFactory = fn(SharedSource) -> Record;

/// The type of relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One-to-one: `User` has one `Contact`, keyed by `contact.user_id`.
    HasOne,
    /// One-to-many: `User` has many `Contact`s, keyed by `contact.user_id`.
    HasMany,
    /// Many-to-one: `Contact` belongs to one `User` through its own `user_id`.
    BelongsTo,
}

impl RelationKind {
    /// Does this relation resolve to a single record?
    pub const fn is_single(self) -> bool {
        matches!(self, RelationKind::HasOne | RelationKind::BelongsTo)
    }
}

/// A relation declared on an entity.
///
/// ```ignore
/// const RELATIONS: &'static [Relation] = &[
///     Relation::has_many("contacts", Record::new::<Contact>, "user_id", "id"),
///     Relation::has_many("contacts_with_backref", Record::new::<Contact>, "user_id", "id")
///         .with_backref("user"),
///     Relation::has_one("contact", Record::new::<Contact>, "user_id", "id")
///         .order("id", OrderDirection::Desc),
/// ];
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Name used with [`Record::related`].
    pub name: &'static str,
    pub kind: RelationKind,
    /// Builds a record of the target entity.
    pub target: RecordFactory,
    /// For `HasOne`/`HasMany` the column on the target; for `BelongsTo` the
    /// column on the owner.
    pub foreign_key: &'static str,
    /// For `HasOne`/`HasMany` the column on the owner; for `BelongsTo` the
    /// column on the target.
    pub local_key: &'static str,
    /// Slot on each resolved record that points back at the owner.
    pub back_reference: Option<&'static str>,
    /// Ordering applied to the target query.
    pub order: Option<(&'static str, OrderDirection)>,
}

impl Relation {
    const fn new(
        name: &'static str,
        kind: RelationKind,
        target: RecordFactory,
        foreign_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            target,
            foreign_key,
            local_key,
            back_reference: None,
            order: None,
        }
    }

    /// Declare a one-to-one relation: `target.foreign_key = self.local_key`.
    pub const fn has_one(
        name: &'static str,
        target: RecordFactory,
        foreign_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self::new(name, RelationKind::HasOne, target, foreign_key, local_key)
    }

    /// Declare a one-to-many relation: `target.foreign_key = self.local_key`.
    pub const fn has_many(
        name: &'static str,
        target: RecordFactory,
        foreign_key: &'static str,
        local_key: &'static str,
    ) -> Self {
        Self::new(name, RelationKind::HasMany, target, foreign_key, local_key)
    }

    /// Declare a many-to-one relation: `target.owner_key = self.foreign_key`.
    pub const fn belongs_to(
        name: &'static str,
        target: RecordFactory,
        foreign_key: &'static str,
        owner_key: &'static str,
    ) -> Self {
        Self::new(name, RelationKind::BelongsTo, target, foreign_key, owner_key)
    }

    /// Point each resolved record's `slot` relation back at the owner.
    pub const fn with_backref(mut self, slot: &'static str) -> Self {
        self.back_reference = Some(slot);
        self
    }

    /// Order the target query.
    pub const fn order(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order = Some((column, direction));
        self
    }

    /// `(owner column, target column)` pair joined by this relation.
    pub const fn key_columns(&self) -> (&'static str, &'static str) {
        match self.kind {
            RelationKind::HasOne | RelationKind::HasMany => (self.local_key, self.foreign_key),
            RelationKind::BelongsTo => (self.foreign_key, self.local_key),
        }
    }

    fn empty(&self) -> Related {
        if self.kind.is_single() {
            Related::One(None)
        } else {
            Related::Many(Vec::new())
        }
    }

    /// Run the target query for `owner`.
    #[tracing::instrument(level = "debug", skip_all, fields(relation = self.name, table = owner.table_name()))]
    fn resolve(&self, owner: &Record) -> Result<Related> {
        let (owner_column, target_column) = self.key_columns();
        let Some(key) = owner.get(owner_column).filter(|v| !v.is_null()) else {
            tracing::trace!(column = owner_column, "no key value, relation is empty");
            return Ok(self.empty());
        };

        let target = (self.target)(Arc::clone(owner.source()));
        target.eq(target_column, key);
        if let Some((column, direction)) = self.order {
            target.order_by(column, direction);
        }

        if self.kind.is_single() {
            if target.find()?.is_none() {
                return Ok(Related::One(None));
            }
            if let Some(slot) = self.back_reference {
                target.set_parent(slot, owner);
            }
            Ok(Related::One(Some(target)))
        } else {
            let children = target.find_all()?;
            if let Some(slot) = self.back_reference {
                for child in &children {
                    child.set_parent(slot, owner);
                }
            }
            tracing::debug!(count = children.len(), "resolved to-many relation");
            Ok(Related::Many(children))
        }
    }
}

/// Resolved value of a relation.
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Related {
    /// Number of related records.
    pub fn len(&self) -> usize {
        match self {
            Related::One(one) => usize::from(one.is_some()),
            Related::Many(many) => many.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cached relation state on a record.
///
/// Resolved records are held strongly. A back-reference holds its owner
/// weakly so owner and children never keep each other alive.
#[derive(Debug)]
pub(crate) enum RelationSlot {
    One(Option<Record>),
    Many(Vec<Record>),
    Parent(Weak<Shared>),
}

impl From<&Related> for RelationSlot {
    fn from(related: &Related) -> Self {
        match related {
            Related::One(one) => RelationSlot::One(one.clone()),
            Related::Many(many) => RelationSlot::Many(many.clone()),
        }
    }
}

impl Record {
    /// Resolve the relation `name`, from cache if already loaded.
    ///
    /// Fails with [`Error::InvalidArgument`] if the entity declares no such
    /// relation. Missing rows are not an error: the result is empty.
    pub fn related(&self, name: &str) -> Result<Related> {
        if let Some(hit) = self.cached_relation(name) {
            tracing::trace!(relation = name, table = self.table_name(), "relation cache hit");
            return Ok(hit);
        }

        let relation = self
            .relations()
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "'{}' has no relation named '{}'",
                    self.table_name(),
                    name
                ))
            })?;

        let related = relation.resolve(self)?;
        self.cache_relation(relation.name, RelationSlot::from(&related));
        Ok(related)
    }

    /// Resolve a single-record relation.
    pub fn related_one(&self, name: &str) -> Result<Option<Record>> {
        match self.related(name)? {
            Related::One(one) => Ok(one),
            Related::Many(_) => Err(Error::invalid_argument(format!(
                "relation '{}' resolves to many records",
                name
            ))),
        }
    }

    /// Resolve a to-many relation.
    pub fn related_many(&self, name: &str) -> Result<Vec<Record>> {
        match self.related(name)? {
            Related::Many(many) => Ok(many),
            Related::One(_) => Err(Error::invalid_argument(format!(
                "relation '{}' resolves to a single record",
                name
            ))),
        }
    }

    fn cached_relation(&self, name: &str) -> Option<Related> {
        let mut inner = self.inner_mut();
        let related = match inner.relations.get(name)? {
            RelationSlot::One(one) => Some(Related::One(one.clone())),
            RelationSlot::Many(many) => Some(Related::Many(many.clone())),
            RelationSlot::Parent(owner) => owner
                .upgrade()
                .map(|shared| Related::One(Some(Record::from_shared(shared)))),
        };
        if related.is_none() {
            // owner is gone, resolve again
            inner.relations.remove(name);
        }
        related
    }

    fn set_parent(&self, slot: &'static str, owner: &Record) {
        self.cache_relation(slot, RelationSlot::Parent(Rc::downgrade(owner.shared())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entity, RecordHooks};

    #[derive(Default)]
    struct Dummy;

    impl RecordHooks for Dummy {}

    impl Entity for Dummy {
        const TABLE_NAME: &'static str = "dummy";
    }

    #[test]
    fn test_key_columns_by_kind() {
        let has_many = Relation::has_many("contacts", Record::new::<Dummy>, "user_id", "id");
        assert_eq!(has_many.key_columns(), ("id", "user_id"));

        let belongs_to = Relation::belongs_to("user", Record::new::<Dummy>, "user_id", "id");
        assert_eq!(belongs_to.key_columns(), ("user_id", "id"));
    }

    #[test]
    fn test_builder_methods() {
        let relation = Relation::has_one("contact", Record::new::<Dummy>, "user_id", "id")
            .with_backref("user")
            .order("id", OrderDirection::Desc);
        assert_eq!(relation.kind, RelationKind::HasOne);
        assert_eq!(relation.back_reference, Some("user"));
        assert_eq!(relation.order, Some(("id", OrderDirection::Desc)));
    }

    #[test]
    fn test_empty_by_kind() {
        let one = Relation::has_one("a", Record::new::<Dummy>, "x", "id");
        let many = Relation::has_many("b", Record::new::<Dummy>, "x", "id");
        assert!(matches!(one.empty(), Related::One(None)));
        assert!(matches!(many.empty(), Related::Many(ref v) if v.is_empty()));
        assert!(many.empty().is_empty());
    }
}
