//! sqlrecord - ActiveRecord-style data mapping for SQL databases.
//!
//! A [`Record`] is one row of one table held in memory. It carries its own
//! attributes, a dirty set deciding what INSERT/UPDATE emit, a fluent
//! condition builder, lazily resolved relations and per-entity lifecycle
//! hooks. SQL runs through any [`DataSource`]; `sqlrecord-sqlite` provides
//! one backed by SQLite.
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlrecord::prelude::*;
//! use sqlrecord_sqlite::SqliteConnection;
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct User;
//!
//! impl RecordHooks for User {}
//!
//! impl Entity for User {
//!     const TABLE_NAME: &'static str = "user";
//!     const RELATIONS: &'static [Relation] = &[
//!         Relation::has_many("contacts", Record::new::<Contact>, "user_id", "id"),
//!     ];
//! }
//!
//! let source: SharedSource = Arc::new(SqliteConnection::open_memory()?);
//!
//! // Insert
//! let user = Record::new::<User>(source.clone());
//! user.set("name", "demo").set("password", "secret");
//! user.insert()?;
//!
//! // Query
//! let users = Record::new::<User>(source.clone())
//!     .is_not_null("id")
//!     .in_list("name", ["demo", "demo1"])
//!     .wrap(Connector::And)
//!     .lt("id", 3)
//!     .wrap(Connector::Or)
//!     .find_all()?;
//!
//! // Relations
//! let contacts = user.related_many("contacts")?;
//!
//! // Update and delete
//! user.set("name", "renamed").update()?;
//! user.delete()?;
//! ```
//!
//! # Conditions
//!
//! Predicates join with AND unless [`Record::or`] precedes them.
//! [`Record::wrap`] closes the predicates added since the last wrap into a
//! parenthesized group, joined to the earlier groups by the given connector.
//! Values are always bound as parameters.

pub mod dirty;
pub mod entity;
pub mod hooks;
pub mod record;
pub mod relation;

pub use dirty::DirtyTracker;
pub use entity::Entity;
pub use hooks::RecordHooks;
pub use record::{Record, RecordState};
pub use relation::{RecordFactory, Related, Relation, RelationKind};

// Re-export the building blocks records are made of
pub use sqlrecord_core::{
    ColumnInfo, DataSource, Dialect, Error, FromValue, QueryResult, Result, Row, SharedSource,
    Value,
    error::{
        ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind, StateError,
        StateErrorKind, TypeError,
    },
};
pub use sqlrecord_query::{
    CompareOp, Conditions, Connector, DeleteBuilder, InsertBuilder, Join, JoinType, OrderBy,
    OrderDirection, Predicate, QueryState, UpdateBuilder,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Connector, DataSource, Entity, Error, JoinType, OrderDirection, Record, RecordHooks,
        RecordState, Related, Relation, Result, SharedSource, Value, typed_record,
    };
}
