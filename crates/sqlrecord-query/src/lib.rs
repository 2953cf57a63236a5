//! Condition builder and statement assembly for sqlrecord.
//!
//! `sqlrecord-query` turns a record's accumulated query state into SQL text
//! plus positional parameters:
//!
//! - [`Conditions`]: WHERE predicates with `wrap` grouping and `or` chaining
//! - [`QueryState`]: select list, joins, grouping, ordering, limit/offset
//! - [`InsertBuilder`], [`UpdateBuilder`], [`DeleteBuilder`]: DML from column/value pairs
//!
//! Nothing here executes SQL; statements run through a
//! [`DataSource`](sqlrecord_core::DataSource).

pub mod builder;
pub mod clause;
pub mod condition;
pub mod join;
pub mod select;

pub use builder::{DeleteBuilder, InsertBuilder, UpdateBuilder};
pub use clause::{Limit, Offset, OrderBy, OrderDirection};
pub use condition::{CompareOp, Conditions, Connector, Predicate};
pub use join::{Join, JoinType};
pub use select::QueryState;
