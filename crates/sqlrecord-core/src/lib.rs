//! Core types for sqlrecord.
//!
//! This crate holds the pieces every other sqlrecord crate agrees on:
//!
//! - [`Value`] and [`Row`] for parameters and results
//! - [`Error`] and [`Result`] for everything that can fail
//! - [`DataSource`], the synchronous "execute SQL, return rows" collaborator
//! - [`Dialect`] and identifier helpers for rendering SQL text

pub mod error;
pub mod identifiers;
pub mod row;
pub mod source;
pub mod value;

pub use error::{
    ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result, StateError,
    StateErrorKind, TypeError,
};
pub use identifiers::{quote_ident, quote_ident_mysql, validate_column_ref};
pub use row::{ColumnInfo, FromValue, Row};
pub use source::{DataSource, Dialect, QueryResult, SharedSource};
pub use value::Value;
