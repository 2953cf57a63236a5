//! The data-source collaborator.
//!
//! Records never talk to a driver directly. Every statement goes through a
//! [`DataSource`], which executes one SQL text with positional parameters and
//! reports rows, the affected-row count and the last inserted id.

use crate::Result;
use crate::identifiers::{quote_ident, quote_ident_mysql, validate_column_ref};
use crate::row::Row;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// SQL dialect, controlling placeholders and identifier quoting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    /// PostgreSQL dialect (uses $1, $2 placeholders)
    #[default]
    Postgres,
    /// SQLite dialect (uses ?1, ?2 placeholders)
    Sqlite,
    /// MySQL dialect (uses ? placeholders)
    Mysql,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
            Dialect::Mysql => "?".to_string(),
        }
    }

    /// Quote an identifier for this dialect.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => quote_ident(name),
            Dialect::Mysql => quote_ident_mysql(name),
        }
    }

    /// Validate and quote a column reference, quoting each side of `table.column`.
    pub fn quote_column(self, name: &str) -> Result<String> {
        validate_column_ref(name)?;
        Ok(name
            .split('.')
            .map(|part| self.quote_identifier(part))
            .collect::<Vec<_>>()
            .join("."))
    }

    /// Keyword that stands in for "no limit" when only an offset is given.
    ///
    /// SQLite and MySQL reject `OFFSET` without a preceding `LIMIT`.
    pub const fn unbounded_limit(self) -> Option<&'static str> {
        match self {
            Dialect::Postgres => None,
            Dialect::Sqlite => Some("-1"),
            Dialect::Mysql => Some("18446744073709551615"),
        }
    }
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Rows produced by a SELECT (empty for DML/DDL)
    pub rows: Vec<Row>,
    /// Rows changed by INSERT/UPDATE/DELETE
    pub rows_affected: u64,
    /// Identifier generated by the last INSERT, if the source reports one
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    /// Result carrying only rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    /// Result of a statement that changed `rows_affected` rows.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// Attach a generated identifier.
    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A synchronous SQL executor.
///
/// Implementations own connection handling; errors are returned as
/// [`Error::Query`](crate::Error::Query) with the driver's code and message intact.
pub trait DataSource: Send + Sync {
    /// Execute one statement with positional parameters.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Dialect used to render placeholders and identifiers.
    fn dialect(&self) -> Dialect {
        Dialect::default()
    }

    /// Execute a statement and return only its rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.execute(sql, params).map(|result| result.rows)
    }

    /// Execute a statement and return its single row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let mut rows = self.query(sql, params)?;
        if rows.len() > 1 {
            tracing::warn!(
                rows = rows.len(),
                sql = %sql,
                "query_one received more than one row, using the first"
            );
        }
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

/// Shared, externally-owned handle to a data source.
pub type SharedSource = Arc<dyn DataSource>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_placeholders_per_dialect() {
        assert_eq!(Dialect::Postgres.placeholder(2), "$2");
        assert_eq!(Dialect::Sqlite.placeholder(2), "?2");
        assert_eq!(Dialect::Mysql.placeholder(2), "?");
    }

    #[test]
    fn test_quote_column_handles_qualified_names() {
        assert_eq!(Dialect::Sqlite.quote_column("id").unwrap(), "\"id\"");
        assert_eq!(
            Dialect::Postgres.quote_column("c.user_id").unwrap(),
            "\"c\".\"user_id\""
        );
        assert_eq!(Dialect::Mysql.quote_column("user.id").unwrap(), "`user`.`id`");
        assert!(Dialect::Sqlite.quote_column("id = 1").is_err());
    }

    struct Canned {
        rows: Mutex<Vec<Row>>,
    }

    impl DataSource for Canned {
        fn execute(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
            let rows = std::mem::take(&mut *self.rows.lock().unwrap());
            Ok(QueryResult::from_rows(rows))
        }
    }

    #[test]
    fn test_query_one_takes_first_row() {
        let source = Canned {
            rows: Mutex::new(vec![
                Row::new(vec!["id".into()], vec![Value::Int(1)]),
                Row::new(vec!["id".into()], vec![Value::Int(2)]),
            ]),
        };
        let row = source.query_one("SELECT id FROM t", &[]).unwrap().unwrap();
        assert_eq!(row.get_by_name("id"), Some(&Value::Int(1)));
        assert!(source.query_one("SELECT id FROM t", &[]).unwrap().is_none());
    }

    #[test]
    fn test_shared_source_uses_default_dialect() {
        let shared: SharedSource = Arc::new(Canned {
            rows: Mutex::new(Vec::new()),
        });
        assert_eq!(shared.dialect(), Dialect::Postgres);
        assert_eq!(QueryResult::affected(3).with_last_insert_id(9).last_insert_id, Some(9));
    }
}
