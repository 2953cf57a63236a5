//! INSERT, UPDATE and DELETE statement builders.
//!
//! Column lists come from a record's dirty set, so every builder takes
//! `(column, value)` pairs and quotes the column names as identifiers.

use crate::condition::Conditions;
use sqlrecord_core::{Dialect, Error, Result, Value};

/// INSERT statement builder.
#[derive(Debug, Clone, Default)]
pub struct InsertBuilder {
    table: String,
    values: Vec<(String, Value)>,
}

impl InsertBuilder {
    /// Create a new INSERT builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    /// Add one column value.
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((column.into(), value.into()));
        self
    }

    /// Add several column values.
    pub fn values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build the INSERT SQL and parameters.
    pub fn build(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        if self.values.is_empty() {
            return Err(Error::invalid_argument(format!(
                "INSERT into '{}' without columns",
                self.table
            )));
        }

        let mut params = Vec::with_capacity(self.values.len());
        let mut columns = Vec::with_capacity(self.values.len());
        let mut placeholders = Vec::with_capacity(self.values.len());
        for (column, value) in &self.values {
            columns.push(dialect.quote_identifier(column));
            params.push(value.clone());
            placeholders.push(dialect.placeholder(params.len()));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            dialect.quote_identifier(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok((sql, params))
    }
}

/// UPDATE statement builder.
#[derive(Debug, Clone, Default)]
pub struct UpdateBuilder {
    table: String,
    set: Vec<(String, Value)>,
    conditions: Conditions,
}

impl UpdateBuilder {
    /// Create a new UPDATE builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Set a column to a value.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((column.into(), value.into()));
        self
    }

    /// Set several columns.
    pub fn set_all<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.set
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Restrict the update to rows where `column = value`.
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.eq(column, value);
        self
    }

    /// Build the UPDATE SQL and parameters.
    pub fn build(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        if self.set.is_empty() {
            return Err(Error::invalid_argument(format!(
                "UPDATE of '{}' without columns",
                self.table
            )));
        }

        let mut params = Vec::new();
        let mut set_clauses = Vec::with_capacity(self.set.len());
        for (column, value) in &self.set {
            params.push(value.clone());
            set_clauses.push(format!(
                "{} = {}",
                dialect.quote_identifier(column),
                dialect.placeholder(params.len())
            ));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            dialect.quote_identifier(&self.table),
            set_clauses.join(", ")
        );
        if let Some(where_sql) = self.conditions.build(dialect, &mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok((sql, params))
    }
}

/// DELETE statement builder.
#[derive(Debug, Clone, Default)]
pub struct DeleteBuilder {
    table: String,
    conditions: Conditions,
}

impl DeleteBuilder {
    /// Create a new DELETE builder for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Conditions::new(),
        }
    }

    /// Restrict the delete to rows where `column = value`.
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.eq(column, value);
        self
    }

    /// Build the DELETE SQL and parameters.
    pub fn build(&self, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", dialect.quote_identifier(&self.table));
        if let Some(where_sql) = self.conditions.build(dialect, &mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sql() {
        let (sql, params) = InsertBuilder::new("user")
            .values([("name", "demo"), ("password", "pass")])
            .build(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"user\" (\"name\", \"password\") VALUES (?1, ?2)"
        );
        assert_eq!(params, vec![Value::from("demo"), Value::from("pass")]);
    }

    #[test]
    fn test_insert_without_columns_fails() {
        assert!(InsertBuilder::new("user").build(Dialect::Sqlite).is_err());
    }

    #[test]
    fn test_update_sql() {
        let (sql, params) = UpdateBuilder::new("user")
            .set("name", "bob")
            .set("password", Value::Null)
            .filter_eq("id", 3)
            .build(Dialect::Postgres)
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"user\" SET \"name\" = $1, \"password\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(params, vec![Value::from("bob"), Value::Null, Value::Int(3)]);
    }

    #[test]
    fn test_update_without_columns_fails() {
        let err = UpdateBuilder::new("user")
            .filter_eq("id", 1)
            .build(Dialect::Sqlite)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_delete_sql() {
        let (sql, params) = DeleteBuilder::new("contact")
            .filter_eq("id", 9)
            .build(Dialect::Mysql)
            .unwrap();
        assert_eq!(sql, "DELETE FROM `contact` WHERE `id` = ?");
        assert_eq!(params, vec![Value::Int(9)]);
    }
}
