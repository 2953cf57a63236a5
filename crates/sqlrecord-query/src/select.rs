//! SELECT assembly for one table.

use crate::clause::{Limit, Offset, OrderBy};
use crate::condition::Conditions;
use crate::join::Join;
use sqlrecord_core::{Dialect, Result, Value};

/// Transient state of one fluent query chain.
///
/// Owned by a single record and consumed (reset) by the terminal operation.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    columns: Option<String>,
    conditions: Conditions,
    joins: Vec<Join>,
    group_by: Vec<String>,
    having: Option<String>,
    order_by: Vec<OrderBy>,
    limit: Option<Limit>,
    offset: Option<Offset>,
}

impl QueryState {
    /// Create an empty query state (`SELECT *`, no conditions).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the select list with a raw column expression.
    pub fn select(&mut self, columns: impl Into<String>) -> &mut Self {
        self.columns = Some(columns.into());
        self
    }

    /// WHERE conditions of this query.
    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Mutable access to the WHERE conditions.
    pub fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }

    /// Add a JOIN clause.
    pub fn join(&mut self, join: Join) -> &mut Self {
        self.joins.push(join);
        self
    }

    /// Add GROUP BY columns.
    pub fn group_by<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Set a raw HAVING condition.
    pub fn having(&mut self, condition: impl Into<String>) -> &mut Self {
        self.having = Some(condition.into());
        self
    }

    /// Add an ORDER BY item.
    pub fn order_by(&mut self, order: OrderBy) -> &mut Self {
        self.order_by.push(order);
        self
    }

    /// Set the maximum number of rows.
    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.limit = Some(Limit(n));
        self
    }

    /// Set the number of rows to skip.
    pub fn offset(&mut self, n: u64) -> &mut Self {
        self.offset = Some(Offset(n));
        self
    }

    /// Current LIMIT, if any.
    pub fn current_limit(&self) -> Option<u64> {
        self.limit.map(|Limit(n)| n)
    }

    /// Build the SELECT for `table` and its parameters.
    pub fn build(&self, table: &str, dialect: Dialect) -> Result<(String, Vec<Value>)> {
        let mut sql = String::new();
        let mut params = Vec::new();

        sql.push_str("SELECT ");
        sql.push_str(self.columns.as_deref().unwrap_or("*"));

        sql.push_str(" FROM ");
        sql.push_str(&dialect.quote_identifier(table));

        for join in &self.joins {
            sql.push_str(&join.to_sql());
        }

        if let Some(where_sql) = self.conditions.build(dialect, &mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.group_by.is_empty() {
            let columns = self
                .group_by
                .iter()
                .map(|c| dialect.quote_column(c))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&columns.join(", "));
        }

        if let Some(having) = &self.having {
            sql.push_str(" HAVING ");
            sql.push_str(having);
        }

        if !self.order_by.is_empty() {
            let items = self
                .order_by
                .iter()
                .map(|o| o.to_sql(dialect))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(Limit(n)), Some(Offset(m))) => {
                sql.push_str(&format!(" LIMIT {} OFFSET {}", n, m));
            }
            (Some(Limit(n)), None) => sql.push_str(&format!(" LIMIT {}", n)),
            (None, Some(Offset(m))) => {
                if let Some(all) = dialect.unbounded_limit() {
                    sql.push_str(&format!(" LIMIT {}", all));
                }
                sql.push_str(&format!(" OFFSET {}", m));
            }
            (None, None) => {}
        }

        tracing::trace!(table = table, params = params.len(), sql = %sql, "assembled select");
        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Connector;
    use crate::join::JoinType;

    #[test]
    fn test_default_select_all() {
        let (sql, params) = QueryState::new().build("user", Dialect::Sqlite).unwrap();
        assert_eq!(sql, "SELECT * FROM \"user\"");
        assert!(params.is_empty());
    }

    #[test]
    fn test_full_query_assembly() {
        let mut q = QueryState::new();
        q.select("user.*, c.email")
            .join(Join::new(JoinType::Left, "contact AS c", "c.user_id = user.id"))
            .group_by(["user.id"])
            .having("COUNT(c.id) > 0")
            .order_by(OrderBy::desc("user.id"))
            .limit(10)
            .offset(5);
        q.conditions_mut().eq("user.name", "demo");

        let (sql, params) = q.build("user", Dialect::Sqlite).unwrap();
        assert_eq!(
            sql,
            "SELECT user.*, c.email FROM \"user\" LEFT JOIN contact AS c ON c.user_id = user.id \
             WHERE \"user\".\"name\" = ?1 GROUP BY \"user\".\"id\" HAVING COUNT(c.id) > 0 \
             ORDER BY \"user\".\"id\" DESC LIMIT 10 OFFSET 5"
        );
        assert_eq!(params, vec![Value::from("demo")]);
    }

    #[test]
    fn test_wrapped_conditions_in_where() {
        let mut q = QueryState::new();
        q.conditions_mut()
            .is_not_null("id")
            .wrap(Connector::And)
            .lt("id", 2)
            .wrap(Connector::Or);
        let (sql, _) = q.build("user", Dialect::Postgres).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"user\" WHERE (\"id\" IS NOT NULL) OR (\"id\" < $1)"
        );
    }

    #[test]
    fn test_offset_without_limit_per_dialect() {
        let mut q = QueryState::new();
        q.offset(2);
        assert_eq!(
            q.build("t", Dialect::Sqlite).unwrap().0,
            "SELECT * FROM \"t\" LIMIT -1 OFFSET 2"
        );
        assert_eq!(
            q.build("t", Dialect::Postgres).unwrap().0,
            "SELECT * FROM \"t\" OFFSET 2"
        );
    }

    #[test]
    fn test_reset_by_take() {
        let mut q = QueryState::new();
        q.limit(1).conditions_mut().eq("id", 1);
        let taken = std::mem::take(&mut q);
        assert_eq!(q.current_limit(), None);
        assert!(q.conditions().is_empty());
        assert_eq!(q.build("t", Dialect::Sqlite).unwrap().0, "SELECT * FROM \"t\"");
        assert_eq!(taken.current_limit(), Some(1));
        assert!(!taken.conditions().is_empty());
    }

    #[test]
    fn test_invalid_group_by_column() {
        let mut q = QueryState::new();
        q.group_by(["COUNT(*)"]);
        assert!(q.build("t", Dialect::Sqlite).is_err());
    }
}
