//! JOIN clause types.

use serde::{Deserialize, Serialize};

/// A JOIN clause.
///
/// `table` and `on` are raw SQL fragments (`"contact AS c"`,
/// `"c.user_id = user.id"`), written by the application, never by users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Type of join
    pub join_type: JoinType,
    /// Table expression, optionally with an alias
    pub table: String,
    /// ON condition
    pub on: String,
}

/// Types of SQL joins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    #[default]
    Left,
    Right,
    Full,
    Cross,
}

impl JoinType {
    /// Get the SQL keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

impl Join {
    /// Create a join of the given type.
    pub fn new(join_type: JoinType, table: impl Into<String>, on: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            on: on.into(),
        }
    }

    /// Create an INNER JOIN.
    pub fn inner(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new(JoinType::Inner, table, on)
    }

    /// Create a LEFT JOIN.
    pub fn left(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new(JoinType::Left, table, on)
    }

    /// Create a CROSS JOIN (no ON condition).
    pub fn cross(table: impl Into<String>) -> Self {
        Self::new(JoinType::Cross, table, String::new())
    }

    /// Generate the SQL for this join, including the leading space.
    pub fn to_sql(&self) -> String {
        if self.join_type == JoinType::Cross || self.on.is_empty() {
            format!(" {} {}", self.join_type.as_str(), self.table)
        } else {
            format!(" {} {} ON {}", self.join_type.as_str(), self.table, self.on)
        }
    }
}
