//! WHERE-clause accumulation.
//!
//! [`Conditions`] collects predicates in call order. Predicates land in the
//! *open group*; [`Conditions::wrap`] closes that group and records the
//! connector that joins it to everything before it. When the clause is
//! rendered, a still-open group is closed with `AND`, and groups fold left:
//!
//! ```text
//! a, b, wrap(AND), c, wrap(AND), d, e, wrap(OR)   =>   ((a AND b) AND (c)) OR (d AND e)
//! ```
//!
//! Within one group predicates are joined by `AND`, or by `OR` when
//! [`Conditions::or`] was called just before the predicate.
//!
//! Values never reach the SQL text. Each one becomes a placeholder for the
//! target dialect and is pushed onto the parameter list in order of appearance.

use sqlrecord_core::{Dialect, Error, Result, Value};

/// Boolean connector between predicates or groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    /// SQL keyword for this connector.
    pub const fn as_str(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Get the SQL representation of this operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A single predicate on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> value`
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column IS [NOT] NULL`
    Null { column: String, negated: bool },
    /// `column [NOT] IN (...)`
    InList {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `column [NOT] LIKE pattern`
    Like {
        column: String,
        pattern: Value,
        negated: bool,
    },
    /// `column BETWEEN low AND high`
    Between {
        column: String,
        low: Value,
        high: Value,
    },
}

impl Predicate {
    /// Render this predicate, pushing its values onto `params`.
    pub fn build(&self, dialect: Dialect, params: &mut Vec<Value>) -> Result<String> {
        let mut bind = |value: &Value| {
            params.push(value.clone());
            dialect.placeholder(params.len())
        };

        match self {
            Predicate::Compare { column, op, value } => Ok(format!(
                "{} {} {}",
                dialect.quote_column(column)?,
                op.as_str(),
                bind(value)
            )),
            Predicate::Null { column, negated } => Ok(format!(
                "{} IS {}NULL",
                dialect.quote_column(column)?,
                if *negated { "NOT " } else { "" }
            )),
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                let column = dialect.quote_column(column)?;
                if values.is_empty() {
                    // IN () matches nothing, NOT IN () matches everything
                    return Ok(if *negated { "1 = 1" } else { "1 = 0" }.to_string());
                }
                let placeholders: Vec<_> = values.iter().map(&mut bind).collect();
                Ok(format!(
                    "{} {}IN ({})",
                    column,
                    if *negated { "NOT " } else { "" },
                    placeholders.join(", ")
                ))
            }
            Predicate::Like {
                column,
                pattern,
                negated,
            } => Ok(format!(
                "{} {}LIKE {}",
                dialect.quote_column(column)?,
                if *negated { "NOT " } else { "" },
                bind(pattern)
            )),
            Predicate::Between { column, low, high } => {
                let column = dialect.quote_column(column)?;
                let low = bind(low);
                let high = bind(high);
                Ok(format!("{} BETWEEN {} AND {}", column, low, high))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Fragment {
    connector: Connector,
    predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
struct Group {
    /// Joins this group to the groups before it
    connector: Connector,
    fragments: Vec<Fragment>,
}

/// Accumulated WHERE conditions with wrap groups.
///
/// Input errors (such as a `between` range that is not a pair) do not break
/// the fluent chain. The first one is remembered and returned by
/// [`Conditions::build`], so the terminal operation fails instead.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    closed: Vec<Group>,
    open: Vec<Fragment>,
    next: Connector,
    error: Option<String>,
}

impl Conditions {
    /// Create an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no predicate has been added.
    pub fn is_empty(&self) -> bool {
        self.closed.is_empty() && self.open.is_empty()
    }

    /// Append a predicate to the open group.
    pub fn push(&mut self, predicate: Predicate) -> &mut Self {
        let connector = std::mem::take(&mut self.next);
        self.open.push(Fragment {
            connector,
            predicate,
        });
        self
    }

    /// Join the next predicate with `OR` instead of `AND`.
    pub fn or(&mut self) -> &mut Self {
        self.next = Connector::Or;
        self
    }

    /// Close the open group, joining it to the previous groups with `connector`.
    ///
    /// Wrapping an empty group is a no-op.
    pub fn wrap(&mut self, connector: Connector) -> &mut Self {
        if !self.open.is_empty() {
            let fragments = std::mem::take(&mut self.open);
            self.closed.push(Group {
                connector,
                fragments,
            });
        }
        self.next = Connector::And;
        self
    }

    /// Record an input error to be reported at build time. The first error wins.
    pub fn fail(&mut self, message: impl Into<String>) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
        self
    }

    pub fn eq(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.compare(column, CompareOp::Eq, value)
    }

    pub fn ne(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.compare(column, CompareOp::Ne, value)
    }

    pub fn lt(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.compare(column, CompareOp::Lt, value)
    }

    pub fn le(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.compare(column, CompareOp::Le, value)
    }

    pub fn gt(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.compare(column, CompareOp::Gt, value)
    }

    pub fn ge(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.compare(column, CompareOp::Ge, value)
    }

    fn compare(
        &mut self,
        column: impl Into<String>,
        op: CompareOp,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.push(Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        })
    }

    pub fn is_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.push(Predicate::Null {
            column: column.into(),
            negated: false,
        })
    }

    pub fn is_not_null(&mut self, column: impl Into<String>) -> &mut Self {
        self.push(Predicate::Null {
            column: column.into(),
            negated: true,
        })
    }

    /// `column IN (values)`. An empty set renders as an always-false predicate.
    pub fn in_list<I, V>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Predicate::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        })
    }

    /// `column NOT IN (values)`. An empty set renders as an always-true predicate.
    pub fn not_in_list<I, V>(&mut self, column: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Predicate::InList {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        })
    }

    pub fn like(&mut self, column: impl Into<String>, pattern: impl Into<Value>) -> &mut Self {
        self.push(Predicate::Like {
            column: column.into(),
            pattern: pattern.into(),
            negated: false,
        })
    }

    pub fn not_like(&mut self, column: impl Into<String>, pattern: impl Into<Value>) -> &mut Self {
        self.push(Predicate::Like {
            column: column.into(),
            pattern: pattern.into(),
            negated: true,
        })
    }

    /// `column BETWEEN low AND high` from a two-element range.
    ///
    /// Any other number of elements records an `InvalidArgument` error.
    pub fn between<I, V>(&mut self, column: impl Into<String>, range: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let column = column.into();
        let mut values: Vec<Value> = range.into_iter().map(Into::into).collect();
        if values.len() != 2 {
            return self.fail(format!(
                "between on '{}' expects exactly 2 values, got {}",
                column,
                values.len()
            ));
        }
        let high = values.pop().unwrap_or(Value::Null);
        let low = values.pop().unwrap_or(Value::Null);
        self.push(Predicate::Between { column, low, high })
    }

    /// Render the clause body (without `WHERE`), or `None` when empty.
    pub fn build(&self, dialect: Dialect, params: &mut Vec<Value>) -> Result<Option<String>> {
        if let Some(message) = &self.error {
            return Err(Error::invalid_argument(message.clone()));
        }

        let mut groups: Vec<(Connector, &[Fragment])> = self
            .closed
            .iter()
            .map(|g| (g.connector, g.fragments.as_slice()))
            .collect();
        if !self.open.is_empty() {
            groups.push((Connector::And, self.open.as_slice()));
        }

        if groups.len() == 1 {
            return Self::build_group(groups[0].1, dialect, params).map(Some);
        }

        let mut sql: Option<String> = None;
        for (i, (connector, fragments)) in groups.into_iter().enumerate() {
            let group = Self::build_group(fragments, dialect, params)?;
            sql = Some(match sql {
                None => format!("({})", group),
                Some(acc) if i == 1 => format!("{} {} ({})", acc, connector.as_str(), group),
                Some(acc) => format!("({}) {} ({})", acc, connector.as_str(), group),
            });
        }
        Ok(sql)
    }

    fn build_group(
        fragments: &[Fragment],
        dialect: Dialect,
        params: &mut Vec<Value>,
    ) -> Result<String> {
        let mut sql = String::new();
        for (i, fragment) in fragments.iter().enumerate() {
            if i > 0 {
                sql.push(' ');
                sql.push_str(fragment.connector.as_str());
                sql.push(' ');
            }
            sql.push_str(&fragment.predicate.build(dialect, params)?);
        }
        Ok(sql)
    }
}
