//! SQL identifier quoting and validation.
//!
//! Column references handed to the condition builder are plain names or
//! `table.column` pairs. They are checked against a strict pattern before
//! being quoted, so a value mistakenly passed as a column name is rejected
//! instead of reaching the SQL text.

use crate::Result;
use crate::error::Error;
use regex::Regex;
use std::sync::LazyLock;

static COLUMN_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .unwrap_or_else(|e| unreachable!("column reference pattern is valid: {e}"))
});

/// Quote a SQL identifier using ANSI double-quoting.
///
/// Embedded double-quotes are escaped by doubling them.
///
/// ```
/// use sqlrecord_core::quote_ident;
///
/// assert_eq!(quote_ident("user"), "\"user\"");
/// assert_eq!(quote_ident("user\"name"), "\"user\"\"name\"");
/// ```
#[inline]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL identifier using MySQL backtick quoting.
#[inline]
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Check that `name` is a bare column name or a `table.column` reference.
///
/// ```
/// use sqlrecord_core::validate_column_ref;
///
/// assert!(validate_column_ref("user_id").is_ok());
/// assert!(validate_column_ref("c.email").is_ok());
/// assert!(validate_column_ref("id; DROP TABLE user").is_err());
/// ```
pub fn validate_column_ref(name: &str) -> Result<()> {
    if COLUMN_REF.is_match(name) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "'{}' is not a valid column reference",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_simple() {
        assert_eq!(quote_ident("users"), "\"users\"");
    }

    #[test]
    fn test_quote_ident_embedded_double_quote() {
        assert_eq!(quote_ident("a\"b\"c"), "\"a\"\"b\"\"c\"");
    }

    #[test]
    fn test_quote_ident_mysql_embedded_backtick() {
        assert_eq!(quote_ident_mysql("user`name"), "`user``name`");
    }

    #[test]
    fn test_column_ref_accepts_qualified_names() {
        for name in ["id", "_hidden", "user.id", "c.user_id", "Col9"] {
            assert!(validate_column_ref(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_column_ref_rejects_expressions() {
        for name in ["", "9id", "a.b.c", "name = 1", "id\"", "COUNT(*)", "a."] {
            let err = validate_column_ref(name).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{name}");
        }
    }
}
