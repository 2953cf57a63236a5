//! SQLite connection implementing [`DataSource`].

// Casts match C types exactly at the FFI boundary
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::borrow_as_ptr)]

use crate::types;
use libsqlite3_sys as ffi;
use sqlrecord_core::{
    DataSource, Dialect, Error, QueryResult, Row, Value,
    error::{ConnectionError, ConnectionErrorKind, QueryError, QueryErrorKind},
    row::ColumnInfo,
};
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// `libsqlite3-sys` omits `sqlite3_close_v2` from its bundled bindings; the
// symbol is still present in the linked SQLite library.
unsafe extern "C" {
    fn sqlite3_close_v2(db: *mut ffi::sqlite3) -> c_int;
}

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    /// Open flags (read-only, read-write, create, etc.)
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    /// Open for reading only.
    pub read_only: bool,
    /// Open for reading and writing.
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
}

impl OpenFlags {
    /// Create flags for read-only access.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access (database must exist).
    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    /// Create flags for read-write access with creation if needed.
    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;

        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }

        // One handle, serialized by our own mutex
        flags | ffi::SQLITE_OPEN_FULLMUTEX
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    /// Create a new config for a file-based database.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Create a new config for an in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Set open flags.
    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set busy timeout.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }
}

struct SqliteInner {
    db: *mut ffi::sqlite3,
}

// SAFETY: the handle is opened with SQLITE_OPEN_FULLMUTEX and every access
// goes through the connection's Mutex, which makes the connection Sync.
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Finalizes the wrapped statement on drop.
struct Statement(*mut ffi::sqlite3_stmt);

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: the pointer came from sqlite3_prepare_v2 and is finalized once
        unsafe {
            ffi::sqlite3_finalize(self.0);
        }
    }
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self, Error> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                error_string(rc)
            } else {
                // SAFETY: db is valid even on failure and must still be closed
                unsafe {
                    let msg = errmsg(db);
                    ffi::sqlite3_close(db);
                    msg
                }
            };

            tracing::warn!(path = %config.path, code = rc, error = %msg, "sqlite open failed");
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database: {}", msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, config.busy_timeout_ms as c_int);
            }
        }

        tracing::debug!(path = %config.path, "opened sqlite database");
        Ok(Self {
            inner: Mutex::new(SqliteInner { db }),
            path: config.path.clone(),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, Error> {
        Self::open(&SqliteConfig::memory())
    }

    /// Open a file-based database.
    pub fn open_file(path: impl Into<String>) -> Result<Self, Error> {
        Self::open(&SqliteConfig::file(path))
    }

    /// Get the database path.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute one or more `;`-separated statements without parameters (DDL, fixtures).
    pub fn execute_raw(&self, sql: &str) -> Result<(), Error> {
        let inner = self.lock();
        let c_sql = CString::new(sql).map_err(|_| nul_in_sql(sql))?;

        let mut errmsg_ptr: *mut std::ffi::c_char = ptr::null_mut();

        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_exec(inner.db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg_ptr)
        };

        if rc != ffi::SQLITE_OK {
            let msg = if errmsg_ptr.is_null() {
                error_string(rc)
            } else {
                // SAFETY: errmsg_ptr was allocated by sqlite3_exec
                unsafe {
                    let msg = CStr::from_ptr(errmsg_ptr).to_string_lossy().into_owned();
                    ffi::sqlite3_free(errmsg_ptr.cast());
                    msg
                }
            };

            tracing::debug!(sql = %sql, code = rc, error = %msg, "sqlite exec failed");
            return Err(Error::Query(QueryError {
                kind: error_code_to_kind(rc),
                sql: Some(sql.to_string()),
                code: Some(rc),
                message: msg,
                source: None,
            }));
        }

        Ok(())
    }

    /// Get the last insert rowid.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Get the number of rows changed by the last statement.
    pub fn changes(&self) -> i32 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_changes(inner.db) }
    }

    /// Prepare, bind and step one statement to completion.
    fn run(&self, sql: &str, params: &[Value]) -> Result<QueryResult, Error> {
        let inner = self.lock();
        let stmt = prepare_stmt(inner.db, sql)?;

        for (i, param) in params.iter().enumerate() {
            // SAFETY: stmt is valid, index is 1-based
            let rc = unsafe { types::bind_value(stmt.0, (i + 1) as c_int, param) };
            if rc != ffi::SQLITE_OK {
                return Err(bind_error(inner.db, sql, i + 1));
            }
        }

        // SAFETY: stmt is valid
        let col_count = unsafe { ffi::sqlite3_column_count(stmt.0) };
        let mut col_names = Vec::with_capacity(col_count as usize);
        for i in 0..col_count {
            // SAFETY: stmt is valid, i < col_count
            let name = unsafe { types::column_name(stmt.0, i) }.unwrap_or_else(|| format!("col{}", i));
            col_names.push(name);
        }
        let columns = Arc::new(ColumnInfo::new(col_names));

        // SAFETY: db is valid
        let rowid_before = unsafe { ffi::sqlite3_last_insert_rowid(inner.db) };
        let mut rows = Vec::new();
        loop {
            // SAFETY: stmt is valid
            let rc = unsafe { ffi::sqlite3_step(stmt.0) };
            match rc {
                ffi::SQLITE_ROW => {
                    let mut values = Vec::with_capacity(col_count as usize);
                    for i in 0..col_count {
                        // SAFETY: stmt is valid, we just got SQLITE_ROW
                        values.push(unsafe { types::read_column(stmt.0, i) });
                    }
                    rows.push(Row::with_columns(Arc::clone(&columns), values));
                }
                ffi::SQLITE_DONE => break,
                _ => return Err(step_error(inner.db, sql)),
            }
        }
        drop(stmt);

        if col_count > 0 {
            return Ok(QueryResult::from_rows(rows));
        }

        // SAFETY: db is valid
        let (changes, rowid) =
            unsafe { (ffi::sqlite3_changes(inner.db), ffi::sqlite3_last_insert_rowid(inner.db)) };
        let mut result = QueryResult::affected(u64::try_from(changes).unwrap_or(0));
        // REPLACE of an existing key can leave the rowid unchanged
        if changes > 0 && (rowid != rowid_before || inserts_rows(sql)) {
            result = result.with_last_insert_id(rowid);
        }
        Ok(result)
    }
}

/// Does the statement lead with a row-inserting keyword?
fn inserts_rows(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    ["insert", "replace"]
        .iter()
        .any(|kw| keyword.eq_ignore_ascii_case(kw))
}

impl DataSource for SqliteConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult, Error> {
        tracing::trace!(sql = %sql, params = params.len(), "sqlite execute");
        self.run(sql, params)
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.lock();
        if !inner.db.is_null() {
            // SAFETY: db is valid and no statements outlive `run`
            unsafe {
                sqlite3_close_v2(inner.db);
            }
        }
    }
}

fn nul_in_sql(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        code: None,
        message: "SQL contains null byte".to_string(),
        source: None,
    })
}

fn prepare_stmt(db: *mut ffi::sqlite3, sql: &str) -> Result<Statement, Error> {
    let c_sql = CString::new(sql).map_err(|_| nul_in_sql(sql))?;
    let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe {
        ffi::sqlite3_prepare_v2(
            db,
            c_sql.as_ptr(),
            c_sql.as_bytes().len() as c_int,
            &mut stmt,
            ptr::null_mut(),
        )
    };

    if rc != ffi::SQLITE_OK {
        return Err(step_error(db, sql));
    }
    if stmt.is_null() {
        // Empty statement or only a comment
        return Err(Error::Query(QueryError {
            kind: QueryErrorKind::Syntax,
            sql: Some(sql.to_string()),
            code: None,
            message: "SQL contains no statement".to_string(),
            source: None,
        }));
    }

    Ok(Statement(stmt))
}

fn bind_error(db: *mut ffi::sqlite3, sql: &str, param_index: usize) -> Error {
    // SAFETY: db is valid
    let (msg, code) = unsafe { (errmsg(db), ffi::sqlite3_errcode(db)) };

    Error::Query(QueryError {
        kind: QueryErrorKind::Database,
        sql: Some(sql.to_string()),
        code: Some(code),
        message: format!("Failed to bind parameter {}: {}", param_index, msg),
        source: None,
    })
}

fn step_error(db: *mut ffi::sqlite3, sql: &str) -> Error {
    // SAFETY: db is valid
    let (msg, code) = unsafe { (errmsg(db), ffi::sqlite3_errcode(db)) };
    tracing::debug!(sql = %sql, code = code, error = %msg, "sqlite statement failed");

    Error::Query(QueryError {
        kind: error_code_to_kind(code),
        sql: Some(sql.to_string()),
        code: Some(code),
        message: msg,
        source: None,
    })
}

/// # Safety
/// `db` must be a valid connection handle.
unsafe fn errmsg(db: *mut ffi::sqlite3) -> String {
    // SAFETY: guaranteed by the caller; sqlite3_errmsg never returns null for a valid handle
    unsafe { CStr::from_ptr(ffi::sqlite3_errmsg(db)).to_string_lossy().into_owned() }
}

fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a static string
    unsafe { CStr::from_ptr(ffi::sqlite3_errstr(code)).to_string_lossy().into_owned() }
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    match code & 0xff {
        ffi::SQLITE_ERROR => QueryErrorKind::Syntax,
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_TOOBIG => QueryErrorKind::DataTruncation,
        ffi::SQLITE_INTERRUPT => QueryErrorKind::Cancelled,
        _ => QueryErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, score REAL)")
            .unwrap();
        conn
    }

    #[test]
    fn test_open_memory() {
        let conn = SqliteConnection::open_memory().unwrap();
        assert_eq!(conn.path(), ":memory:");
        assert_eq!(conn.dialect(), Dialect::Sqlite);
    }

    #[test]
    fn test_execute_raw() {
        let conn = setup();
        conn.execute_raw("INSERT INTO test (name) VALUES ('Alice')")
            .unwrap();
        assert_eq!(conn.changes(), 1);
        assert_eq!(conn.last_insert_rowid(), 1);
    }

    #[test]
    fn test_insert_reports_rowid() {
        let conn = setup();
        let first = conn
            .execute("INSERT INTO test (name) VALUES (?1)", &[Value::from("Alice")])
            .unwrap();
        let second = conn
            .execute("insert into test (name) values (?1)", &[Value::from("Bob")])
            .unwrap();
        assert_eq!(first.rows_affected, 1);
        assert_eq!(first.last_insert_id, Some(1));
        assert_eq!(second.last_insert_id, Some(2));
    }

    #[test]
    fn test_replace_and_cte_insert_report_rowid() {
        let conn = setup();
        let replaced = conn
            .execute("REPLACE INTO test (name) VALUES (?1)", &[Value::from("Alice")])
            .unwrap();
        assert_eq!(replaced.last_insert_id, Some(1));

        let same_key = conn
            .execute(
                "REPLACE INTO test (id, name) VALUES (?1, ?2)",
                &[Value::Int(1), Value::from("Alicia")],
            )
            .unwrap();
        assert_eq!(same_key.last_insert_id, Some(1));

        let cte = conn
            .execute(
                "WITH n(name) AS (SELECT ?1) INSERT INTO test (name) SELECT name FROM n",
                &[Value::from("Bob")],
            )
            .unwrap();
        assert_eq!(cte.rows_affected, 1);
        assert_eq!(cte.last_insert_id, Some(2));
    }

    #[test]
    fn test_update_reports_changes_without_rowid() {
        let conn = setup();
        conn.execute_raw("INSERT INTO test (name) VALUES ('a'), ('b')")
            .unwrap();
        let result = conn
            .execute("UPDATE test SET name = ?1", &[Value::from("c")])
            .unwrap();
        assert_eq!(result.rows_affected, 2);
        assert_eq!(result.last_insert_id, None);
    }

    #[test]
    fn test_query_rows_and_types() {
        let conn = setup();
        conn.execute(
            "INSERT INTO test (name, score) VALUES (?1, ?2)",
            &[Value::from("Alice"), Value::Double(1.5)],
        )
        .unwrap();
        conn.execute("INSERT INTO test (name) VALUES (?1)", &[Value::Null])
            .unwrap();

        let rows = conn.query("SELECT * FROM test ORDER BY id", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get_named::<String>("name").unwrap(), "Alice");
        assert_eq!(rows[0].get_by_name("score"), Some(&Value::Double(1.5)));
        assert_eq!(rows[1].get_named::<Option<String>>("name").unwrap(), None);
    }

    #[test]
    fn test_json_binds_as_text() {
        let conn = setup();
        let payload = serde_json::json!({"tags": ["a", "b"]});
        conn.execute("INSERT INTO test (name) VALUES (?1)", &[Value::Json(payload.clone())])
            .unwrap();
        let rows = conn.query("SELECT name FROM test", &[]).unwrap();
        let text = rows[0].get_named::<String>("name").unwrap();
        assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), payload);
    }

    #[test]
    fn test_quote_in_parameter_is_data() {
        let conn = setup();
        conn.execute("INSERT INTO test (name) VALUES (?1)", &[Value::from("a\"b'c")])
            .unwrap();
        let rows = conn
            .query("SELECT name FROM test WHERE name = ?1", &[Value::from("a\"b'c")])
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_incomplete_statement_error() {
        let conn = setup();
        let err = conn.execute("CREATE TABLE IF NOT EXISTS", &[]).unwrap_err();
        match err {
            Error::Query(q) => {
                assert_eq!(q.code, Some(ffi::SQLITE_ERROR));
                assert!(q.message.contains("incomplete input"), "{}", q.message);
                assert_eq!(q.sql.as_deref(), Some("CREATE TABLE IF NOT EXISTS"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_constraint_violation_kind() {
        let conn = setup();
        conn.execute_raw("INSERT INTO test (id, name) VALUES (1, 'a')")
            .unwrap();
        let err = conn
            .execute("INSERT INTO test (id, name) VALUES (1, 'b')", &[])
            .unwrap_err();
        assert!(matches!(err, Error::Query(ref q) if q.is_constraint_violation()));
    }

    #[test]
    fn test_empty_statement() {
        let conn = setup();
        assert!(conn.execute("  ", &[]).is_err());
    }

    #[test]
    fn test_invalid_path() {
        let config = SqliteConfig::file("/nonexistent/dir/db.sqlite").flags(OpenFlags::read_write());
        let err = SqliteConnection::open(&config).unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }
}
