//! SQLite data source for sqlrecord.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! Wraps a single libsqlite3 handle (via `libsqlite3-sys`, SQLite compiled
//! in) and implements [`DataSource`](sqlrecord_core::DataSource) so records
//! can run against it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlrecord_sqlite::SqliteConnection;
//! use sqlrecord_core::{DataSource, Value};
//!
//! let conn = SqliteConnection::open_memory()?;
//! conn.execute_raw("CREATE TABLE user (id INTEGER PRIMARY KEY, name TEXT)")?;
//!
//! let result = conn.execute("INSERT INTO user (name) VALUES (?1)", &[Value::from("Alice")])?;
//! assert_eq!(result.last_insert_id, Some(1));
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite Type |
//! |-------|-------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int` | INTEGER |
//! | `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `Json` | TEXT |
//! | `Null` | NULL |
//!
//! Reads map INTEGER back to `Int`, so booleans come back as `Int(0 | 1)`.
//!
//! # Thread Safety
//!
//! `SqliteConnection` is both `Send` and `Sync`; the handle is guarded by an
//! internal mutex, so one connection can be shared behind an `Arc`.

pub mod connection;
pub mod types;

pub use connection::{OpenFlags, SqliteConfig, SqliteConnection};

/// Version string of the linked SQLite library.
pub fn sqlite_version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a pointer to a static string
    unsafe { std::ffi::CStr::from_ptr(libsqlite3_sys::sqlite3_libversion()) }
        .to_str()
        .unwrap_or("unknown")
}

/// Version number of the linked SQLite library (e.g. 3045001).
pub fn sqlite_version_number() -> i32 {
    // SAFETY: no preconditions
    unsafe { libsqlite3_sys::sqlite3_libversion_number() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_version() {
        let version = sqlite_version();
        assert!(
            version.starts_with('3'),
            "Expected SQLite 3.x, got {}",
            version
        );
        assert!(sqlite_version_number() >= 3_000_000);
    }
}
