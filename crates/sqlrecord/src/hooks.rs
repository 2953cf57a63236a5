//! Lifecycle hooks.

use crate::record::Record;
use sqlrecord_core::Result;

/// Lifecycle hooks for records of one entity type.
///
/// All methods default to no-ops. Each receives the record the operation
/// runs on and may mutate it (attributes, custom data, pending conditions)
/// before the operation continues. Returning an error aborts the operation
/// and the error is returned to the caller unchanged.
///
/// # Example
///
/// ```ignore
/// use sqlrecord::{Entity, Record, RecordHooks, Result};
///
/// #[derive(Default)]
/// struct User;
///
/// impl RecordHooks for User {
///     fn before_insert(&self, record: &Record) -> Result<()> {
///         if record.get("password").is_none() {
///             record.set("password", "changeme");
///         }
///         Ok(())
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait RecordHooks {
    /// Called before the SELECT of `find` is assembled.
    ///
    /// Conditions added here become part of the query.
    fn before_find(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called after `find` hydrated the record.
    fn after_find(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called before the SELECT of `find_all` is assembled.
    fn before_find_all(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called with the hydrated results of `find_all`.
    ///
    /// Each result has already been through [`after_find`](Self::after_find).
    fn after_find_all(&self, record: &Record, results: &[Record]) -> Result<()> {
        Ok(())
    }

    /// Called before the INSERT is built from the pending changes.
    fn before_insert(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called after the INSERT, once the primary key is known.
    fn after_insert(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called before the UPDATE is built from the pending changes.
    fn before_update(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    fn after_update(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called before `save` picks insert or update.
    fn before_save(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    fn after_save(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called before the DELETE. Return an error to keep the row.
    fn before_delete(&self, record: &Record) -> Result<()> {
        Ok(())
    }

    /// Called after the row was deleted.
    fn after_delete(&self, record: &Record) -> Result<()> {
        Ok(())
    }
}
