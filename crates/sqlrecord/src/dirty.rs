//! Dirty tracking for record attributes.
//!
//! Direct assignments are recorded as changes; values written while the
//! record is being hydrated from a result row represent persisted state and
//! are not.

use sqlrecord_core::Value;

/// Ordered set of attributes changed since the last load or save.
///
/// Changes keep the order of their first assignment so generated column
/// lists are stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirtyTracker {
    changes: Vec<(String, Value)>,
    hydrating: bool,
}

impl DirtyTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an assignment. Ignored while hydrating; returns whether it was recorded.
    #[tracing::instrument(level = "trace", skip(self, value))]
    pub fn mark(&mut self, column: &str, value: Value) -> bool {
        if self.hydrating {
            return false;
        }
        match self.changes.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.changes.push((column.to_string(), value)),
        }
        tracing::trace!(column = column, changed = self.changes.len(), "marked dirty");
        true
    }

    /// Forget a pending change.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let index = self.changes.iter().position(|(name, _)| name == column)?;
        Some(self.changes.remove(index).1)
    }

    /// Drop every pending change.
    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Pending value for `column`, if changed.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.changes
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Has `column` been changed?
    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// All pending changes in assignment order.
    pub fn changes(&self) -> &[(String, Value)] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Enter hydration mode: assignments stop being tracked.
    pub fn begin_hydration(&mut self) {
        self.hydrating = true;
    }

    /// Leave hydration mode.
    pub fn end_hydration(&mut self) {
        self.hydrating = false;
    }

    pub fn is_hydrating(&self) -> bool {
        self.hydrating
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_keeps_first_assignment_order() {
        let mut dirty = DirtyTracker::new();
        dirty.mark("name", Value::from("a"));
        dirty.mark("password", Value::from("p"));
        dirty.mark("name", Value::from("b"));

        assert_eq!(
            dirty.changes(),
            &[
                ("name".to_string(), Value::from("b")),
                ("password".to_string(), Value::from("p")),
            ]
        );
    }

    #[test]
    fn test_hydration_is_not_tracked() {
        let mut dirty = DirtyTracker::new();
        dirty.begin_hydration();
        assert!(!dirty.mark("id", Value::Int(1)));
        dirty.end_hydration();
        assert!(dirty.is_empty());
        assert!(dirty.mark("id", Value::Int(2)));
        assert_eq!(dirty.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut dirty = DirtyTracker::new();
        dirty.mark("name", Value::from("x"));
        dirty.mark("email", Value::from("y"));
        assert_eq!(dirty.remove("name"), Some(Value::from("x")));
        assert_eq!(dirty.remove("name"), None);
        assert!(!dirty.contains("name"));
        assert_eq!(dirty.len(), 1);

        dirty.clear();
        assert!(dirty.is_empty());
    }
}
