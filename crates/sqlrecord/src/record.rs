//! The record: attribute storage, fluent query state and persistence.

use crate::dirty::DirtyTracker;
use crate::entity::Entity;
use crate::hooks::RecordHooks;
use crate::relation::{Relation, RelationSlot};
use sqlrecord_core::error::{StateError, StateErrorKind};
use sqlrecord_core::{Dialect, Error, FromValue, QueryResult, Result, Row, SharedSource, Value};
use sqlrecord_query::{
    Conditions, Connector, DeleteBuilder, InsertBuilder, Join, JoinType, OrderBy, OrderDirection,
    QueryState, UpdateBuilder,
};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No primary key value yet.
    New,
    /// Primary key value known.
    Persisted,
    /// Deleted; every further persistence operation fails.
    Deleted,
}

/// Per-entity metadata shared by all records of that entity.
#[derive(Clone)]
struct Model {
    table: &'static str,
    primary_key: &'static str,
    columns: &'static [&'static str],
    relations: &'static [Relation],
    hooks: Rc<dyn RecordHooks>,
}

impl Model {
    fn of<E: Entity>() -> Self {
        Self {
            table: E::TABLE_NAME,
            primary_key: E::PRIMARY_KEY,
            columns: E::COLUMNS,
            relations: E::RELATIONS,
            hooks: Rc::new(E::default()),
        }
    }

    fn is_column(&self, name: &str) -> bool {
        self.columns.is_empty() || name == self.primary_key || self.columns.contains(&name)
    }
}

#[derive(Default)]
pub(crate) struct RecordInner {
    data: BTreeMap<String, Value>,
    custom: BTreeMap<String, Value>,
    dirty: DirtyTracker,
    pub(crate) relations: HashMap<&'static str, RelationSlot>,
    query: QueryState,
    deleted: bool,
}

impl RecordInner {
    fn assign(&mut self, name: String, value: Value) {
        self.dirty.mark(&name, value.clone());
        self.data.insert(name, value);
    }
}

pub(crate) struct Shared {
    model: Model,
    source: SharedSource,
    state: RefCell<RecordInner>,
}

/// One row of one table, held in memory.
///
/// `Record` is a handle: clones refer to the same instance, and
/// [`Record::ptr_eq`] tells whether two handles do. Every method takes
/// `&self`, so lifecycle hooks can mutate the record they receive. Records
/// are single-threaded (`!Send`); the data source is shared and never owned.
///
/// ```ignore
/// let user = Record::new::<User>(source);
/// user.set("name", "demo").set("password", "secret");
/// user.insert()?;
///
/// let found = Record::new::<User>(user.source().clone());
/// found.eq("name", "demo").find()?;
/// ```
#[derive(Clone)]
pub struct Record {
    shared: Rc<Shared>,
}

impl Record {
    /// Create an empty record of entity `E` bound to `source`.
    pub fn new<E: Entity>(source: SharedSource) -> Record {
        Self::with_model(Model::of::<E>(), source)
    }

    fn with_model(model: Model, source: SharedSource) -> Record {
        Record {
            shared: Rc::new(Shared {
                model,
                source,
                state: RefCell::new(RecordInner::default()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<Shared>) -> Record {
        Record { shared }
    }

    pub(crate) fn shared(&self) -> &Rc<Shared> {
        &self.shared
    }

    fn inner(&self) -> Ref<'_, RecordInner> {
        self.shared.state.borrow()
    }

    pub(crate) fn inner_mut(&self) -> RefMut<'_, RecordInner> {
        self.shared.state.borrow_mut()
    }

    pub(crate) fn relations(&self) -> &'static [Relation] {
        self.shared.model.relations
    }

    pub(crate) fn cache_relation(&self, name: &'static str, slot: RelationSlot) {
        self.inner_mut().relations.insert(name, slot);
    }

    fn hooks(&self) -> &dyn RecordHooks {
        self.shared.model.hooks.as_ref()
    }

    /// Do both handles refer to the same record?
    pub fn ptr_eq(a: &Record, b: &Record) -> bool {
        Rc::ptr_eq(&a.shared, &b.shared)
    }

    pub fn table_name(&self) -> &'static str {
        self.shared.model.table
    }

    pub fn primary_key_name(&self) -> &'static str {
        self.shared.model.primary_key
    }

    /// The data source this record executes against.
    pub fn source(&self) -> &SharedSource {
        &self.shared.source
    }

    fn dialect(&self) -> Dialect {
        self.shared.source.dialect()
    }

    // ==================== Attributes ====================

    /// Read an attribute: column data first, then custom data.
    pub fn get(&self, name: &str) -> Option<Value> {
        let inner = self.inner();
        inner
            .data
            .get(name)
            .or_else(|| inner.custom.get(name))
            .cloned()
    }

    /// Read an attribute as `T`. An absent attribute reads as NULL.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name).unwrap_or(Value::Null);
        T::from_value(&value).map_err(|e| e.with_column(name))
    }

    /// Is the attribute present (column or custom)?
    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner();
        inner.data.contains_key(name) || inner.custom.contains_key(name)
    }

    /// Assign an attribute and mark it dirty.
    ///
    /// If the entity declares its columns and `name` is not one of them, the
    /// value is stored as custom data instead.
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> &Self {
        let name = name.into();
        let value = value.into();
        let mut inner = self.inner_mut();
        if self.shared.model.is_column(&name) {
            inner.assign(name, value);
        } else {
            tracing::trace!(table = self.table_name(), attribute = %name, "not a column, kept as custom data");
            inner.custom.insert(name, value);
        }
        self
    }

    /// Remove an attribute entirely: it is neither present nor dirty afterwards.
    pub fn unset(&self, name: &str) -> &Self {
        let mut inner = self.inner_mut();
        inner.data.remove(name);
        inner.custom.remove(name);
        inner.dirty.remove(name);
        self
    }

    /// Assign several attributes as one batch.
    pub fn dirty<I, K, V>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.set(name, value);
        }
        self
    }

    /// Pending changes in assignment order.
    pub fn get_dirty(&self) -> Vec<(String, Value)> {
        self.inner().dirty.changes().to_vec()
    }

    pub fn is_dirty(&self) -> bool {
        !self.inner().dirty.is_empty()
    }

    /// Forget pending changes without touching the attribute values.
    pub fn reset_dirty(&self) -> &Self {
        self.inner_mut().dirty.clear();
        self
    }

    /// Attach a value that is never persisted.
    pub fn set_custom_data(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner_mut().custom.insert(key.into(), value.into());
        self
    }

    pub fn custom_data(&self, key: &str) -> Option<Value> {
        self.inner().custom.get(key).cloned()
    }

    /// Primary key value, if set and not NULL.
    pub fn id(&self) -> Option<Value> {
        self.inner()
            .data
            .get(self.primary_key_name())
            .filter(|v| !v.is_null())
            .cloned()
    }

    pub fn state(&self) -> RecordState {
        if self.inner().deleted {
            RecordState::Deleted
        } else if self.id().is_some() {
            RecordState::Persisted
        } else {
            RecordState::New
        }
    }

    /// Attributes and custom data as a JSON object; columns win on name clashes.
    pub fn to_json(&self) -> serde_json::Value {
        let inner = self.inner();
        let map = inner
            .custom
            .iter()
            .chain(inner.data.iter())
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    // ==================== Query building ====================

    fn with_query(&self, f: impl FnOnce(&mut QueryState)) -> &Self {
        f(&mut self.inner_mut().query);
        self
    }

    fn with_conditions(&self, f: impl FnOnce(&mut Conditions)) -> &Self {
        self.with_query(|q| f(q.conditions_mut()))
    }

    pub fn eq(&self, column: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.eq(column, value);
        })
    }

    pub fn ne(&self, column: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.ne(column, value);
        })
    }

    pub fn lt(&self, column: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.lt(column, value);
        })
    }

    pub fn le(&self, column: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.le(column, value);
        })
    }

    pub fn gt(&self, column: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.gt(column, value);
        })
    }

    pub fn ge(&self, column: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.ge(column, value);
        })
    }

    pub fn is_null(&self, column: impl Into<String>) -> &Self {
        self.with_conditions(|c| {
            c.is_null(column);
        })
    }

    pub fn is_not_null(&self, column: impl Into<String>) -> &Self {
        self.with_conditions(|c| {
            c.is_not_null(column);
        })
    }

    /// `column IN (...)`; an empty set matches nothing.
    pub fn in_list<I, V>(&self, column: impl Into<String>, values: I) -> &Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with_conditions(|c| {
            c.in_list(column, values);
        })
    }

    /// `column NOT IN (...)`; an empty set matches everything.
    pub fn not_in_list<I, V>(&self, column: impl Into<String>, values: I) -> &Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with_conditions(|c| {
            c.not_in_list(column, values);
        })
    }

    pub fn like(&self, column: impl Into<String>, pattern: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.like(column, pattern);
        })
    }

    pub fn not_like(&self, column: impl Into<String>, pattern: impl Into<Value>) -> &Self {
        self.with_conditions(|c| {
            c.not_like(column, pattern);
        })
    }

    /// `column BETWEEN low AND high`. Any other range length fails when the
    /// query runs.
    pub fn between<I, V>(&self, column: impl Into<String>, range: I) -> &Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.with_conditions(|c| {
            c.between(column, range);
        })
    }

    /// Join the next predicate with OR instead of AND.
    pub fn or(&self) -> &Self {
        self.with_conditions(|c| {
            c.or();
        })
    }

    /// Close the current condition group, joined to the previous ones by `connector`.
    pub fn wrap(&self, connector: Connector) -> &Self {
        self.with_conditions(|c| {
            c.wrap(connector);
        })
    }

    /// Raw select list, e.g. `"name"` or `"COUNT(*) AS count"`.
    pub fn select(&self, columns: impl Into<String>) -> &Self {
        self.with_query(|q| {
            q.select(columns);
        })
    }

    /// `LEFT JOIN table ON on`.
    pub fn join(&self, table: impl Into<String>, on: impl Into<String>) -> &Self {
        self.join_with(JoinType::Left, table, on)
    }

    pub fn join_with(
        &self,
        join_type: JoinType,
        table: impl Into<String>,
        on: impl Into<String>,
    ) -> &Self {
        self.with_query(|q| {
            q.join(Join::new(join_type, table, on));
        })
    }

    pub fn order_by(&self, column: impl Into<String>, direction: OrderDirection) -> &Self {
        self.with_query(|q| {
            q.order_by(OrderBy::new(column, direction));
        })
    }

    pub fn group_by(&self, column: impl Into<String>) -> &Self {
        self.with_query(|q| {
            q.group_by([column.into()]);
        })
    }

    /// Raw HAVING condition.
    pub fn having(&self, condition: impl Into<String>) -> &Self {
        self.with_query(|q| {
            q.having(condition);
        })
    }

    pub fn limit(&self, count: u64) -> &Self {
        self.with_query(|q| {
            q.limit(count);
        })
    }

    pub fn offset(&self, offset: u64) -> &Self {
        self.with_query(|q| {
            q.offset(offset);
        })
    }

    /// Discard pending conditions and clauses.
    pub fn reset_query(&self) -> &Self {
        self.with_query(|q| *q = QueryState::new())
    }

    fn take_query(&self) -> QueryState {
        std::mem::take(&mut self.inner_mut().query)
    }

    // ==================== Persistence ====================

    /// Execute a statement on this record's data source.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        tracing::debug!(table = self.table_name(), sql = %sql, params = params.len(), "executing");
        self.shared.source.execute(sql, params)
    }

    fn state_error(&self, kind: StateErrorKind, operation: &'static str) -> Error {
        Error::State(StateError {
            kind,
            operation,
            table: self.table_name().to_string(),
        })
    }

    fn ensure_live(&self, operation: &'static str) -> Result<()> {
        if self.inner().deleted {
            Err(self.state_error(StateErrorKind::Deleted, operation))
        } else {
            Ok(())
        }
    }

    fn require_id(&self, operation: &'static str) -> Result<Value> {
        self.id()
            .ok_or_else(|| self.state_error(StateErrorKind::MissingPrimaryKey, operation))
    }

    /// INSERT the pending changes.
    ///
    /// Without pending changes this is a no-op. Unless the changes carry a
    /// non-NULL primary key it is taken from the data source's last insert id.
    #[tracing::instrument(level = "debug", skip(self), fields(table = self.table_name()))]
    pub fn insert(&self) -> Result<&Self> {
        self.ensure_live("insert")?;
        if self.inner().dirty.is_empty() {
            tracing::debug!("no changes, nothing to insert");
            return Ok(self);
        }
        self.hooks().before_insert(self)?;

        let (sql, params) = InsertBuilder::new(self.table_name())
            .values(self.get_dirty())
            .build(self.dialect())?;
        let result = self.execute(&sql, &params)?;

        {
            let pk = self.primary_key_name();
            let mut inner = self.inner_mut();
            let assigned = inner.dirty.get(pk).is_some_and(|v| !v.is_null());
            if let (false, Some(id)) = (assigned, result.last_insert_id) {
                inner.data.insert(pk.to_string(), Value::Int(id));
            }
        }

        self.hooks().after_insert(self)?;
        self.inner_mut().dirty.clear();
        tracing::debug!(id = ?self.id(), "inserted");
        Ok(self)
    }

    /// UPDATE the pending changes on the row with this record's primary key.
    ///
    /// The primary key itself is never part of the SET list.
    #[tracing::instrument(level = "debug", skip(self), fields(table = self.table_name()))]
    pub fn update(&self) -> Result<&Self> {
        self.ensure_live("update")?;
        let id = self.require_id("update")?;
        if self.inner().dirty.is_empty() {
            tracing::debug!("no changes, nothing to update");
            return Ok(self);
        }
        self.hooks().before_update(self)?;

        let pk = self.primary_key_name();
        let changes: Vec<(String, Value)> = self
            .get_dirty()
            .into_iter()
            .filter(|(column, _)| column != pk)
            .collect();
        if changes.is_empty() {
            self.inner_mut().dirty.clear();
            return Ok(self);
        }

        let (sql, params) = UpdateBuilder::new(self.table_name())
            .set_all(changes)
            .filter_eq(pk, id)
            .build(self.dialect())?;
        self.execute(&sql, &params)?;

        self.hooks().after_update(self)?;
        self.inner_mut().dirty.clear();
        Ok(self)
    }

    /// Insert when there is no primary key value, update otherwise.
    #[tracing::instrument(level = "debug", skip(self), fields(table = self.table_name()))]
    pub fn save(&self) -> Result<&Self> {
        self.ensure_live("save")?;
        self.hooks().before_save(self)?;
        if self.id().is_some() {
            self.update()?;
        } else {
            self.insert()?;
        }
        self.hooks().after_save(self)?;
        Ok(self)
    }

    /// Run the pending query with `LIMIT 1` and hydrate this record from the
    /// first row.
    ///
    /// Returns `None` without touching the attributes when nothing matches.
    /// The pending query is consumed either way.
    #[tracing::instrument(level = "debug", skip(self), fields(table = self.table_name()))]
    pub fn find(&self) -> Result<Option<&Self>> {
        let prepared = self
            .ensure_live("find")
            .and_then(|()| self.hooks().before_find(self));
        if let Err(err) = prepared {
            self.reset_query();
            return Err(err);
        }

        let mut query = self.take_query();
        query.limit(1);
        let (sql, params) = query.build(self.table_name(), self.dialect())?;

        let Some(row) = self.execute(&sql, &params)?.rows.into_iter().next() else {
            tracing::debug!("no matching row");
            return Ok(None);
        };
        self.hydrate(&row);
        self.hooks().after_find(self)?;
        Ok(Some(self))
    }

    /// Find the row whose primary key equals `id`, discarding pending conditions.
    pub fn find_by_pk(&self, id: impl Into<Value>) -> Result<Option<&Self>> {
        self.reset_query().eq(self.primary_key_name(), id).find()
    }

    /// Run the pending query and return one fresh record per row.
    #[tracing::instrument(level = "debug", skip(self), fields(table = self.table_name()))]
    pub fn find_all(&self) -> Result<Vec<Record>> {
        let prepared = self
            .ensure_live("find_all")
            .and_then(|()| self.hooks().before_find_all(self));
        if let Err(err) = prepared {
            self.reset_query();
            return Err(err);
        }

        let query = self.take_query();
        let (sql, params) = query.build(self.table_name(), self.dialect())?;
        let rows = self.execute(&sql, &params)?.rows;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record =
                Record::with_model(self.shared.model.clone(), Arc::clone(&self.shared.source));
            record.hydrate(row);
            record.hooks().after_find(&record)?;
            records.push(record);
        }
        tracing::debug!(count = records.len(), "found records");

        self.hooks().after_find_all(self, &records)?;
        Ok(records)
    }

    /// DELETE the row with this record's primary key.
    ///
    /// Returns `false` when no row matched. After a successful delete the
    /// record is terminal. Related rows are left alone.
    #[tracing::instrument(level = "debug", skip(self), fields(table = self.table_name()))]
    pub fn delete(&self) -> Result<bool> {
        self.ensure_live("delete")?;
        let id = self.require_id("delete")?;
        self.hooks().before_delete(self)?;

        let (sql, params) = DeleteBuilder::new(self.table_name())
            .filter_eq(self.primary_key_name(), id)
            .build(self.dialect())?;
        let result = self.execute(&sql, &params)?;
        if result.rows_affected == 0 {
            tracing::debug!("no row deleted");
            return Ok(false);
        }

        self.inner_mut().deleted = true;
        self.hooks().after_delete(self)?;
        Ok(true)
    }

    /// Replace all attributes with the row's values, leaving nothing dirty.
    ///
    /// If the row repeats a column name, the first occurrence wins.
    fn hydrate(&self, row: &Row) {
        let mut inner = self.inner_mut();
        inner.data.clear();
        inner.custom.clear();
        inner.relations.clear();
        inner.dirty.clear();

        inner.dirty.begin_hydration();
        for (name, value) in row.iter() {
            if !inner.data.contains_key(name) {
                inner.assign(name.to_string(), value.clone());
            }
        }
        inner.dirty.end_hydration();
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Record");
        s.field("table", &self.table_name());
        if let Ok(inner) = self.shared.state.try_borrow() {
            s.field("data", &inner.data)
                .field("custom", &inner.custom)
                .field("dirty", &inner.dirty.changes())
                .field("deleted", &inner.deleted);
        }
        s.finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlrecord_core::DataSource;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records every statement and replies from a queue (empty result when drained).
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<(String, Vec<Value>)>>,
        replies: Mutex<VecDeque<QueryResult>>,
    }

    impl Recorder {
        fn reply(&self, result: QueryResult) {
            self.replies.lock().unwrap().push_back(result);
        }

        fn statements(&self) -> Vec<String> {
            self.log.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
        }

        fn last(&self) -> (String, Vec<Value>) {
            self.log.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl DataSource for Recorder {
        fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
            self.log
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
        }

        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }
    }

    #[derive(Default)]
    struct User;

    impl RecordHooks for User {}

    impl Entity for User {
        const TABLE_NAME: &'static str = "user";
        const COLUMNS: &'static [&'static str] = &["id", "name", "password"];
    }

    #[derive(Default)]
    struct Guarded;

    impl RecordHooks for Guarded {
        fn before_insert(&self, _record: &Record) -> Result<()> {
            Err(Error::Custom("inserts are disabled".to_string()))
        }

        fn before_find(&self, record: &Record) -> Result<()> {
            if record.get("fail_find").is_some() {
                return Err(Error::Custom("find refused".to_string()));
            }
            Ok(())
        }
    }

    impl Entity for Guarded {
        const TABLE_NAME: &'static str = "guarded";
    }

    fn user_row(id: i64, name: &str) -> Row {
        Row::new(
            vec!["id".to_string(), "name".to_string()],
            vec![Value::Int(id), Value::from(name)],
        )
    }

    fn setup() -> (Arc<Recorder>, Record) {
        let recorder = Arc::new(Recorder::default());
        let source: SharedSource = recorder.clone();
        (recorder, Record::new::<User>(source))
    }

    #[test]
    fn test_insert_from_dirty_set() {
        let (recorder, user) = setup();
        recorder.reply(QueryResult::affected(1).with_last_insert_id(7));

        user.set("name", "demo").set("password", "pass");
        assert_eq!(user.state(), RecordState::New);
        user.insert().unwrap();

        let (sql, params) = recorder.last();
        assert_eq!(sql, "INSERT INTO \"user\" (\"name\", \"password\") VALUES (?1, ?2)");
        assert_eq!(params, vec![Value::from("demo"), Value::from("pass")]);
        assert_eq!(user.id(), Some(Value::Int(7)));
        assert!(user.get_dirty().is_empty());
        assert_eq!(user.state(), RecordState::Persisted);
    }

    #[test]
    fn test_insert_keeps_explicit_primary_key() {
        let (recorder, user) = setup();
        recorder.reply(QueryResult::affected(1).with_last_insert_id(99));
        user.set("id", 5).set("name", "x").insert().unwrap();
        assert_eq!(user.id(), Some(Value::Int(5)));
    }

    #[test]
    fn test_insert_null_primary_key_takes_generated_id() {
        let (recorder, user) = setup();
        recorder.reply(QueryResult::affected(1).with_last_insert_id(12));
        user.set("id", Value::Null).set("name", "x").insert().unwrap();
        assert_eq!(user.id(), Some(Value::Int(12)));
        assert_eq!(user.state(), RecordState::Persisted);
    }

    #[test]
    fn test_insert_without_changes_is_noop() {
        let (recorder, user) = setup();
        user.insert().unwrap();
        assert!(recorder.statements().is_empty());
    }

    #[test]
    fn test_update_requires_primary_key() {
        let (recorder, user) = setup();
        user.set("name", "x");
        let err = user.update().unwrap_err();
        assert!(matches!(
            err,
            Error::State(StateError {
                kind: StateErrorKind::MissingPrimaryKey,
                ..
            })
        ));
        assert!(recorder.statements().is_empty());
    }

    #[test]
    fn test_update_excludes_primary_key() {
        let (recorder, user) = setup();
        user.set("id", 3).set("name", "bob");
        user.update().unwrap();

        let (sql, params) = recorder.last();
        assert_eq!(sql, "UPDATE \"user\" SET \"name\" = ?1 WHERE \"id\" = ?2");
        assert_eq!(params, vec![Value::from("bob"), Value::Int(3)]);
        assert!(!user.is_dirty());

        user.set("id", 3).update().unwrap();
        assert_eq!(recorder.statements().len(), 1);
        assert!(!user.is_dirty());
    }

    #[test]
    fn test_find_hydrates_without_dirty() {
        let (recorder, user) = setup();
        recorder.reply(QueryResult::from_rows(vec![user_row(1, "demo")]));

        user.set_custom_data("stale", 1);
        let found = user.find_by_pk(1).unwrap();
        assert!(found.is_some());

        let (sql, params) = recorder.last();
        assert_eq!(sql, "SELECT * FROM \"user\" WHERE \"id\" = ?1 LIMIT 1");
        assert_eq!(params, vec![Value::Int(1)]);
        assert_eq!(user.get("name"), Some(Value::from("demo")));
        assert!(user.get_dirty().is_empty());
        assert_eq!(user.custom_data("stale"), None);
    }

    #[test]
    fn test_find_without_rows_resets_query() {
        let (recorder, user) = setup();
        user.set("name", "kept");
        let found = user.eq("name", "nobody").find().unwrap();
        assert!(found.is_none());
        assert_eq!(user.get("name"), Some(Value::from("kept")));

        user.find_all().unwrap();
        assert_eq!(recorder.last().0, "SELECT * FROM \"user\"");
    }

    #[test]
    fn test_build_error_surfaces_and_resets() {
        let (recorder, user) = setup();
        let err = user.between("id", [1]).find().unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(recorder.statements().is_empty());

        user.find().unwrap();
        assert_eq!(recorder.last().0, "SELECT * FROM \"user\" LIMIT 1");
    }

    #[test]
    fn test_find_all_returns_fresh_instances() {
        let (recorder, user) = setup();
        recorder.reply(QueryResult::from_rows(vec![
            user_row(1, "a"),
            user_row(2, "b"),
        ]));

        let users = user.order_by("id", OrderDirection::Asc).find_all().unwrap();
        assert_eq!(users.len(), 2);
        assert!(!Record::ptr_eq(&users[0], &user));
        assert!(!Record::ptr_eq(&users[0], &users[1]));
        assert!(Arc::ptr_eq(users[1].source(), user.source()));
        assert_eq!(users[1].get_as::<String>("name").unwrap(), "b");
        assert!(!users[0].is_dirty());
        assert_eq!(recorder.last().0, "SELECT * FROM \"user\" ORDER BY \"id\" ASC");
    }

    #[test]
    fn test_unknown_attribute_becomes_custom_data() {
        let (_, user) = setup();
        user.set("name", "n").set("nickname", "nick");
        assert_eq!(user.custom_data("nickname"), Some(Value::from("nick")));
        assert_eq!(user.get("nickname"), Some(Value::from("nick")));
        assert_eq!(user.get_dirty(), vec![("name".to_string(), Value::from("n"))]);
        assert_eq!(
            user.to_json(),
            serde_json::json!({"name": "n", "nickname": "nick"})
        );
    }

    #[test]
    fn test_unset_removes_value_and_change() {
        let (_, user) = setup();
        user.set("name", "x");
        user.unset("name");
        assert!(user.get_dirty().is_empty());
        assert!(!user.contains("name"));
        assert_eq!(user.get_as::<Option<String>>("name").unwrap(), None);
    }

    #[test]
    fn test_typed_read_errors_name_the_column() {
        let (_, user) = setup();
        user.set("name", 5);
        let err = user.get_as::<String>("name").unwrap_err();
        assert!(matches!(err, Error::Type(ref te) if te.column.as_deref() == Some("name")));
    }

    #[test]
    fn test_delete_lifecycle() {
        let (recorder, user) = setup();
        assert!(user.delete().unwrap_err().is_state_error());

        user.set("id", 4);
        assert!(!user.delete().unwrap());

        recorder.reply(QueryResult::affected(1));
        assert!(user.delete().unwrap());
        assert_eq!(recorder.last().0, "DELETE FROM \"user\" WHERE \"id\" = ?1");
        assert_eq!(user.state(), RecordState::Deleted);

        let count = recorder.statements().len();
        for err in [
            user.update().map(|_| ()).unwrap_err(),
            user.save().map(|_| ()).unwrap_err(),
            user.find().map(|_| ()).unwrap_err(),
            user.find_all().map(|_| ()).unwrap_err(),
            user.delete().map(|_| ()).unwrap_err(),
        ] {
            assert!(matches!(
                err,
                Error::State(StateError {
                    kind: StateErrorKind::Deleted,
                    ..
                })
            ));
        }
        assert_eq!(recorder.statements().len(), count);
    }

    #[test]
    fn test_hook_error_aborts() {
        let recorder = Arc::new(Recorder::default());
        let source: SharedSource = recorder.clone();
        let record = Record::new::<Guarded>(source);

        record.set("name", "x");
        let err = record.insert().unwrap_err();
        assert!(matches!(err, Error::Custom(_)));
        assert!(record.is_dirty());

        record.set_custom_data("fail_find", true);
        assert!(record.eq("name", "x").find().is_err());
        record.unset("fail_find");
        record.find().unwrap();
        assert_eq!(recorder.last().0, "SELECT * FROM \"guarded\" LIMIT 1");
    }

    #[test]
    fn test_clones_share_state() {
        let (_, user) = setup();
        let other = user.clone();
        other.set("name", "shared");
        assert!(Record::ptr_eq(&user, &other));
        assert_eq!(user.get("name"), Some(Value::from("shared")));
    }
}
