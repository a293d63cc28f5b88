//! Record stores: ownership of records and their indexes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use xal_data_adaptor::{DataAdaptor, DataListener};

use crate::{Attributes, Error, Key, Record, RecordSchema, StoreListener, Value};

/// Store-assigned record handle. Ids are never reused within a store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
pub(crate) struct StoreState {
    /// Ids increase monotonically, so this is insertion order.
    records: BTreeMap<RecordId, Attributes>,
    primary: HashMap<Key, RecordId>,
    secondary: HashMap<String, HashMap<Value, BTreeSet<RecordId>>>,
    next_id: u64,
}

pub(crate) struct StoreShared {
    pub(crate) schema: RecordSchema,
    state: RwLock<StoreState>,
    listener: RwLock<Option<Arc<dyn StoreListener>>>,
}

/// A change to report once the state lock is released.
pub(crate) enum Event {
    Added(Record),
    Removed {
        key: Key,
        values: Attributes,
    },
    Changed {
        record: Record,
        attribute: String,
        old: Option<Value>,
        new: Value,
    },
    Rekeyed {
        record: Record,
        old_key: Key,
        new_key: Key,
    },
}

/// A table of records sharing one schema.
///
/// The store owns every record's values and keeps a unique index on the
/// schema's key plus one non-unique index per indexed attribute. [`Record`]
/// handles refer back to the store without owning it.
///
/// Every mutation, including changing a key attribute through
/// [`Record::set`], updates values and indexes in one critical section, so
/// readers never see a record under two keys or under none.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct RecordStore {
    shared: Arc<StoreShared>,
}

impl RecordStore {
    pub fn new(schema: RecordSchema) -> Self {
        let secondary = schema
            .indexed_attributes()
            .iter()
            .map(|name| (name.clone(), HashMap::new()))
            .collect();
        Self {
            shared: Arc::new(StoreShared {
                schema,
                state: RwLock::new(StoreState {
                    secondary,
                    ..StoreState::default()
                }),
                listener: RwLock::new(None),
            }),
        }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.shared.schema
    }

    /// Install (or clear) the change listener.
    pub fn set_listener(&self, listener: Option<Arc<dyn StoreListener>>) {
        *self
            .shared
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = listener;
    }

    /// Add a record. Fails on a missing or already-present key.
    pub fn insert(&self, values: Attributes) -> Result<Record, Error> {
        self.insert_with(values, false)
    }

    /// Add a record, or overwrite the values of the record holding its key.
    ///
    /// When a record is replaced its handle stays valid.
    pub fn insert_or_replace(&self, values: Attributes) -> Result<Record, Error> {
        self.insert_with(values, true)
    }

    /// Parse a node with the schema and insert the result.
    pub fn insert_from(&self, adaptor: &dyn DataAdaptor) -> Result<Record, Error> {
        let values = self.shared.schema.parse_record(adaptor)?;
        self.insert(values)
    }

    fn insert_with(&self, values: Attributes, replace: bool) -> Result<Record, Error> {
        let schema = &self.shared.schema;
        for (attribute, value) in &values {
            schema.check(attribute, value)?;
        }
        let key = schema.key_of(&values)?;

        let mut events = Vec::new();
        let record = {
            let mut state = self.shared.write();
            let existing = state.key_owner(&key);
            match existing {
                Some(id) if replace => {
                    let old = state.records.get(&id).cloned().unwrap_or_default();
                    state.unindex_secondary(id, &old);
                    state.index_secondary(id, &values);
                    let record = self.handle(id);
                    for name in schema.attribute_names() {
                        let (before, after) = (old.get(name), values.get(name));
                        if let Some(new) = after.filter(|&new| before != Some(new)) {
                            events.push(Event::Changed {
                                record: record.clone(),
                                attribute: name.to_string(),
                                old: before.cloned(),
                                new: new.clone(),
                            });
                        }
                    }
                    state.records.insert(id, values);
                    record
                }
                Some(_) => {
                    return Err(Error::DuplicateKey {
                        table: schema.name().to_string(),
                        key,
                    })
                }
                None => {
                    let id = RecordId(state.next_id);
                    state.next_id += 1;
                    state.index_secondary(id, &values);
                    state.primary.insert(key.clone(), id);
                    state.records.insert(id, values);
                    let record = self.handle(id);
                    events.push(Event::Added(record.clone()));
                    record
                }
            }
        };

        tracing::debug!(table = schema.name(), key = %key, "inserted record");
        self.shared.notify(events);
        Ok(record)
    }

    /// Remove a record. Returns `false` if it was not in this store.
    pub fn remove(&self, record: &Record) -> bool {
        record.belongs_to(&self.shared) && self.remove_with(|_| Some(record.id()))
    }

    /// Remove the record holding `key`, if any.
    ///
    /// The key is resolved under the same lock that removes the record, so
    /// a concurrent rekey either happens first (and nothing is removed) or
    /// after (and finds the record gone).
    pub fn remove_key(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        self.remove_with(|state| state.key_owner(&key))
    }

    fn remove_with(&self, find: impl FnOnce(&StoreState) -> Option<RecordId>) -> bool {
        let schema = &self.shared.schema;
        let removed = {
            let mut state = self.shared.write();
            let Some(id) = find(&state) else {
                return false;
            };
            let Some(values) = state.records.remove(&id) else {
                return false;
            };
            state.unindex_secondary(id, &values);
            let key = schema.key_of(&values);
            if let Ok(key) = &key {
                state.primary.remove(key);
            }
            key.map(|key| (key, values))
        };

        if let Ok((key, values)) = removed {
            tracing::debug!(table = schema.name(), key = %key, "removed record");
            self.shared.notify(vec![Event::Removed { key, values }]);
        }
        true
    }

    /// The record holding `key`.
    pub fn lookup(&self, key: impl Into<Key>) -> Option<Record> {
        let key = key.into();
        let id = self.shared.read().primary.get(&key).copied();
        id.map(|id| self.handle(id))
    }

    /// Records whose `attribute` equals `value`, in insertion order.
    ///
    /// Uses the secondary index when the attribute has one.
    pub fn records_with(&self, attribute: &str, value: &Value) -> Vec<Record> {
        let state = self.shared.read();
        let ids: Vec<RecordId> = match state.secondary.get(attribute) {
            Some(index) => index
                .get(value)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default(),
            None => state
                .records
                .iter()
                .filter(|(_, values)| values.get(attribute) == Some(value))
                .map(|(id, _)| *id)
                .collect(),
        };
        drop(state);
        ids.into_iter().map(|id| self.handle(id)).collect()
    }

    /// A snapshot of the records whose values satisfy `predicate`.
    ///
    /// The snapshot is taken under the store's read lock; later mutations do
    /// not affect it, and it can be iterated any number of times.
    pub fn records_matching<F>(&self, predicate: F) -> RecordSnapshot
    where
        F: Fn(&Attributes) -> bool,
    {
        let ids: Vec<RecordId> = self
            .shared
            .read()
            .records
            .iter()
            .filter(|(_, values)| predicate(values))
            .map(|(id, _)| *id)
            .collect();
        RecordSnapshot {
            records: ids.into_iter().map(|id| self.handle(id)).collect(),
        }
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.records_matching(|_| true).records
    }

    /// All keys, in record insertion order.
    pub fn keys(&self) -> Vec<Key> {
        let state = self.shared.read();
        state
            .records
            .values()
            .filter_map(|values| self.shared.schema.key_of(values).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shared.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bring the indexes in line after `attribute` of `record` changed from `old`.
    ///
    /// [`Record::set`] already does this; calling it again is a no-op. Fails
    /// with [`Error::Detached`] for records of another store or removed ones,
    /// and with [`Error::DuplicateKey`] (indexes untouched) when the current
    /// key collides with another record.
    pub fn reindex(&self, record: &Record, attribute: &str, old: Option<&Value>) -> Result<(), Error> {
        if !record.belongs_to(&self.shared) {
            return Err(Error::Detached);
        }
        let mut state = self.shared.write();
        let current = state
            .records
            .get(&record.id())
            .cloned()
            .ok_or(Error::Detached)?;
        state.reindex(&self.shared.schema, record.id(), &current, attribute, old)?;
        Ok(())
    }

    /// Add every `record` child of `adaptor` to the store.
    pub fn load_from(&self, adaptor: &dyn DataAdaptor) -> Result<Vec<Record>, Error> {
        adaptor
            .child_adaptors(Some(Record::DATA_LABEL))
            .into_iter()
            .map(|child| self.insert_from(child))
            .collect()
    }

    fn handle(&self, id: RecordId) -> Record {
        Record::new(id, Arc::downgrade(&self.shared))
    }
}

impl DataListener for RecordStore {
    fn data_label(&self) -> &str {
        self.shared.schema.name()
    }

    fn write(&self, adaptor: &mut dyn DataAdaptor) {
        let state = self.shared.read();
        for values in state.records.values() {
            let child = adaptor.create_child(Record::DATA_LABEL);
            self.shared.schema.write_record(values, child);
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("table", &self.shared.schema.name())
            .field("records", &self.len())
            .finish()
    }
}

/// Records selected by [`RecordStore::records_matching`].
#[derive(Clone, Debug, Default)]
pub struct RecordSnapshot {
    records: Vec<Record>,
}

impl RecordSnapshot {
    /// Restartable iteration over the snapshot.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for RecordSnapshot {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSnapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl StoreShared {
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver events to the listener. Must be called without the state lock.
    pub(crate) fn notify(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(listener) = listener else {
            return;
        };

        let table = self.schema.name();
        for event in events {
            let result = match &event {
                Event::Added(record) => listener.record_added(table, record),
                Event::Removed { key, values } => listener.record_removed(table, key, values),
                Event::Changed {
                    record,
                    attribute,
                    old,
                    new,
                } => listener.record_changed(record, attribute, old.as_ref(), new),
                Event::Rekeyed {
                    record,
                    old_key,
                    new_key,
                } => listener.record_rekeyed(record, old_key, new_key),
            };
            if let Err(error) = result {
                tracing::warn!(table, error = %error, "store listener failed");
            }
        }
    }
}

impl StoreState {
    pub(crate) fn values(&self, id: RecordId) -> Option<&Attributes> {
        self.records.get(&id)
    }

    pub(crate) fn values_mut(&mut self, id: RecordId) -> Option<&mut Attributes> {
        self.records.get_mut(&id)
    }

    pub(crate) fn key_owner(&self, key: &Key) -> Option<RecordId> {
        self.primary.get(key).copied()
    }

    fn index_secondary(&mut self, id: RecordId, values: &Attributes) {
        for (attribute, index) in &mut self.secondary {
            if let Some(value) = values.get(attribute) {
                index.entry(value.clone()).or_default().insert(id);
            }
        }
    }

    fn unindex_secondary(&mut self, id: RecordId, values: &Attributes) {
        for (attribute, index) in &mut self.secondary {
            if let Some(value) = values.get(attribute) {
                if let Some(ids) = index.get_mut(value) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        index.remove(value);
                    }
                }
            }
        }
    }

    /// Move record `id` from the index slots of `old` to those of its
    /// current values for `attribute`.
    ///
    /// Returns the old and new keys when the primary key moved.
    pub(crate) fn reindex(
        &mut self,
        schema: &RecordSchema,
        id: RecordId,
        current: &Attributes,
        attribute: &str,
        old: Option<&Value>,
    ) -> Result<Option<(Key, Key)>, Error> {
        let new = current.get(attribute);
        let mut rekeyed = None;

        if schema.is_key(attribute) {
            let new_key = schema.key_of(current)?;
            if self.key_owner(&new_key).is_some_and(|owner| owner != id) {
                return Err(Error::DuplicateKey {
                    table: schema.name().to_string(),
                    key: new_key,
                });
            }
            let mut previous = current.clone();
            match old {
                Some(old) => {
                    previous.insert(attribute.to_string(), old.clone());
                }
                None => {
                    previous.remove(attribute);
                }
            }
            if let Ok(old_key) = schema.key_of(&previous) {
                if old_key != new_key && self.primary.get(&old_key) == Some(&id) {
                    self.primary.remove(&old_key);
                    rekeyed = Some((old_key, new_key.clone()));
                }
            }
            self.primary.insert(new_key, id);
        }

        if let Some(index) = self.secondary.get_mut(attribute) {
            if let Some(old) = old {
                if let Some(ids) = index.get_mut(old) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        index.remove(old);
                    }
                }
            }
            if let Some(new) = new {
                index.entry(new.clone()).or_default().insert(id);
            }
        }

        Ok(rekeyed)
    }
}
