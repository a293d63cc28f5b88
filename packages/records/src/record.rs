//! Record handles.

use std::sync::{Arc, Weak};

use xal_data_adaptor::{DataAdaptor, DataListener};

use crate::store::{Event, StoreShared};
use crate::{Attributes, Error, Key, RecordId, Value, ValueKind};

/// A handle to one record in a [`RecordStore`](crate::RecordStore).
///
/// Handles are cheap to clone and do not keep the store alive. Once the
/// record is removed, or the store dropped, operations fail with
/// [`Error::Detached`].
///
/// Two handles are equal when they name the same record of the same store.
#[derive(Clone)]
pub struct Record {
    id: RecordId,
    store: Weak<StoreShared>,
}

impl Record {
    /// Tag of the node a record writes itself to.
    pub const DATA_LABEL: &'static str = "record";

    pub(crate) fn new(id: RecordId, store: Weak<StoreShared>) -> Self {
        Self { id, store }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub(crate) fn belongs_to(&self, store: &Arc<StoreShared>) -> bool {
        std::ptr::eq(self.store.as_ptr(), Arc::as_ptr(store))
    }

    fn store(&self) -> Result<Arc<StoreShared>, Error> {
        self.store.upgrade().ok_or(Error::Detached)
    }

    /// Run `f` on this record's values under the store's read lock.
    fn with_values<T>(&self, f: impl FnOnce(&StoreShared, &Attributes) -> T) -> Result<T, Error> {
        let store = self.store()?;
        let state = store.read();
        let values = state.values(self.id).ok_or(Error::Detached)?;
        Ok(f(&store, values))
    }

    /// Current value of `attribute`, if set. `None` also for detached records.
    pub fn get(&self, attribute: &str) -> Option<Value> {
        self.get_checked(attribute).ok().flatten()
    }

    /// Like [`get`](Self::get), but reports detached records.
    pub fn get_checked(&self, attribute: &str) -> Result<Option<Value>, Error> {
        self.with_values(|_, values| values.get(attribute).cloned())
    }

    /// Snapshot of all set attributes.
    pub fn attributes(&self) -> Result<Attributes, Error> {
        self.with_values(|_, values| values.clone())
    }

    /// Names of the attributes that currently have a value, in schema order.
    pub fn keys(&self) -> Result<Vec<String>, Error> {
        self.with_values(|store, values| {
            store
                .schema
                .attribute_names()
                .filter(|name| values.contains_key(*name))
                .map(str::to_string)
                .collect()
        })
    }

    /// Values of the set attributes, in schema order.
    pub fn values(&self) -> Result<Vec<Value>, Error> {
        self.with_values(|store, values| {
            store
                .schema
                .attribute_names()
                .filter_map(|name| values.get(name).cloned())
                .collect()
        })
    }

    /// This record's primary key.
    pub fn key(&self) -> Result<Key, Error> {
        self.with_values(|store, values| store.schema.key_of(values))?
    }

    /// Set `attribute` and update the store's indexes in the same critical section.
    ///
    /// Fails without changing anything when the value has the wrong type or
    /// when the change would give the record a key another record holds.
    /// Setting a value equal to the current one is a no-op and sends no event.
    pub fn set(&self, attribute: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let store = self.store()?;
        store.schema.check(attribute, &value)?;

        let mut events = Vec::new();
        {
            let mut state = store.write();
            let values = state.values(self.id).ok_or(Error::Detached)?;
            let old = values.get(attribute).cloned();
            if old.as_ref() == Some(&value) {
                return Ok(());
            }

            let mut updated = values.clone();
            updated.insert(attribute.to_string(), value.clone());
            let rekeyed = state.reindex(&store.schema, self.id, &updated, attribute, old.as_ref())?;

            if let Some(values) = state.values_mut(self.id) {
                *values = updated;
            }

            events.push(Event::Changed {
                record: self.clone(),
                attribute: attribute.to_string(),
                old,
                new: value,
            });
            if let Some((old_key, new_key)) = rekeyed {
                tracing::debug!(
                    table = store.schema.name(),
                    old_key = %old_key,
                    new_key = %new_key,
                    "record rekeyed"
                );
                events.push(Event::Rekeyed {
                    record: self.clone(),
                    old_key,
                    new_key,
                });
            }
        }

        store.notify(events);
        Ok(())
    }

    /// Read every declared attribute from `adaptor` and set it.
    ///
    /// Attributes missing from `adaptor` take the schema default; those with
    /// no default are left as they are. All values are parsed before any is
    /// applied, so a parse error leaves the record unchanged.
    pub fn update(&self, adaptor: &dyn DataAdaptor) -> Result<(), Error> {
        let store = self.store()?;
        let parsed = store.schema.parse_record(adaptor)?;

        // Key attributes first, so a rekey collision fails before other changes.
        let (keys, others): (Vec<_>, Vec<_>) = parsed
            .into_iter()
            .partition(|(name, _)| store.schema.is_key(name));
        for (name, value) in keys.into_iter().chain(others) {
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Write the set attributes onto `adaptor`, formatted by type.
    pub fn write_to(&self, adaptor: &mut dyn DataAdaptor) -> Result<(), Error> {
        let store = self.store()?;
        let values = self.attributes()?;
        store.schema.write_record(&values, adaptor);
        Ok(())
    }

    fn typed(&self, attribute: &str) -> Result<Value, Error> {
        self.get_checked(attribute)?.ok_or_else(|| Error::Unset {
            attribute: attribute.to_string(),
        })
    }

    fn cast_error(attribute: &str, expected: &'static str, actual: ValueKind) -> Error {
        Error::Cast {
            attribute: attribute.to_string(),
            expected,
            actual,
        }
    }

    pub fn string_for(&self, attribute: &str) -> Result<String, Error> {
        match self.typed(attribute)? {
            Value::String(s) => Ok(s),
            other => Err(Self::cast_error(attribute, "string", other.kind())),
        }
    }

    pub fn bool_for(&self, attribute: &str) -> Result<bool, Error> {
        match self.typed(attribute)? {
            Value::Boolean(b) => Ok(b),
            other => Err(Self::cast_error(attribute, "boolean", other.kind())),
        }
    }

    pub fn int_for(&self, attribute: &str) -> Result<i32, Error> {
        match self.typed(attribute)? {
            Value::Int(n) => Ok(n),
            other => Err(Self::cast_error(attribute, "int", other.kind())),
        }
    }

    /// Accepts `int` and `long` attributes.
    pub fn long_for(&self, attribute: &str) -> Result<i64, Error> {
        match self.typed(attribute)? {
            Value::Int(n) => Ok(i64::from(n)),
            Value::Long(n) => Ok(n),
            other => Err(Self::cast_error(attribute, "long", other.kind())),
        }
    }

    /// Accepts any numeric attribute, widened to `f64`.
    pub fn double_for(&self, attribute: &str) -> Result<f64, Error> {
        let value = self.typed(attribute)?;
        value
            .as_f64()
            .ok_or_else(|| Self::cast_error(attribute, "double", value.kind()))
    }

    /// The value of a numeric attribute, in its own variant.
    pub fn number_for(&self, attribute: &str) -> Result<Value, Error> {
        let value = self.typed(attribute)?;
        if value.is_numeric() {
            Ok(value)
        } else {
            Err(Self::cast_error(attribute, "number", value.kind()))
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.store, &other.store)
    }
}

impl Eq for Record {}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Record");
        debug.field("id", &self.id);
        match self.attributes() {
            Ok(values) => debug.field("values", &values),
            Err(_) => debug.field("detached", &true),
        };
        debug.finish()
    }
}

impl DataListener for Record {
    fn data_label(&self) -> &str {
        Self::DATA_LABEL
    }

    fn write(&self, adaptor: &mut dyn DataAdaptor) {
        if let Err(error) = self.write_to(adaptor) {
            tracing::warn!(record = %self.id, error = %error, "record not written");
        }
    }
}
