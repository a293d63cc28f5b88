//! Store change notifications.

use xal_messaging::{Protocol, Proxy, TargetResult};

use crate::{Attributes, Key, Record, Value};

/// Receives changes to a [`RecordStore`](crate::RecordStore).
///
/// Calls happen after the store has released its lock, so listeners may read
/// the store (or the record) freely. Errors are logged and otherwise ignored.
pub trait StoreListener: Send + Sync {
    fn record_added(&self, table: &str, record: &Record) -> TargetResult {
        let _ = (table, record);
        Ok(())
    }

    /// `values` are the attributes the record had when it was removed.
    fn record_removed(&self, table: &str, key: &Key, values: &Attributes) -> TargetResult {
        let _ = (table, key, values);
        Ok(())
    }

    fn record_changed(
        &self,
        record: &Record,
        attribute: &str,
        old: Option<&Value>,
        new: &Value,
    ) -> TargetResult {
        let _ = (record, attribute, old, new);
        Ok(())
    }

    /// Sent after `record_changed` when the change moved the record to a new key.
    fn record_rekeyed(&self, record: &Record, old_key: &Key, new_key: &Key) -> TargetResult {
        let _ = (record, old_key, new_key);
        Ok(())
    }
}

/// The store-events protocol, for fanning store changes out via a dispatcher.
pub struct StoreEvents;

impl Protocol for StoreEvents {
    type Target = dyn StoreListener;
    const NAME: &'static str = "StoreListener";
}

impl StoreListener for Proxy<StoreEvents> {
    fn record_added(&self, table: &str, record: &Record) -> TargetResult {
        let (table, record) = (table.to_string(), record.clone());
        self.send("record_added", move |target| {
            target.record_added(&table, &record)
        })?;
        Ok(())
    }

    fn record_removed(&self, table: &str, key: &Key, values: &Attributes) -> TargetResult {
        let (table, key, values) = (table.to_string(), key.clone(), values.clone());
        self.send("record_removed", move |target| {
            target.record_removed(&table, &key, &values)
        })?;
        Ok(())
    }

    fn record_changed(
        &self,
        record: &Record,
        attribute: &str,
        old: Option<&Value>,
        new: &Value,
    ) -> TargetResult {
        let (record, attribute) = (record.clone(), attribute.to_string());
        let (old, new) = (old.cloned(), new.clone());
        self.send("record_changed", move |target| {
            target.record_changed(&record, &attribute, old.as_ref(), &new)
        })?;
        Ok(())
    }

    fn record_rekeyed(&self, record: &Record, old_key: &Key, new_key: &Key) -> TargetResult {
        let (record, old_key, new_key) = (record.clone(), old_key.clone(), new_key.clone());
        self.send("record_rekeyed", move |target| {
            target.record_rekeyed(&record, &old_key, &new_key)
        })?;
        Ok(())
    }
}
