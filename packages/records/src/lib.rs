//! # xal-records
//!
//! Tables of schema-typed records with automatic reindexing.
//!
//! - [`RecordSchema`]: declared attributes with type tags, defaults, the
//!   primary key and secondary indexes; tags resolve through a [`TypeRegistry`]
//! - [`RecordStore`]: owns the records and their indexes
//! - [`Record`]: a non-owning handle; setting a key attribute moves the record
//!   to its new key atomically
//! - [`StoreListener`]: change notifications, deliverable through a
//!   `xal_messaging` dispatcher via [`StoreEvents`]
//!
//! Stores and records read from and write to any
//! [`DataAdaptor`](xal_data_adaptor::DataAdaptor).
//!
//! ```ignore
//! let schema = RecordSchema::builder("people")
//!     .attribute("id", "int")
//!     .attribute("name", "string")
//!     .attribute_with_default("active", "boolean", "false")
//!     .key("id")
//!     .build()?;
//! let store = RecordStore::new(schema);
//!
//! let record = store.insert_from(&node)?;
//! record.set("id", 2)?;
//! assert_eq!(store.lookup(2), Some(record));
//! ```

mod error;
mod events;
mod record;
mod schema;
mod store;
mod types;
mod value;

pub use error::{Error, SchemaError};
pub use events::{StoreEvents, StoreListener};
pub use record::Record;
pub use schema::{AttributeSpec, Attributes, Key, RecordSchema, SchemaBuilder};
pub use store::{RecordId, RecordSnapshot, RecordStore};
pub use types::{AttributeType, TypeRegistry};
pub use value::{Value, ValueKind};
