//! Error types for records, stores and schemas.

use crate::{Key, ValueKind};

/// Errors from record and store operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot parse attribute '{attribute}' as {type_tag} from {text:?}: {message}")]
    Parse {
        attribute: String,
        type_tag: String,
        text: String,
        message: String,
    },

    #[error("duplicate key {key} in table '{table}'")]
    DuplicateKey { table: String, key: Key },

    #[error("record is missing key attribute '{attribute}' in table '{table}'")]
    MissingKey { table: String, attribute: String },

    #[error("table '{table}' has no attribute '{attribute}'")]
    UnknownAttribute { table: String, attribute: String },

    #[error("attribute '{attribute}' expects {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("attribute '{attribute}' is {actual}, cannot read it as {expected}")]
    Cast {
        attribute: String,
        expected: &'static str,
        actual: ValueKind,
    },

    #[error("attribute '{attribute}' has no value")]
    Unset { attribute: String },

    #[error("record no longer belongs to a store")]
    Detached,

    #[error(transparent)]
    Adaptor(#[from] xal_data_adaptor::Error),
}

/// Errors found while building a [`RecordSchema`](crate::RecordSchema).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("attribute '{attribute}' uses unknown type '{type_tag}'")]
    UnknownType { attribute: String, type_tag: String },

    #[error("default {text:?} for attribute '{attribute}' does not parse: {message}")]
    InvalidDefault {
        attribute: String,
        text: String,
        message: String,
    },

    #[error("attribute '{attribute}' is declared twice")]
    DuplicateAttribute { attribute: String },

    #[error("key attribute '{attribute}' is not declared")]
    UnknownKey { attribute: String },

    #[error("index attribute '{attribute}' is not declared")]
    UnknownIndex { attribute: String },

    #[error("schema '{table}' declares no key attribute")]
    NoKey { table: String },
}
